//! Helper functions for integration tests

use sorb_rs::config::{ColumnParameters, SorptionParameters};
use sorb_rs::models::ColumnModel;
use sorb_rs::solver::{Grid, Scenario};

/// Relative error with a guard for exact zeros
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-14 {
        actual.abs()
    } else {
        ((actual - expected) / expected).abs()
    }
}

/// Largest absolute difference between two sequences
pub fn max_abs_difference<'a>(
    a: impl IntoIterator<Item = &'a f64>,
    b: impl IntoIterator<Item = &'a f64>,
) -> f64 {
    a.into_iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Single-field column on a uniform grid
pub fn column_scenario(params: &ColumnParameters, duration: f64, nodes: usize, checkpoints: usize) -> Scenario {
    let grid = Grid::uniform(params.length, duration, nodes, checkpoints).unwrap();
    let model = ColumnModel::advection_dispersion(&grid, params).unwrap();
    Scenario::new(Box::new(model), grid)
}

/// Fluid plus sorbed loading on a uniform grid
pub fn sorbing_scenario(
    params: &ColumnParameters,
    sorption: &SorptionParameters,
    duration: f64,
    nodes: usize,
    checkpoints: usize,
) -> Scenario {
    let grid = Grid::uniform(params.length, duration, nodes, checkpoints).unwrap();
    let model = ColumnModel::with_sorption(&grid, params, sorption).unwrap();
    Scenario::new(Box::new(model), grid)
}
