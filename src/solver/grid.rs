//! Spatial nodes and output checkpoints
//!
//! A grid is built once per run and read-only afterwards. Positions are the
//! nodes of the spatial discretization; checkpoints are the times at which
//! the integrator reports the state (it always lands on them exactly).

use crate::error::{Result, SorbError};

/// Relative tolerance used to decide that a grid is uniform
const UNIFORMITY_TOLERANCE: f64 = 1e-9;

/// Spatial nodes and output times
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    positions: Vec<f64>,
    checkpoints: Vec<f64>,
}

/// `count` evenly spaced values from `start` to `end` (both included)
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    let step = (end - start) / (count - 1) as f64;
    (0..count)
        .map(|i| if i + 1 == count { end } else { start + step * i as f64 })
        .collect()
}

fn check_increasing(values: &[f64], what: &str) -> Result<()> {
    if values.len() < 2 {
        return Err(SorbError::invalid(format!(
            "{} need at least 2 entries, got {}",
            what,
            values.len()
        )));
    }
    if values.iter().any(|x| !x.is_finite()) {
        return Err(SorbError::invalid(format!("{} must be finite", what)));
    }
    if let Some(i) = values.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SorbError::invalid(format!(
            "{} must be strictly increasing ({} then {})",
            what,
            values[i],
            values[i + 1]
        )));
    }
    Ok(())
}

impl Grid {
    /// `nodes` positions spanning `[0, length]` and `checkpoints` times spanning `[0, duration]`
    ///
    /// # Example
    ///
    /// ```rust
    /// use sorb_rs::solver::Grid;
    ///
    /// let grid = Grid::uniform(10.0, 2000.0, 101, 21).unwrap();
    /// assert_eq!(grid.nodes(), 101);
    /// assert_eq!(grid.positions()[100], 10.0);
    /// assert_eq!(grid.checkpoints()[1], 100.0);
    /// ```
    pub fn uniform(length: f64, duration: f64, nodes: usize, checkpoints: usize) -> Result<Self> {
        if !(length > 0.0 && length.is_finite()) {
            return Err(SorbError::invalid(format!("column length must be positive, got {}", length)));
        }
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(SorbError::invalid(format!("duration must be positive, got {}", duration)));
        }
        if nodes < 2 || checkpoints < 2 {
            return Err(SorbError::invalid(format!(
                "need at least 2 nodes and 2 checkpoints, got {} and {}",
                nodes, checkpoints
            )));
        }

        Ok(Self {
            positions: linspace(0.0, length, nodes),
            checkpoints: linspace(0.0, duration, checkpoints),
        })
    }

    /// Grid from explicit sequences
    pub fn new(positions: Vec<f64>, checkpoints: Vec<f64>) -> Result<Self> {
        check_increasing(&positions, "positions")?;
        check_increasing(&checkpoints, "checkpoints")?;
        Ok(Self { positions, checkpoints })
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn checkpoints(&self) -> &[f64] {
        &self.checkpoints
    }

    /// Number of spatial nodes
    pub fn nodes(&self) -> usize {
        self.positions.len()
    }

    pub fn length(&self) -> f64 {
        self.positions[self.positions.len() - 1] - self.positions[0]
    }

    /// Time between the first and last checkpoint
    pub fn duration(&self) -> f64 {
        self.checkpoints[self.checkpoints.len() - 1] - self.checkpoints[0]
    }

    /// Node spacing, if all spacings agree
    pub fn uniform_spacing(&self) -> Option<f64> {
        let spacing = self.length() / (self.nodes() - 1) as f64;
        self.positions
            .windows(2)
            .all(|w| ((w[1] - w[0]) - spacing).abs() <= UNIFORMITY_TOLERANCE * spacing)
            .then_some(spacing)
    }
}
