//! Simulation output
//!
//! The solution is a dense cube indexed `(checkpoint, node, field)`. Boundary
//! nodes of every stored checkpoint satisfy their boundary relations.

use ndarray::{s, Array3, ArrayView1};
use std::collections::HashMap;

use crate::physics::{PhysicalQuantity, PhysicalState};

/// Output of a solver run
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Checkpoint times
    pub time_points: Vec<f64>,

    /// Node positions
    pub positions: Vec<f64>,

    /// Field order of the last axis
    pub quantities: Vec<PhysicalQuantity>,

    /// Values indexed `[checkpoint, node, field]`
    pub values: Array3<f64>,

    /// State at the last checkpoint
    pub final_state: PhysicalState,

    /// Solver name, counters and tolerances
    pub metadata: HashMap<String, String>,
}

impl SimulationResult {
    pub fn new(
        time_points: Vec<f64>,
        positions: Vec<f64>,
        quantities: Vec<PhysicalQuantity>,
        values: Array3<f64>,
        final_state: PhysicalState,
    ) -> Self {
        Self {
            time_points,
            positions,
            quantities,
            values,
            final_state,
            metadata: HashMap::new(),
        }
    }

    /// Number of stored checkpoints
    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Position of a field on the last axis
    pub fn field_index(&self, quantity: PhysicalQuantity) -> Option<usize> {
        self.quantities.iter().position(|q| *q == quantity)
    }

    /// Field over the column at one checkpoint
    pub fn profile(&self, quantity: PhysicalQuantity, checkpoint: usize) -> Option<ArrayView1<'_, f64>> {
        let field = self.field_index(quantity)?;
        (checkpoint < self.len()).then(|| self.values.slice(s![checkpoint, .., field]))
    }

    /// Field at the outlet (last node) over all checkpoints
    pub fn breakthrough(&self, quantity: PhysicalQuantity) -> Option<ArrayView1<'_, f64>> {
        let field = self.field_index(quantity)?;
        let outlet = self.positions.len().checked_sub(1)?;
        Some(self.values.slice(s![.., outlet, field]))
    }

    /// Single stored value
    pub fn value(&self, checkpoint: usize, node: usize, quantity: PhysicalQuantity) -> Option<f64> {
        let field = self.field_index(quantity)?;
        self.values.get([checkpoint, node, field]).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn sample() -> SimulationResult {
        // 2 checkpoints, 3 nodes, 2 fields
        let values = Array3::from_shape_fn((2, 3, 2), |(t, x, f)| (100 * t + 10 * x + f) as f64);
        let final_state = PhysicalState::from_fields(vec![
            (PhysicalQuantity::Concentration, DVector::from_vec(vec![100.0, 110.0, 120.0])),
            (PhysicalQuantity::Loading, DVector::from_vec(vec![101.0, 111.0, 121.0])),
        ])
        .unwrap();

        SimulationResult::new(
            vec![0.0, 1.0],
            vec![0.0, 0.5, 1.0],
            vec![PhysicalQuantity::Concentration, PhysicalQuantity::Loading],
            values,
            final_state,
        )
    }

    #[test]
    fn test_views() {
        let result = sample();

        assert_eq!(result.len(), 2);
        assert_eq!(result.profile(PhysicalQuantity::Loading, 1).unwrap().to_vec(), vec![101.0, 111.0, 121.0]);
        assert_eq!(result.breakthrough(PhysicalQuantity::Concentration).unwrap().to_vec(), vec![20.0, 120.0]);
        assert_eq!(result.value(1, 0, PhysicalQuantity::Loading), Some(101.0));
    }

    #[test]
    fn test_missing_entries() {
        let result = sample();

        assert!(result.profile(PhysicalQuantity::Concentration, 2).is_none());
        assert!(result.breakthrough(PhysicalQuantity::Custom("Heat")).is_none());
        assert!(result.value(0, 3, PhysicalQuantity::Concentration).is_none());
    }

    #[test]
    fn test_metadata() {
        let mut result = sample();
        result.add_metadata("solver", "SDIRK2");

        assert_eq!(result.metadata("solver"), Some("SDIRK2"));
        assert!(result.metadata("steps").is_none());
    }
}
