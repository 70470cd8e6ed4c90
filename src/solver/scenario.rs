//! Simulation scenario definition
//!
//! A scenario combines a physical model with the grid it is solved on.
use nalgebra::DVector;

use crate::error::{Result, SorbError};
use crate::physics::traits::PhysicalModel;
use crate::solver::grid::Grid;

/// Simulation scenario
///
/// Defines a specific case to simulate:
/// - Physical model (equations, boundary relations, initial condition)
/// - Grid (spatial nodes and output checkpoints)
///
/// The same scenario can be solved with different numerical methods.
/// This is the "WHAT to solve" (not "HOW to solve").
pub struct Scenario {
    /// Physical model (equations)
    pub model: Box<dyn PhysicalModel>,

    /// Nodes and checkpoints
    pub grid: Grid,
}

impl Scenario {
    /// Create a scenario
    pub fn new(model: Box<dyn PhysicalModel>, grid: Grid) -> Self {
        Self { model, grid }
    }

    /// Checks that model and grid agree
    pub fn validate(&self) -> Result<()> {
        if self.model.fields().is_empty() {
            return Err(SorbError::invalid(format!(
                "model '{}' tracks no field",
                self.model.name()
            )));
        }
        if self.model.points() != self.grid.nodes() {
            return Err(SorbError::invalid(format!(
                "model '{}' has {} points but the grid has {} nodes",
                self.model.name(),
                self.model.points(),
                self.grid.nodes()
            )));
        }
        Ok(())
    }

    /// Get model name
    pub fn get_model_name(&self) -> &str {
        self.model.name()
    }

    /// Initial state vector with constrained entries projected onto their relations
    pub fn initial_state(&self) -> Result<DVector<f64>> {
        let state = self.model.setup_initial_state();
        if state.layout() != self.model.fields() || state.values().len() != self.model.dimension() {
            return Err(SorbError::invalid(format!(
                "initial state of '{}' does not match its field layout",
                self.model.name()
            )));
        }

        let mut values = state.into_values();
        self.model.enforce_constraints(self.grid.checkpoints()[0], &mut values)?;
        Ok(values)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.get_model_name())
            .field("fields", &self.model.fields())
            .field("nodes", &self.grid.nodes())
            .field("checkpoints", &self.grid.checkpoints().len())
            .finish()
    }
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::traits::{PhysicalQuantity, PhysicalState};

    struct MockModel {
        points: usize,
    }

    impl PhysicalModel for MockModel {
        fn points(&self) -> usize {
            self.points
        }

        fn fields(&self) -> &[PhysicalQuantity] {
            &[PhysicalQuantity::Concentration]
        }

        fn compute_physics(&self, _t: f64, _state: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()> {
            rate.fill(0.0);
            Ok(())
        }

        fn enforce_constraints(&self, _t: f64, state: &mut DVector<f64>) -> Result<()> {
            state[0] = 1.0;
            Ok(())
        }

        fn setup_initial_state(&self) -> PhysicalState {
            PhysicalState::new(PhysicalQuantity::Concentration, DVector::zeros(self.points))
        }

        fn name(&self) -> &str {
            "MockModel"
        }
    }

    #[test]
    fn test_scenario_creation() {
        let grid = Grid::uniform(1.0, 1.0, 10, 2).unwrap();
        let scenario = Scenario::new(Box::new(MockModel { points: 10 }), grid);

        assert_eq!(scenario.get_model_name(), "MockModel");
        assert!(scenario.validate().is_ok());
        assert!(format!("{:?}", scenario).contains("MockModel"));
    }

    #[test]
    fn test_point_mismatch_rejected() {
        let grid = Grid::uniform(1.0, 1.0, 10, 2).unwrap();
        let scenario = Scenario::new(Box::new(MockModel { points: 5 }), grid);

        assert!(matches!(scenario.validate(), Err(SorbError::InvalidParameter { .. })));
    }

    #[test]
    fn test_initial_state_is_projected() {
        let grid = Grid::uniform(1.0, 1.0, 4, 2).unwrap();
        let scenario = Scenario::new(Box::new(MockModel { points: 4 }), grid);

        let state = scenario.initial_state().unwrap();
        assert_eq!(state.as_slice(), &[1.0, 0.0, 0.0, 0.0]);
    }
}
