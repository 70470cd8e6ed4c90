//! Mock physical models for testing
//!
//! These models have known analytical solutions, making them
//! ideal for validating numerical solver accuracy.

use nalgebra::DVector;
use sorb_rs::error::Result;
use sorb_rs::physics::{PhysicalModel, PhysicalQuantity, PhysicalState};

const CONCENTRATION: [PhysicalQuantity; 1] = [PhysicalQuantity::Concentration];

// =================================================================================================
// Exponential Decay: dy/dt = -k*y
// =================================================================================================

/// Exponential decay model: dy/dt = -k*y
///
/// Analytical solution: y(t) = y₀ * exp(-k*t)
pub struct ExponentialDecay {
    pub points: usize,
    pub decay_rate: f64,
}

impl ExponentialDecay {
    pub fn new(points: usize, decay_rate: f64) -> Self {
        Self { points, decay_rate }
    }

    /// Compute analytical solution at time t
    pub fn analytical_solution(&self, t: f64, y0: f64) -> f64 {
        y0 * (-self.decay_rate * t).exp()
    }
}

impl PhysicalModel for ExponentialDecay {
    fn points(&self) -> usize {
        self.points
    }

    fn fields(&self) -> &[PhysicalQuantity] {
        &CONCENTRATION
    }

    fn compute_physics(&self, _t: f64, state: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()> {
        for (r, y) in rate.iter_mut().zip(state.iter()) {
            *r = -self.decay_rate * y;
        }
        Ok(())
    }

    fn setup_initial_state(&self) -> PhysicalState {
        PhysicalState::new(PhysicalQuantity::Concentration, DVector::from_element(self.points, 1.0))
    }

    fn name(&self) -> &str {
        "Exponential Decay"
    }
}

// =================================================================================================
// Stiff decay: dy/dt = λ (y - g(t)) + g'(t)
// =================================================================================================

/// Fast relaxation towards the slow manifold `g(t) = 1 + t / 2`
///
/// Analytical solution: y(t) = g(t) + (y₀ - 1) exp(λ t)
pub struct StiffDecay {
    pub lambda: f64,
    pub y0: f64,
}

impl StiffDecay {
    pub fn new(lambda: f64) -> Self {
        Self { lambda, y0: 2.0 }
    }

    pub fn analytical_solution(&self, t: f64) -> f64 {
        1.0 + 0.5 * t + (self.y0 - 1.0) * (self.lambda * t).exp()
    }
}

impl PhysicalModel for StiffDecay {
    fn points(&self) -> usize {
        2
    }

    fn fields(&self) -> &[PhysicalQuantity] {
        &CONCENTRATION
    }

    fn compute_physics(&self, t: f64, state: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()> {
        let manifold = 1.0 + 0.5 * t;
        for (r, y) in rate.iter_mut().zip(state.iter()) {
            *r = self.lambda * (y - manifold) + 0.5;
        }
        Ok(())
    }

    fn setup_initial_state(&self) -> PhysicalState {
        PhysicalState::new(PhysicalQuantity::Concentration, DVector::from_element(2, self.y0))
    }

    fn name(&self) -> &str {
        "Stiff Decay"
    }
}
