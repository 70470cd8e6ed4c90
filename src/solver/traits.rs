//! Numerical solver traits and configuration
//!
//! # Design Philosophy
//!
//! - `Solver` trait: one method, `solve(scenario, configuration)`, shared by
//!   every time integrator
//! - `SolverConfiguration`: tolerances and budgets, independent of the method
//! - `SimulationResult`: dense checkpoint output plus string metadata

use crate::error::{Result, SorbError};
use crate::solver::{Scenario, SimulationResult};

// =================================================================================================
// Solver trait
// =================================================================================================

/// Time integrator interface
///
/// A solver advances the scenario's initial state through every checkpoint of
/// its grid and returns the dense result, or the first error encountered.
pub trait Solver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult>;

    /// Name used in metadata and logs
    fn name(&self) -> &'static str;
}

// =================================================================================================
// Solver configuration
// =================================================================================================

/// Error control and budget of an adaptive integrator
///
/// Local errors are measured in the weighted RMS norm with per-entry scale
/// `atol + rtol · max(|yᵢ|, |ŷᵢ|)`; a step is accepted when that norm is at
/// most one.
///
/// # Example
///
/// ```rust
/// use sorb_rs::solver::SolverConfiguration;
///
/// let config = SolverConfiguration::default()
///     .with_tolerances(1e-6, 1e-10)
///     .with_max_steps(5_000);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_steps, 5_000);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfiguration {
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,

    /// Attempted steps (accepted and rejected) before giving up
    pub max_steps: usize,

    /// First step size; estimated from the initial slope when absent
    pub initial_step: Option<f64>,

    /// Upper bound on the step size; the checkpoint span when absent
    pub max_step: Option<f64>,

    /// Steps below this size abort the integration
    pub min_step: f64,
}

impl Default for SolverConfiguration {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-3,
            absolute_tolerance: 1e-8,
            max_steps: 100_000,
            initial_step: None,
            max_step: None,
            min_step: 1e-12,
        }
    }
}

impl SolverConfiguration {
    pub fn with_tolerances(mut self, relative: f64, absolute: f64) -> Self {
        self.relative_tolerance = relative;
        self.absolute_tolerance = absolute;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = Some(step);
        self
    }

    pub fn with_max_step(mut self, step: f64) -> Self {
        self.max_step = Some(step);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.relative_tolerance >= 0.0 && self.relative_tolerance.is_finite()) {
            return Err(SorbError::invalid(format!(
                "relative tolerance must be non-negative, got {}",
                self.relative_tolerance
            )));
        }
        if !(self.absolute_tolerance >= 0.0 && self.absolute_tolerance.is_finite()) {
            return Err(SorbError::invalid(format!(
                "absolute tolerance must be non-negative, got {}",
                self.absolute_tolerance
            )));
        }
        if self.relative_tolerance == 0.0 && self.absolute_tolerance == 0.0 {
            return Err(SorbError::invalid("relative and absolute tolerances cannot both be zero"));
        }
        if self.max_steps == 0 {
            return Err(SorbError::invalid("max_steps must be greater than 0"));
        }
        if !(self.min_step > 0.0) {
            return Err(SorbError::invalid(format!("min_step must be positive, got {}", self.min_step)));
        }
        for (name, step) in [("initial_step", self.initial_step), ("max_step", self.max_step)] {
            if let Some(step) = step
                && !(step > 0.0 && step.is_finite())
            {
                return Err(SorbError::invalid(format!("{} must be positive, got {}", name, step)));
            }
        }
        Ok(())
    }
}
