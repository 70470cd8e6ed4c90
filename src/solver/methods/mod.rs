//! Adaptive time integrators
//!
//! This module contains the concrete implementations of the
//! [`Solver`](crate::solver::Solver) trait and the step-size driver they share.
//!
//! # Available Methods
//!
//! - **[`SdirkSolver`]**: two-stage, L-stable singly diagonally implicit
//!   Runge-Kutta method (order 2, embedded order 1)
//!   - Cost: one Newton solve per stage, LU factorisations reused across steps
//!   - Use: **default**; dispersion and fast sorption kinetics make the
//!     semi-discrete column stiff
//!
//! - **[`DormandPrinceSolver`]**: explicit Runge-Kutta 5(4) pair with FSAL
//!   - Cost: 6 function evaluations per step
//!   - Use: non-stiff problems, accuracy cross-checks
//!
//! # Step-size control
//!
//! Both methods return a candidate state and an error estimate `e`. With the
//! per-entry scale `scᵢ = atol + rtol · max(|yᵢ|, |ŷᵢ|)` the driver computes
//!
//! ```text
//! err = sqrt( (1/n) Σ (eᵢ / scᵢ)² )
//! ```
//!
//! and accepts the step when `err ≤ 1`. The next step is
//! `h · clamp(0.9 · err^(-1/(p+1)), 0.2, 5)`, where `p` is the order of the
//! embedded estimate; after a rejection the step may not grow. Steps are
//! clipped so that every checkpoint is reached exactly.
//!
//! The run fails with `NonConvergence` when the step budget is exhausted,
//! when the step falls below `min_step`, or when a non-finite state appears.

mod dopri5;
mod sdirk;

pub use dopri5::DormandPrinceSolver;
pub use sdirk::SdirkSolver;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use ndarray::Array3;

use crate::error::{Result, SorbError};
use crate::physics::{PhysicalModel, PhysicalState};
use crate::solver::{validate_state, Scenario, SimulationResult, SolverConfiguration};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Step reduction after a failed stage solve
pub(crate) const FAILURE_FACTOR: f64 = 0.25;

/// Consecutive rejections reported as a burst
const REJECTION_BURST: usize = 10;

// =================================================================================================
// Counted model access
// =================================================================================================

/// Work counters reported in the result metadata
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Statistics {
    pub accepted: usize,
    pub rejected: usize,
    pub rhs_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub factorizations: usize,
    pub stage_failures: usize,
}

/// Model wrapper counting right-hand-side and Jacobian evaluations
pub(crate) struct Evaluator<'a> {
    model: &'a dyn PhysicalModel,
    pub stats: Statistics,
}

impl<'a> Evaluator<'a> {
    fn new(model: &'a dyn PhysicalModel) -> Self {
        Self {
            model,
            stats: Statistics::default(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn rhs(&mut self, t: f64, state: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()> {
        self.stats.rhs_evaluations += 1;
        self.model.compute_physics(t, state, rate)
    }

    pub fn jacobian(
        &mut self,
        t: f64,
        state: &DVector<f64>,
        rate: &DVector<f64>,
        jacobian: &mut DMatrix<f64>,
    ) -> Result<()> {
        self.stats.jacobian_evaluations += 1;
        self.model.jacobian(t, state, rate, jacobian)
    }
}

// =================================================================================================
// Error norm
// =================================================================================================

/// Weighted RMS norm
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerance {
    fn from_config(config: &SolverConfiguration) -> Self {
        Self {
            relative: config.relative_tolerance,
            absolute: config.absolute_tolerance,
        }
    }

    /// Per-entry scale `atol + rtol · |y|`
    pub fn scale(&self, y: &DVector<f64>) -> DVector<f64> {
        y.map(|v| self.absolute + self.relative * v.abs())
    }

    /// RMS of `error / (atol + rtol · max(|y|, |y_new|))`
    pub fn error_norm(&self, error: &DVector<f64>, y: &DVector<f64>, y_new: &DVector<f64>) -> f64 {
        let n = error.len().max(1) as f64;
        let sum: f64 = error
            .iter()
            .zip(y.iter().zip(y_new.iter()))
            .map(|(e, (a, b))| {
                let scale = self.absolute + self.relative * a.abs().max(b.abs());
                let ratio = e / scale;
                ratio * ratio
            })
            .sum();
        (sum / n).sqrt()
    }
}

/// RMS of `values / scale`
pub(crate) fn scaled_norm(values: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    let n = values.len().max(1) as f64;
    let sum: f64 = values
        .iter()
        .zip(scale.iter())
        .map(|(v, s)| (v / s) * (v / s))
        .sum();
    (sum / n).sqrt()
}

// =================================================================================================
// Stepper interface
// =================================================================================================

/// Outcome of a single attempted step
pub(crate) enum Attempt {
    /// Candidate state and its scaled error norm
    Candidate { state: DVector<f64>, error: f64 },
    /// The stage equations could not be solved at this step size
    StageFailure,
}

/// One adaptive one-step method
pub(crate) trait Stepper {
    /// Order of the embedded error estimate
    const ERROR_ORDER: usize;

    fn name(&self) -> &'static str;

    /// Prepare for integration from `(t, y)`
    fn start(&mut self, evaluator: &mut Evaluator, t: f64, y: &DVector<f64>) -> Result<()>;

    fn attempt(
        &mut self,
        evaluator: &mut Evaluator,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        tolerance: &Tolerance,
    ) -> Result<Attempt>;

    /// The last candidate was accepted and, after projection, became `(t, y)`
    fn accept(&mut self, evaluator: &mut Evaluator, t: f64, y: &DVector<f64>) -> Result<()>;

    /// The last attempt was rejected
    fn reject(&mut self, stage_failure: bool);
}

// =================================================================================================
// Driver
// =================================================================================================

/// Initial step from the size of the state and of its first two derivatives
fn initial_step(
    evaluator: &mut Evaluator,
    t: f64,
    y: &DVector<f64>,
    tolerance: &Tolerance,
    order: usize,
    span: f64,
) -> Result<f64> {
    let scale = tolerance.scale(y);
    let mut f0 = DVector::zeros(y.len());
    evaluator.rhs(t, y, &mut f0)?;

    let d0 = scaled_norm(y, &scale);
    let d1 = scaled_norm(&f0, &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 * span } else { 0.01 * d0 / d1 };
    let h0 = h0.min(span);

    let mut y1 = y.clone();
    y1.axpy(h0, &f0, 1.0);
    let mut f1 = DVector::zeros(y.len());
    evaluator.rhs(t + h0, &y1, &mut f1)?;
    let d2 = scaled_norm(&(f1 - &f0), &scale) / h0;

    let largest = d1.max(d2);
    let h1 = if largest <= 1e-15 {
        (h0 * 1e-3).max(1e-6 * span)
    } else {
        (0.01 / largest).powf(1.0 / (order + 1) as f64)
    };

    Ok((100.0 * h0).min(h1).min(span))
}

fn store(values: &mut Array3<f64>, checkpoint: usize, state: &DVector<f64>, points: usize) {
    for (index, value) in state.iter().enumerate() {
        values[[checkpoint, index % points, index / points]] = *value;
    }
}

/// Advances the scenario through every checkpoint with `stepper`
pub(crate) fn integrate<S: Stepper>(
    stepper: &mut S,
    scenario: &Scenario,
    config: &SolverConfiguration,
) -> Result<SimulationResult> {
    // ====== Step 1: Validation ======

    config.validate()?;
    scenario.validate()?;

    // ====== Step 2: Setup ======

    let model = scenario.model.as_ref();
    let checkpoints = scenario.grid.checkpoints();
    let points = model.points();
    let quantities = model.fields().to_vec();
    let tolerance = Tolerance::from_config(config);

    let t0 = checkpoints[0];
    let span = checkpoints[checkpoints.len() - 1] - t0;
    let max_step = config.max_step.unwrap_or(span).min(span);

    let mut y = scenario.initial_state()?;
    validate_state(&y, t0)?;

    let mut values = Array3::zeros((checkpoints.len(), points, quantities.len()));
    store(&mut values, 0, &y, points);

    let mut evaluator = Evaluator::new(model);
    let mut h = match config.initial_step {
        Some(step) => step,
        None => initial_step(&mut evaluator, t0, &y, &tolerance, S::ERROR_ORDER, span)?,
    }
    .min(max_step);

    stepper.start(&mut evaluator, t0, &y)?;

    debug!(
        "{}: integrating '{}' ({} unknowns) over [{}, {}], h0 = {:e}",
        stepper.name(),
        model.name(),
        y.len(),
        t0,
        t0 + span,
        h
    );

    // ====== Step 3: Time Integration ======

    let exponent = -1.0 / (S::ERROR_ORDER + 1) as f64;
    let mut t = t0;
    let mut last_rejected = false;
    let mut consecutive_rejections = 0;

    for (index, &target) in checkpoints.iter().enumerate().skip(1) {
        while t < target {
            let attempts = evaluator.stats.accepted + evaluator.stats.rejected;
            if attempts >= config.max_steps {
                return Err(SorbError::non_convergence(
                    t,
                    format!("step budget of {} exhausted", config.max_steps),
                ));
            }

            let remaining = target - t;
            let lands = h >= remaining;
            let step = if lands { remaining } else { h };
            if step < config.min_step && !lands {
                return Err(SorbError::non_convergence(
                    t,
                    format!("step size {:e} fell below the minimum {:e}", step, config.min_step),
                ));
            }

            match stepper.attempt(&mut evaluator, t, &y, step, &tolerance)? {
                Attempt::Candidate { state, error } if error <= 1.0 => {
                    t = if lands { target } else { t + step };
                    y = state;
                    model.enforce_constraints(t, &mut y)?;
                    validate_state(&y, t)?;
                    stepper.accept(&mut evaluator, t, &y)?;
                    evaluator.stats.accepted += 1;

                    let mut factor = if error == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * error.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    if last_rejected {
                        factor = factor.min(1.0);
                    }
                    last_rejected = false;
                    consecutive_rejections = 0;

                    // A step shortened to land on a checkpoint says nothing about
                    // the step the method could take.
                    h = if lands { h.max(step * factor) } else { step * factor }.min(max_step);
                }
                Attempt::Candidate { error, .. } => {
                    evaluator.stats.rejected += 1;
                    stepper.reject(false);
                    last_rejected = true;
                    consecutive_rejections += 1;

                    let factor = if error.is_finite() {
                        (SAFETY * error.powf(exponent)).clamp(MIN_FACTOR, 1.0)
                    } else {
                        MIN_FACTOR
                    };
                    h = step * factor;
                }
                Attempt::StageFailure => {
                    evaluator.stats.rejected += 1;
                    evaluator.stats.stage_failures += 1;
                    stepper.reject(true);
                    last_rejected = true;
                    consecutive_rejections += 1;
                    h = step * FAILURE_FACTOR;
                }
            }

            if consecutive_rejections == REJECTION_BURST {
                warn!(
                    "{}: {} consecutive rejected steps at t = {}, h = {:e}",
                    stepper.name(),
                    consecutive_rejections,
                    t,
                    h
                );
            }
        }

        store(&mut values, index, &y, points);
        debug!(
            "{}: checkpoint {} at t = {} ({} steps, {} rejected)",
            stepper.name(),
            index,
            target,
            evaluator.stats.accepted,
            evaluator.stats.rejected
        );
    }

    // ====== Step 4: Build Result ======

    let stats = evaluator.stats;
    info!(
        "{}: '{}' finished at t = {} after {} steps ({} rejected, {} rhs, {} jacobians, {} LU)",
        stepper.name(),
        model.name(),
        t,
        stats.accepted,
        stats.rejected,
        stats.rhs_evaluations,
        stats.jacobian_evaluations,
        stats.factorizations
    );

    let mut final_state = PhysicalState::from_values(quantities.clone(), points, y)?;
    final_state.set_metadata("time".to_string(), t);

    let mut result = SimulationResult::new(
        checkpoints.to_vec(),
        scenario.grid.positions().to_vec(),
        quantities,
        values,
        final_state,
    );

    result.add_metadata("solver", stepper.name());
    result.add_metadata("model", model.name());
    result.add_metadata("accepted steps", &stats.accepted.to_string());
    result.add_metadata("rejected steps", &stats.rejected.to_string());
    result.add_metadata("stage failures", &stats.stage_failures.to_string());
    result.add_metadata("rhs evaluations", &stats.rhs_evaluations.to_string());
    result.add_metadata("jacobian evaluations", &stats.jacobian_evaluations.to_string());
    result.add_metadata("lu factorizations", &stats.factorizations.to_string());
    result.add_metadata("relative tolerance", &config.relative_tolerance.to_string());
    result.add_metadata("absolute tolerance", &config.absolute_tolerance.to_string());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_error_norm_uses_larger_magnitude() {
        let tolerance = Tolerance { relative: 0.1, absolute: 0.0 };
        let error = DVector::from_vec(vec![0.1, 0.1]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let y_new = DVector::from_vec(vec![2.0, 1.0]);

        // both scales are 0.2
        assert_relative_eq!(tolerance.error_norm(&error, &y, &y_new), 0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_scaled_norm_is_rms() {
        let values = DVector::from_vec(vec![3.0, 4.0]);
        let scale = DVector::from_vec(vec![1.0, 1.0]);

        assert_relative_eq!(scaled_norm(&values, &scale), (12.5f64).sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn test_store_transposes_field_major_state() {
        let mut values = Array3::zeros((1, 2, 2));
        store(&mut values, 0, &DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]), 2);

        assert_eq!(values[[0, 0, 0]], 1.0);
        assert_eq!(values[[0, 1, 0]], 2.0);
        assert_eq!(values[[0, 0, 1]], 3.0);
        assert_eq!(values[[0, 1, 1]], 4.0);
    }
}
