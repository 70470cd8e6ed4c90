//! Two-stage L-stable SDIRK solver
//!
//! # Mathematical Background
//!
//! Singly diagonally implicit Runge-Kutta method with `γ = 1 - 1/√2`:
//!
//! ```text
//!  γ  │ γ
//!  1  │ 1-γ   γ
//! ────┼──────────
//!     │ 1-γ   γ
//! ```
//!
//! Each stage solves `Yᵢ = Bᵢ + hγ f(tᵢ, Yᵢ)` with
//!
//! ```text
//! B₁ = yₙ
//! B₂ = yₙ + h (1-γ) k₁
//! yₙ₊₁ = Y₂                         (stiffly accurate, order 2)
//! ```
//!
//! The method is L-stable: components with `hλ → -∞` are damped to zero, so
//! the step size follows accuracy rather than the stiffest mode.
//!
//! # Error estimate
//!
//! The difference with the embedded first-order solution `yₙ + h k₁` is
//! `hγ (k₂ - k₁)`. It is filtered through the iteration matrix,
//!
//! ```text
//! e = (I - hγJ)⁻¹ · hγ (k₂ - k₁)
//! ```
//!
//! which keeps the estimate bounded for stiff components.
//!
//! # Stage solves
//!
//! Simplified Newton with the matrix `I - hγJ`, factorised once (nalgebra LU)
//! and reused while `hγ` changes by less than 20%. The Jacobian is refreshed
//! after rejected steps, failed stage solves or slow Newton convergence.

use log::{trace, warn};
use nalgebra::{DMatrix, DVector, Dyn, LU};

use crate::error::Result;
use crate::solver::methods::{integrate, scaled_norm, Attempt, Evaluator, Stepper, Tolerance};
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration};

/// Diagonal coefficient 1 - 1/√2
const GAMMA: f64 = 1.0 - std::f64::consts::FRAC_1_SQRT_2;

/// Newton iterations per stage
const MAX_NEWTON_ITERATIONS: usize = 8;

/// Newton update norm (in units of the error tolerance) that ends a stage
const NEWTON_TOLERANCE: f64 = 0.03;

/// Contraction above which the Newton iteration is abandoned
const DIVERGENCE_RATE: f64 = 0.9;

/// Contraction above which the Jacobian is refreshed before the next step
const SLOW_RATE: f64 = 0.5;

/// Relative change of hγ tolerated before refactoring
const REFACTOR_THRESHOLD: f64 = 0.2;

/// L-stable implicit solver for stiff transport problems
///
/// # Example
///
/// ```rust
/// use sorb_rs::solver::{SdirkSolver, Solver};
///
/// let solver = SdirkSolver::new();
/// assert_eq!(solver.name(), "SDIRK2 (L-stable)");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SdirkSolver;

impl SdirkSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for SdirkSolver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult> {
        let mut stepper = SdirkStepper::new(scenario.model.dimension());
        integrate(&mut stepper, scenario, config)
    }

    fn name(&self) -> &'static str {
        "SDIRK2 (L-stable)"
    }
}

struct SdirkStepper {
    jacobian: DMatrix<f64>,
    /// Jacobian was evaluated at the current state
    jacobian_fresh: bool,
    /// Jacobian must be re-evaluated before the next attempt
    jacobian_stale: bool,

    lu: Option<LU<f64, Dyn, Dyn>>,
    /// hγ the LU was built for
    factored_hg: f64,

    rate: DVector<f64>,
}

impl SdirkStepper {
    fn new(dimension: usize) -> Self {
        Self {
            jacobian: DMatrix::zeros(dimension, dimension),
            jacobian_fresh: false,
            jacobian_stale: true,
            lu: None,
            factored_hg: 0.0,
            rate: DVector::zeros(dimension),
        }
    }

    fn refresh_jacobian(&mut self, evaluator: &mut Evaluator, t: f64, y: &DVector<f64>) -> Result<()> {
        evaluator.rhs(t, y, &mut self.rate)?;
        evaluator.jacobian(t, y, &self.rate, &mut self.jacobian)?;
        self.jacobian_fresh = true;
        self.jacobian_stale = false;
        self.lu = None;
        Ok(())
    }

    fn factor(&mut self, evaluator: &mut Evaluator, hg: f64) {
        let needs_factor = match self.lu {
            None => true,
            Some(_) => ((hg - self.factored_hg) / self.factored_hg).abs() > REFACTOR_THRESHOLD,
        };

        if needs_factor {
            let n = evaluator.dimension();
            let matrix = DMatrix::identity(n, n) - &self.jacobian * hg;
            self.lu = Some(matrix.lu());
            self.factored_hg = hg;
            evaluator.stats.factorizations += 1;
        }
    }

    /// Solves `Y = base + hγ f(t, Y)` starting from `predictor`
    ///
    /// Returns `None` when the iteration diverges or stalls.
    fn solve_stage(
        &mut self,
        evaluator: &mut Evaluator,
        t: f64,
        base: &DVector<f64>,
        predictor: DVector<f64>,
        hg: f64,
        scale: &DVector<f64>,
    ) -> Result<Option<DVector<f64>>> {
        let Some(lu) = self.lu.as_ref() else {
            return Ok(None);
        };

        let mut stage = predictor;
        let mut previous: Option<f64> = None;

        for iteration in 0..MAX_NEWTON_ITERATIONS {
            evaluator.rhs(t, &stage, &mut self.rate)?;

            let mut residual = base - &stage;
            residual.axpy(hg, &self.rate, 1.0);

            let Some(delta) = lu.solve(&residual) else {
                return Ok(None);
            };
            stage += &delta;

            let norm = scaled_norm(&delta, scale);
            if !norm.is_finite() {
                return Ok(None);
            }

            if let Some(previous) = previous {
                let rate = norm / previous;
                if rate > DIVERGENCE_RATE {
                    trace!("stage Newton diverging at iteration {} (rate {:.3})", iteration, rate);
                    return Ok(None);
                }
                if rate > SLOW_RATE {
                    self.jacobian_stale = true;
                }
            }

            if norm < NEWTON_TOLERANCE {
                return Ok(Some(stage));
            }
            previous = Some(norm);
        }

        self.jacobian_stale = true;
        Ok(None)
    }
}

impl Stepper for SdirkStepper {
    const ERROR_ORDER: usize = 1;

    fn name(&self) -> &'static str {
        "SDIRK2 (L-stable)"
    }

    fn start(&mut self, evaluator: &mut Evaluator, t: f64, y: &DVector<f64>) -> Result<()> {
        self.refresh_jacobian(evaluator, t, y)
    }

    fn attempt(
        &mut self,
        evaluator: &mut Evaluator,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        tolerance: &Tolerance,
    ) -> Result<Attempt> {
        if self.jacobian_stale && !self.jacobian_fresh {
            self.refresh_jacobian(evaluator, t, y)?;
        }

        let hg = h * GAMMA;
        self.factor(evaluator, hg);
        let scale = tolerance.scale(y);

        // ====== Stage 1 ======

        let Some(first) = self.solve_stage(evaluator, t + hg, y, y.clone(), hg, &scale)? else {
            return Ok(Attempt::StageFailure);
        };
        // hγ k₁
        let increment = &first - y;

        // ====== Stage 2 ======

        let base = y + &increment * ((1.0 - GAMMA) / GAMMA);
        let predictor = y + &increment / GAMMA;
        let Some(second) = self.solve_stage(evaluator, t + h, &base, predictor, hg, &scale)? else {
            return Ok(Attempt::StageFailure);
        };

        // ====== Error estimate ======

        // hγ (k₂ - k₁)
        let raw = (&second - &base) - &increment;
        let filtered = match self.lu.as_ref().and_then(|lu| lu.solve(&raw)) {
            Some(filtered) => filtered,
            None => raw,
        };
        let error = tolerance.error_norm(&filtered, y, &second);

        Ok(Attempt::Candidate { state: second, error })
    }

    fn accept(&mut self, _evaluator: &mut Evaluator, _t: f64, _y: &DVector<f64>) -> Result<()> {
        self.jacobian_fresh = false;
        Ok(())
    }

    fn reject(&mut self, stage_failure: bool) {
        if self.jacobian_fresh {
            if stage_failure {
                warn!("stage Newton failed with a fresh Jacobian, reducing the step");
            }
        } else {
            self.jacobian_stale = true;
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
