//! Dormand-Prince 5(4) solver
//!
//! # Mathematical Background
//!
//! Explicit seven-stage Runge-Kutta pair. The fifth-order solution is
//! propagated, the embedded fourth-order solution only measures the error:
//!
//! ```text
//! kᵢ = f(tₙ + cᵢ h, yₙ + h Σⱼ aᵢⱼ kⱼ)
//! yₙ₊₁ = yₙ + h Σ bᵢ kᵢ              (order 5)
//! eₙ₊₁ = h Σ (bᵢ - b̂ᵢ) kᵢ            (local error of the order 4 solution)
//! ```
//!
//! The last stage is evaluated at `(tₙ + h, yₙ₊₁)`, so it is also the first
//! stage of the next step (FSAL): six evaluations per accepted step.
//!
//! # When to Use
//!
//! Explicit methods are limited by stability, not accuracy, once the
//! semi-discrete system is stiff (`h ≲ 3.3 / |λ_max|`). For columns with fine
//! grids or fast sorption kinetics prefer [`SdirkSolver`](super::SdirkSolver).

use nalgebra::DVector;

use crate::error::Result;
use crate::solver::methods::{integrate, Attempt, Evaluator, Stepper, Tolerance};
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration};

// Butcher tableau
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0],
    [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];

/// b - b̂
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Explicit adaptive Dormand-Prince 5(4) solver
///
/// # Example
///
/// ```rust
/// use sorb_rs::solver::{DormandPrinceSolver, Solver};
///
/// let solver = DormandPrinceSolver::new();
/// assert_eq!(solver.name(), "Dormand-Prince 5(4)");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DormandPrinceSolver;

impl DormandPrinceSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DormandPrinceSolver {
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult> {
        let mut stepper = DormandPrinceStepper::new(scenario.model.dimension());
        integrate(&mut stepper, scenario, config)
    }

    fn name(&self) -> &'static str {
        "Dormand-Prince 5(4)"
    }
}

struct DormandPrinceStepper {
    /// Stage derivatives; `k[0]` is f at the current state
    k: Vec<DVector<f64>>,
    stage: DVector<f64>,
}

impl DormandPrinceStepper {
    fn new(dimension: usize) -> Self {
        Self {
            k: vec![DVector::zeros(dimension); 7],
            stage: DVector::zeros(dimension),
        }
    }
}

impl Stepper for DormandPrinceStepper {
    const ERROR_ORDER: usize = 4;

    fn name(&self) -> &'static str {
        "Dormand-Prince 5(4)"
    }

    fn start(&mut self, evaluator: &mut Evaluator, t: f64, y: &DVector<f64>) -> Result<()> {
        evaluator.rhs(t, y, &mut self.k[0])
    }

    fn attempt(
        &mut self,
        evaluator: &mut Evaluator,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        tolerance: &Tolerance,
    ) -> Result<Attempt> {
        for i in 1..7 {
            self.stage.copy_from(y);
            for (j, a) in A[i].iter().enumerate().take(i) {
                if *a != 0.0 {
                    self.stage.axpy(h * a, &self.k[j], 1.0);
                }
            }
            evaluator.rhs(t + C[i] * h, &self.stage, &mut self.k[i])?;
        }

        // The seventh stage was evaluated at the fifth-order solution
        let mut error = DVector::zeros(y.len());
        for (e, k) in E.iter().zip(self.k.iter()) {
            if *e != 0.0 {
                error.axpy(h * e, k, 1.0);
            }
        }

        let norm = tolerance.error_norm(&error, y, &self.stage);
        Ok(Attempt::Candidate {
            state: self.stage.clone(),
            error: norm,
        })
    }

    fn accept(&mut self, _evaluator: &mut Evaluator, _t: f64, _y: &DVector<f64>) -> Result<()> {
        // Projection only touches constrained entries, whose rate is zero and
        // which the right-hand side re-solves from the interior.
        self.k.swap(0, 6);
        Ok(())
    }

    fn reject(&mut self, _stage_failure: bool) {}
}

// =================================================================================================
// Tests
// =================================================================================================
