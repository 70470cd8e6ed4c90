//! Convergence tests for the adaptive integrators
//!
//! These tests verify that the global error follows the requested tolerance
//! and that the implicit method copes with stiffness where the explicit one
//! cannot.

use sorb_rs::error::SorbError;
use sorb_rs::physics::PhysicalQuantity;
use sorb_rs::solver::{DormandPrinceSolver, Grid, Scenario, SdirkSolver, Solver, SolverConfiguration};

mod common;
use common::{relative_error, ExponentialDecay, StiffDecay};

fn decay_scenario(decay_rate: f64, duration: f64) -> Scenario {
    let model = ExponentialDecay::new(3, decay_rate);
    Scenario::new(Box::new(model), Grid::uniform(1.0, duration, 3, 2).unwrap())
}

fn final_error(solver: &dyn Solver, tolerance: f64) -> f64 {
    let model = ExponentialDecay::new(3, 0.3);
    let exact = model.analytical_solution(5.0, 1.0);
    let scenario = decay_scenario(0.3, 5.0);
    let config = SolverConfiguration::default().with_tolerances(tolerance, tolerance * 1e-3);

    let result = solver.solve(&scenario, &config).unwrap();
    let value = result.final_state.get(PhysicalQuantity::Concentration).unwrap()[0];
    relative_error(value, exact)
}

#[test]
fn test_dopri_error_follows_tolerance() {
    let solver = DormandPrinceSolver::new();
    let loose = final_error(&solver, 1e-4);
    let tight = final_error(&solver, 1e-8);

    println!("Dormand-Prince: rtol 1e-4 -> {:e}, rtol 1e-8 -> {:e}", loose, tight);
    assert!(loose < 1e-3);
    assert!(tight < 1e-7);
    assert!(tight < loose);
}

#[test]
fn test_sdirk_error_follows_tolerance() {
    let solver = SdirkSolver::new();
    let loose = final_error(&solver, 1e-3);
    let tight = final_error(&solver, 1e-6);

    println!("SDIRK2: rtol 1e-3 -> {:e}, rtol 1e-6 -> {:e}", loose, tight);
    assert!(loose < 2e-2);
    assert!(tight < 1e-4);
    assert!(tight * 10.0 < loose);
}

#[test]
fn test_sdirk_handles_stiff_relaxation_in_few_steps() {
    let model = StiffDecay::new(-1e4);
    let expected = model.analytical_solution(1.0);
    let scenario = Scenario::new(Box::new(model), Grid::uniform(1.0, 1.0, 2, 2).unwrap());

    let result = SdirkSolver::new()
        .solve(&scenario, &SolverConfiguration::default().with_tolerances(1e-4, 1e-8))
        .unwrap();

    let steps: usize = result.metadata("accepted steps").unwrap().parse().unwrap();
    let value = result.final_state.get(PhysicalQuantity::Concentration).unwrap()[0];

    println!("SDIRK2 on stiff relaxation: {} steps", steps);
    assert!(steps < 500, "{} steps", steps);
    assert!(relative_error(value, expected) < 1e-3);
}

#[test]
fn test_explicit_method_exhausts_budget_when_stiff() {
    let scenario = Scenario::new(Box::new(StiffDecay::new(-1e4)), Grid::uniform(1.0, 1.0, 2, 2).unwrap());

    let result = DormandPrinceSolver::new().solve(&scenario, &SolverConfiguration::default().with_max_steps(200));

    match result {
        Err(SorbError::NonConvergence { time, what }) => {
            assert!(time < 1.0);
            assert!(what.contains("budget"), "{}", what);
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("a stiff problem was solved within 200 explicit steps"),
    }
}

#[test]
fn test_minimum_step_is_enforced() {
    let scenario = decay_scenario(1.0, 1.0);
    let mut config = SolverConfiguration::default().with_initial_step(1e-3);
    config.min_step = 1e-2;

    let result = SdirkSolver::new().solve(&scenario, &config);
    assert!(matches!(result, Err(SorbError::NonConvergence { time, .. }) if time == 0.0));
}
