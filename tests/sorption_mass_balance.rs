//! Coupled fluid / sorbed-phase behaviour
//!
//! The mass balance is checked over the interior nodes, whose semi-discrete
//! equations conserve `Σ h (c + φ q)` up to the boundary face fluxes.

use approx::assert_relative_eq;
use sorb_rs::config::{ColumnParameters, SorptionParameters};
use sorb_rs::models::{phase_ratio, Isotherm};
use sorb_rs::physics::PhysicalQuantity;
use sorb_rs::solver::{SdirkSolver, Solver, SolverConfiguration};

mod common;
use common::{column_scenario, sorbing_scenario};

fn bed() -> (ColumnParameters, SorptionParameters) {
    let params = ColumnParameters {
        length: 1.0,
        dispersion: 1e-3,
        velocity: 1e-2,
        inlet_concentration: 1.0,
        pulse_duration: None,
    };
    let sorption = SorptionParameters {
        porosity: 0.4,
        density: 1.0,
        transfer_rate: 0.1,
        capacity: 1.0,
        affinity: 1.0,
    };
    (params, sorption)
}

#[test]
fn test_langmuir_reference_values() {
    let isotherm = Isotherm::langmuir(1.5e-5, 1e3).unwrap();

    assert_eq!(isotherm.loading_equilibrium(0.0), 0.0);
    assert_relative_eq!(isotherm.loading_equilibrium(100.0), 1.4999e-5, max_relative = 1e-4);
    assert!(isotherm.loading_equilibrium(1e12) <= 1.5e-5);
}

#[test]
fn test_fluid_loss_equals_sorbed_gain() {
    let (params, sorption) = bed();
    let (nodes, checkpoints, duration) = (51, 1001, 100.0);
    let scenario = sorbing_scenario(&params, &sorption, duration, nodes, checkpoints);
    let config = SolverConfiguration::default().with_tolerances(1e-6, 1e-10);

    let result = SdirkSolver::new().solve(&scenario, &config).unwrap();

    let h = params.length / (nodes - 1) as f64;
    let phi = phase_ratio(sorption.porosity, sorption.density).unwrap();
    let c = |m: usize, i: usize| result.values[[m, i, 0]];
    let q = |m: usize, i: usize| result.values[[m, i, 1]];

    // J_in - J_out across the first and last interior faces
    let net_flux = |m: usize| {
        let inflow = params.velocity * c(m, 0) - params.dispersion * (c(m, 1) - c(m, 0)) / h;
        let outflow = params.velocity * c(m, nodes - 2) - params.dispersion * (c(m, nodes - 1) - c(m, nodes - 2)) / h;
        inflow - outflow
    };

    let mut net_inflow = 0.0;
    for m in 1..checkpoints {
        let dt = result.time_points[m] - result.time_points[m - 1];
        net_inflow += 0.5 * dt * (net_flux(m - 1) + net_flux(m));
    }

    let last = checkpoints - 1;
    let fluid: f64 = (1..nodes - 1).map(|i| h * (c(last, i) - c(0, i))).sum();
    let sorbed: f64 = (1..nodes - 1).map(|i| phi * h * (q(last, i) - q(0, i))).sum();

    let fluid_lost = net_inflow - fluid;
    println!("fluid lost {:.6}, sorbed gained {:.6}", fluid_lost, sorbed);

    assert!(sorbed > 0.1);
    assert_relative_eq!(fluid_lost, sorbed, max_relative = 0.05);
}

#[test]
fn test_loading_bounded_by_feed_equilibrium() {
    let (params, sorption) = bed();
    let scenario = sorbing_scenario(&params, &sorption, 100.0, 51, 11);

    let result = SdirkSolver::new()
        .solve(&scenario, &SolverConfiguration::default().with_tolerances(1e-5, 1e-9))
        .unwrap();

    // q* at the feed concentration: 1 · 1 · 1 / (1 + 1)
    let loading = result.values.slice(ndarray::s![.., .., 1]);
    for value in loading.iter() {
        assert!(*value >= -1e-8 && *value <= 0.5 + 1e-6, "loading {}", value);
    }

    // saturated near the inlet, still loading near the outlet
    let profile = result.profile(PhysicalQuantity::Loading, 10).unwrap();
    assert!(profile[5] > 0.4, "inlet loading {}", profile[5]);
    assert!(profile[45] < 0.5 * profile[5], "outlet loading {}", profile[45]);
}

#[test]
fn test_sorption_retards_breakthrough() {
    let (params, sorption) = bed();
    let config = SolverConfiguration::default().with_tolerances(1e-5, 1e-9);

    let inert = SdirkSolver::new()
        .solve(&column_scenario(&params, 100.0, 51, 11), &config)
        .unwrap();
    let sorbing = SdirkSolver::new()
        .solve(&sorbing_scenario(&params, &sorption, 100.0, 51, 11), &config)
        .unwrap();

    let inert_outlet = inert.breakthrough(PhysicalQuantity::Concentration).unwrap()[10];
    let sorbing_outlet = sorbing.breakthrough(PhysicalQuantity::Concentration).unwrap()[10];

    assert!(inert_outlet > 0.5, "inert outlet {}", inert_outlet);
    assert!(sorbing_outlet < 0.5 * inert_outlet, "sorbing outlet {}", sorbing_outlet);
}
