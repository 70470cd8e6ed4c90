//! Run configuration
//!
//! Plain parameter structs with serde derives. Every field has a default, so a
//! JSON document only needs the values it changes:
//!
//! ```rust
//! use sorb_rs::config::{Method, SimulationConfig};
//!
//! let config = SimulationConfig::from_json_str(r#"{
//!     "column": { "inlet_concentration": 50.0 },
//!     "grid": { "nodes": 41, "checkpoints": 5 },
//!     "solver": { "method": "dormand_prince" }
//! }"#).unwrap();
//!
//! assert_eq!(config.column.inlet_concentration, 50.0);
//! assert_eq!(config.column.length, 10.0);
//! assert_eq!(config.solver.method, Method::DormandPrince);
//! assert!(config.sorption.is_none());
//! ```
//!
//! The defaults describe a 10-long column fed at 100 for 2000 time units,
//! with `D = 2e-2` and `v = 1e-3`, solved with SDIRK2.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SorbError};
use crate::models::{AdvectionScheme, ColumnModel};
use crate::solver::{
    DormandPrinceSolver, Grid, Scenario, SdirkSolver, SimulationResult, Solver, SolverConfiguration,
};

fn check(condition: bool, what: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(SorbError::invalid(what()))
    }
}

/// Transport through the bed and inlet feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnParameters {
    /// Bed length L
    pub length: f64,
    /// Axial dispersion coefficient D
    pub dispersion: f64,
    /// Pore velocity v
    pub velocity: f64,
    /// Inlet concentration C_in
    pub inlet_concentration: f64,
    /// Feed duration; `None` feeds for the whole run
    pub pulse_duration: Option<f64>,
}

impl Default for ColumnParameters {
    fn default() -> Self {
        Self {
            length: 10.0,
            dispersion: 2e-2,
            velocity: 1e-3,
            inlet_concentration: 100.0,
            pulse_duration: None,
        }
    }
}

impl ColumnParameters {
    pub fn validate(&self) -> Result<()> {
        check(self.length > 0.0 && self.length.is_finite(), || {
            format!("column length must be positive, got {}", self.length)
        })?;
        check(self.dispersion >= 0.0 && self.dispersion.is_finite(), || {
            format!("dispersion must be non-negative, got {}", self.dispersion)
        })?;
        check(self.velocity >= 0.0 && self.velocity.is_finite(), || {
            format!("velocity must be non-negative, got {}", self.velocity)
        })?;
        check(
            self.inlet_concentration >= 0.0 && self.inlet_concentration.is_finite(),
            || format!("inlet concentration must be non-negative, got {}", self.inlet_concentration),
        )?;
        if let Some(duration) = self.pulse_duration {
            check(duration > 0.0 && duration.is_finite(), || {
                format!("pulse duration must be positive, got {}", duration)
            })?;
        }
        Ok(())
    }
}

/// Sorbent bed and LDF Langmuir kinetics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorptionParameters {
    /// Bed porosity ε
    pub porosity: f64,
    /// Bulk density ρ_b
    pub density: f64,
    /// Mass-transfer rate K_F
    pub transfer_rate: f64,
    /// Langmuir capacity q_max
    pub capacity: f64,
    /// Langmuir affinity K_L
    pub affinity: f64,
}

impl Default for SorptionParameters {
    fn default() -> Self {
        Self {
            porosity: 0.4,
            density: 1500.0,
            transfer_rate: 1e-2,
            capacity: 1.5e-5,
            affinity: 1e3,
        }
    }
}

impl SorptionParameters {
    pub fn validate(&self) -> Result<()> {
        check(self.porosity > 0.0 && self.porosity < 1.0, || {
            format!("porosity must be in ]0,1[, got {}", self.porosity)
        })?;
        for (name, value) in [
            ("bulk density", self.density),
            ("mass-transfer rate", self.transfer_rate),
            ("Langmuir capacity", self.capacity),
            ("Langmuir affinity", self.affinity),
        ] {
            check(value > 0.0 && value.is_finite(), || {
                format!("{} must be positive, got {}", name, value)
            })?;
        }
        Ok(())
    }
}

/// Node count, checkpoint count and run duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParameters {
    pub nodes: usize,
    pub checkpoints: usize,
    pub duration: f64,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            nodes: 101,
            checkpoints: 21,
            duration: 2000.0,
        }
    }
}

impl GridParameters {
    pub fn validate(&self) -> Result<()> {
        check(self.nodes >= 3, || {
            format!("a column needs at least 3 nodes, got {}", self.nodes)
        })?;
        check(self.checkpoints >= 2, || {
            format!("need at least 2 checkpoints, got {}", self.checkpoints)
        })?;
        check(self.duration > 0.0 && self.duration.is_finite(), || {
            format!("duration must be positive, got {}", self.duration)
        })
    }
}

/// Time integration method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// L-stable SDIRK2
    #[default]
    Sdirk,
    /// Explicit Dormand-Prince 5(4)
    DormandPrince,
}

impl Method {
    pub fn solver(self) -> Box<dyn Solver> {
        match self {
            Method::Sdirk => Box::new(SdirkSolver::new()),
            Method::DormandPrince => Box::new(DormandPrinceSolver::new()),
        }
    }
}

/// Integrator choice and accuracy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub method: Method,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    pub max_steps: usize,
    pub scheme: AdvectionScheme,
}

impl Default for SolverOptions {
    fn default() -> Self {
        let defaults = SolverConfiguration::default();
        Self {
            method: Method::default(),
            relative_tolerance: defaults.relative_tolerance,
            absolute_tolerance: defaults.absolute_tolerance,
            max_steps: defaults.max_steps,
            scheme: AdvectionScheme::default(),
        }
    }
}

/// Complete description of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub column: ColumnParameters,
    /// Sorbing bed; `None` runs the single-field column
    pub sorption: Option<SorptionParameters>,
    pub grid: GridParameters,
    pub solver: SolverOptions,
}

impl SimulationConfig {
    /// Parses a JSON document; missing entries take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.column.validate()?;
        if let Some(sorption) = &self.sorption {
            sorption.validate()?;
        }
        self.grid.validate()?;
        self.solver_configuration().validate()
    }

    pub fn build_grid(&self) -> Result<Grid> {
        Grid::uniform(
            self.column.length,
            self.grid.duration,
            self.grid.nodes,
            self.grid.checkpoints,
        )
    }

    /// Column model and grid for this configuration
    pub fn scenario(&self) -> Result<Scenario> {
        self.validate()?;
        let grid = self.build_grid()?;

        let model = match &self.sorption {
            Some(sorption) => ColumnModel::with_sorption(&grid, &self.column, sorption)?,
            None => ColumnModel::advection_dispersion(&grid, &self.column)?,
        }
        .with_scheme(self.solver.scheme);

        Ok(Scenario::new(Box::new(model), grid))
    }

    pub fn solver_configuration(&self) -> SolverConfiguration {
        SolverConfiguration::default()
            .with_tolerances(self.solver.relative_tolerance, self.solver.absolute_tolerance)
            .with_max_steps(self.solver.max_steps)
    }

    /// Builds the scenario and solves it with the selected method
    pub fn run(&self) -> Result<SimulationResult> {
        let scenario = self.scenario()?;
        let solver = self.solver.method.solver();

        info!(
            "running '{}' with {} on {} nodes",
            scenario.get_model_name(),
            solver.name(),
            scenario.grid.nodes()
        );
        solver.solve(&scenario, &self.solver_configuration())
    }
}
