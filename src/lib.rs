//! sorb-rs: Fixed-bed transport and sorption solver
//!
//! Computes the time-evolving concentration field of a solute carried by
//! advection and dispersion through a one-dimensional packed bed, optionally
//! exchanging mass with a sorbed phase through linear-driving-force kinetics
//! towards a Langmuir equilibrium.
//!
//! # Architecture
//!
//! sorb-rs is built on two core principles:
//!
//! 1. **Separation of Physics and Numerics**
//!    - Physical models define the semi-discrete equations (what to solve)
//!    - Numerical solvers advance them in time (how to solve)
//!
//! 2. **Method of lines**
//!    - Each field is discretised on a uniform grid of nodes
//!    - Boundary statements are encoded as `p(u) + q · f = 0` relations
//!    - The resulting ODE system goes to an adaptive stiff integrator
//!
//! # Quick Start
//!
//! ```rust
//! use sorb_rs::prelude::*;
//!
//! # fn main() -> sorb_rs::error::Result<()> {
//! // 1. Describe the run (defaults: L = 10, D = 2e-2, v = 1e-3, C_in = 100)
//! let mut config = SimulationConfig::default();
//! config.grid.nodes = 41;
//! config.grid.checkpoints = 11;
//!
//! // 2. Solve it with the selected method (SDIRK2 by default)
//! let result = config.run()?;
//!
//! // 3. Read the breakthrough curve
//! let outlet = result.breakthrough(PhysicalQuantity::Concentration).unwrap();
//! assert_eq!(outlet.len(), 11);
//! assert!(outlet[10] < 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`physics`]: the `PhysicalModel` trait and labelled states
//! - [`models`]: flux laws, isotherms, sorption kinetics and the column model
//! - [`solver`]: grid, boundary encoding, scenario and time integrators
//! - [`config`]: serde parameter structs and the `run` entry point
//! - [`error`]: the crate error type

pub mod config;
pub mod error;
pub mod models;
pub mod physics;
pub mod solver;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use sorb_rs::prelude::*;
    //! ```
    pub use crate::config::{ColumnParameters, GridParameters, Method, SimulationConfig, SolverOptions, SorptionParameters};
    pub use crate::error::{Result, SorbError};
    pub use crate::models::{ColumnModel, FieldSpec, FluxLaw, InletProfile, Isotherm, Reaction};
    pub use crate::physics::{PhysicalModel, PhysicalQuantity, PhysicalState};
    pub use crate::solver::{
        BoundaryCondition, DormandPrinceSolver, Grid, Scenario, SdirkSolver, SimulationResult, Solver,
        SolverConfiguration,
    };
}
