//! Physical models of a fixed-bed column
//!
//! All models implement the [`PhysicalModel`](crate::physics::PhysicalModel) trait.
//! The solver calls `compute_physics` at each stage: models are responsible
//! for the physics (transport, sorption, boundary relations), the solver for
//! the time integration.
//!
//! # Building blocks
//!
//! - [`FluxLaw`]: spatial flux of one field (advection-dispersion or none)
//! - [`Isotherm`]: equilibrium loading `q*(c)` (Langmuir, linear)
//! - [`Reaction`]: local source terms coupling the fields at a node
//!   ([`LinearDrivingForce`] sorption kinetics)
//! - [`InletProfile`]: time-varying value of a Dirichlet boundary
//!
//! # Column model
//!
//! [`ColumnModel`] discretises k fields, each described by a [`FieldSpec`],
//! on a uniform grid. Two ready-made columns are provided:
//!
//! - [`ColumnModel::advection_dispersion`]: one mobile field
//! - [`ColumnModel::with_sorption`]: fluid concentration plus a stagnant
//!   sorbed loading exchanging mass through LDF kinetics

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod column;
pub mod flux;
pub mod injection;
pub mod isotherm;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use column::{ColumnModel, FieldSpec, InitialCondition};
pub use flux::{phase_ratio, AdvectionScheme, FluxLaw, LinearDrivingForce, Reaction};
pub use injection::{FeedFn, InletProfile};
pub use isotherm::Isotherm;
