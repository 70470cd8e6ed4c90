//! Physical models
//!
//! This module provides the trait and state container shared by every model
//! the solvers can advance. A physical model encapsulates the semi-discrete
//! equations of a system: given a time and a state vector it returns the
//! rate of change of every entry.
//!
//! # Core Concepts
//!
//! - **Physical Model**: Computes `dy/dt = f(t, y)` and knows which entries are
//!   algebraic constraints (boundary nodes)
//! - **Physical State**: Field-major container for all tracked quantities
//! - **Physical Quantity**: Type-safe identifier for a field
//!
//! # Architecture
//!
//! Physical models are **separate from numerical solvers**:
//! - The model provides the **equations** (physics and spatial discretization)
//! - The solver provides the **method** to advance them in time
//!
//! # Example
//!
//! ```rust
//! use nalgebra::DVector;
//! use sorb_rs::error::Result;
//! use sorb_rs::physics::{PhysicalModel, PhysicalQuantity, PhysicalState};
//!
//! /// dy/dt = -y at two independent points
//! struct Decay;
//!
//! impl PhysicalModel for Decay {
//!     fn points(&self) -> usize { 2 }
//!     fn fields(&self) -> &[PhysicalQuantity] { &[PhysicalQuantity::Concentration] }
//!     fn compute_physics(&self, _t: f64, y: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()> {
//!         rate.copy_from(&(-y));
//!         Ok(())
//!     }
//!     fn setup_initial_state(&self) -> PhysicalState {
//!         PhysicalState::new(PhysicalQuantity::Concentration, DVector::from_element(2, 1.0))
//!     }
//!     fn name(&self) -> &str { "Decay" }
//! }
//!
//! let model = Decay;
//! let state = model.setup_initial_state().into_values();
//! let mut rate = DVector::zeros(model.dimension());
//! model.compute_physics(0.0, &state, &mut rate).unwrap();
//! assert_eq!(rate[0], -1.0);
//! ```
//!
//! # Available Models
//!
//! - [`ColumnModel`](crate::models::ColumnModel): fixed-bed advection-dispersion
//!   with optional linear-driving-force sorption

pub mod traits;

pub use traits::{difference_increment, PhysicalModel, PhysicalQuantity, PhysicalState};
