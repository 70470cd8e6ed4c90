//! Numerical solvers
//!
//! This module turns the semi-discrete system provided by a physical model
//! into a time history on the checkpoints of a grid.
//!
//! # Core Concepts
//!
//! ## The Architecture (WHAT vs HOW)
//!
//! 1. **Scenario** (`Scenario`) - WHAT to solve
//!    - Physical model (equations, boundary relations, initial state)
//!    - Grid (nodes and checkpoints)
//!
//! 2. **Configuration** (`SolverConfiguration`) - HOW precisely
//!    - Tolerances, step budget, step bounds
//!
//! 3. **Solver** (`Solver` trait) - The numerical method
//!    - `SdirkSolver`: L-stable implicit method, the default for transport
//!    - `DormandPrinceSolver`: explicit 5(4) pair for non-stiff runs
//!
//! # Module Organization
//!
//! - **`traits`**: `Solver` trait and `SolverConfiguration`
//! - **`boundary`**: boundary statements and their `p(u) + q·f = 0` encoding
//! - **`grid`**: spatial nodes and output checkpoints
//! - **`scenario`**: model + grid
//! - **`result`**: dense `(checkpoint, node, field)` output
//! - **`methods`**: the shared adaptive driver and both integrators
//!
//! # Quick Start Example
//!
//! ```rust
//! use sorb_rs::config::ColumnParameters;
//! use sorb_rs::models::ColumnModel;
//! use sorb_rs::physics::PhysicalQuantity;
//! use sorb_rs::solver::{Grid, Scenario, SdirkSolver, Solver, SolverConfiguration};
//!
//! let grid = Grid::uniform(10.0, 2000.0, 51, 5).unwrap();
//! let model = ColumnModel::advection_dispersion(&grid, &ColumnParameters::default()).unwrap();
//! let scenario = Scenario::new(Box::new(model), grid);
//!
//! let result = SdirkSolver::new()
//!     .solve(&scenario, &SolverConfiguration::default())
//!     .unwrap();
//!
//! let outlet = result.breakthrough(PhysicalQuantity::Concentration).unwrap();
//! assert!(outlet[4] < 100.0);
//! ```
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐   ┌──────────┐
//! │  Physical Model │   │   Grid   │
//! └────────┬────────┘   └────┬─────┘
//!          └───────┬─────────┘
//!         ┌────────▼────────┐
//!         │    Scenario     │ ← WHAT to solve
//!         └────────┬────────┘
//!         ┌────────▼─────────────┐
//!         │ Solver Configuration │ ← tolerances, budget
//!         └────────┬─────────────┘
//!         ┌────────▼────────┐
//!         │ Adaptive driver │ ← SDIRK2 / Dormand-Prince
//!         └────────┬────────┘
//!         ┌────────▼────────────┐
//!         │ Simulation Result   │ ← (t, x, field) cube + metadata
//!         └─────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All solvers return [`Result`](crate::error::Result); integration failures
//! surface as [`SorbError::NonConvergence`](crate::error::SorbError) carrying
//! the last time reached. No partial result is returned.

// =================================================================================================
// Module Declarations
// =================================================================================================
mod boundary;
mod grid;
mod methods;
mod result;
mod scenario;
mod traits;

// =================================================================================================
// Parallel node evaluation
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, SorbError};

/// State length above which column kernels run on Rayon
const DEFAULT_PARALLEL_THRESHOLD: usize = 999;

// A hint read on every rhs call; relaxed loads are enough.
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Current state length above which node kernels go parallel
///
/// Only consulted when the crate is built with the `parallel` feature; the
/// sequential and parallel paths produce identical rates.
///
/// ```rust
/// use sorb_rs::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Changes the parallel threshold and returns the previous value
///
/// ```rust
/// use sorb_rs::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = set_parallel_threshold(4096).unwrap();
/// assert_eq!(parallel_threshold(), 4096);
/// set_parallel_threshold(previous).unwrap();
///
/// assert!(set_parallel_threshold(0).is_err());
/// ```
pub fn set_parallel_threshold(threshold: usize) -> Result<usize> {
    if threshold == 0 {
        return Err(SorbError::invalid("parallel threshold must be at least 1"));
    }
    Ok(PARALLEL_THRESHOLD.swap(threshold, Ordering::Relaxed))
}

/// Test-only override, restored on drop
#[cfg(test)]
pub(crate) struct ThresholdGuard(usize);

#[cfg(test)]
impl ThresholdGuard {
    pub(crate) fn save(threshold: usize) -> Self {
        Self(PARALLEL_THRESHOLD.swap(threshold.max(1), Ordering::Relaxed))
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        PARALLEL_THRESHOLD.store(self.0, Ordering::Relaxed);
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use boundary::{BoundaryCondition, BoundaryRelation, BoundaryTreatment, Residual, ResidualFn, Side};
pub use grid::Grid;
pub use methods::{DormandPrinceSolver, SdirkSolver};
pub use result::SimulationResult;
pub use scenario::Scenario;
pub use traits::{Solver, SolverConfiguration};

// =================================================================================================
// Helper Functions
// =================================================================================================

use nalgebra::DVector;

/// Validate a state vector for numerical issues
///
/// NaN arises from 0/0 or Inf - Inf, Inf from overflow; either means the
/// integration cannot continue.
pub(crate) fn validate_state(state: &DVector<f64>, time: f64) -> Result<()> {
    if let Some(index) = state.iter().position(|x| x.is_nan()) {
        return Err(SorbError::non_convergence(
            time,
            format!("NaN detected in state entry {}", index),
        ));
    }
    if let Some(index) = state.iter().position(|x| x.is_infinite()) {
        return Err(SorbError::non_convergence(
            time,
            format!("Infinity detected in state entry {}", index),
        ));
    }
    Ok(())
}

// =================================================================================================
// Tests
// =================================================================================================
