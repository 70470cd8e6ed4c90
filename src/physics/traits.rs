//! Physical models traits and types
//!
//! This module defines the core API for physical models:
//! - `PhysicalModel`: trait for all models advanced in time by a solver
//! - `PhysicalState`: labelled, field-major state container
//! - `PhysicalQuantity`: type-safe field identifiers

use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, SorbError};

// =================================================================================================
// Physical quantities (Type-safe Identifiers)
// =================================================================================================

/// Known physical quantities (type-safe enum)
///
/// A model tracks one or more fields; each field is identified by a
/// quantity, and a quantity appears at most once per model.
///
/// # Example
/// ```
/// use sorb_rs::physics::PhysicalQuantity;
///
/// let tracer = PhysicalQuantity::Custom("Tracer");
/// assert_eq!(tracer.to_string(), "Tracer");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalQuantity {
    /// Fluid-phase concentration (mass per fluid volume)
    Concentration,

    /// Sorbed-phase loading (mass per solid mass)
    Loading,

    /// Custom quantity (for use extension)
    Custom(&'static str),
}

impl fmt::Display for PhysicalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalQuantity::Concentration => write!(f, "Concentration"),
            PhysicalQuantity::Loading => write!(f, "Loading"),
            PhysicalQuantity::Custom(name) => write!(f, "{}", name),
        }
    }
}

// =================================================================================================
// Physical State (Field-major State Container)
// =================================================================================================

/// Physical state of the system
///
/// All fields share the same node count. Values are stored field-major in a
/// single vector, `values[field * points + node]`, which is exactly the
/// layout the integrators advance.
///
/// # Example
/// ```
/// use nalgebra::DVector;
/// use sorb_rs::physics::{PhysicalQuantity, PhysicalState};
///
/// let state = PhysicalState::from_fields(vec![
///     (PhysicalQuantity::Concentration, DVector::from_vec(vec![1.0, 0.5, 0.0])),
///     (PhysicalQuantity::Loading, DVector::zeros(3)),
/// ]).unwrap();
///
/// assert_eq!(state.points(), 3);
/// assert_eq!(state.values().len(), 6);
/// assert_eq!(state.get(PhysicalQuantity::Concentration).unwrap()[1], 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalState {
    /// Field order inside `values`
    layout: Vec<PhysicalQuantity>,

    /// Nodes per field
    points: usize,

    /// Field-major values
    values: DVector<f64>,

    /// Scalar metadata (optional, e.g. time, inventory)
    metadata: HashMap<String, f64>,
}

impl PhysicalState {
    /// Create a single-field state
    pub fn new(quantity: PhysicalQuantity, values: DVector<f64>) -> Self {
        Self {
            layout: vec![quantity],
            points: values.len(),
            values,
            metadata: HashMap::new(),
        }
    }

    /// Create a state from several fields of equal length
    pub fn from_fields(fields: Vec<(PhysicalQuantity, DVector<f64>)>) -> Result<Self> {
        let Some(points) = fields.first().map(|(_, values)| values.len()) else {
            return Err(SorbError::invalid("a state needs at least one field"));
        };

        let mut layout = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(points * fields.len());

        for (quantity, field) in fields {
            if field.len() != points {
                return Err(SorbError::invalid(format!(
                    "field {} has {} values, expected {}",
                    quantity,
                    field.len(),
                    points
                )));
            }
            if layout.contains(&quantity) {
                return Err(SorbError::invalid(format!("field {} appears twice", quantity)));
            }
            layout.push(quantity);
            values.extend(field.iter());
        }

        Ok(Self {
            layout,
            points,
            values: DVector::from_vec(values),
            metadata: HashMap::new(),
        })
    }

    /// Wrap an already field-major vector
    pub fn from_values(
        layout: Vec<PhysicalQuantity>,
        points: usize,
        values: DVector<f64>,
    ) -> Result<Self> {
        if layout.is_empty() || values.len() != layout.len() * points {
            return Err(SorbError::invalid(format!(
                "{} values cannot hold {} fields of {} points",
                values.len(),
                layout.len(),
                points
            )));
        }
        Ok(Self {
            layout,
            points,
            values,
            metadata: HashMap::new(),
        })
    }

    /// Field order
    pub fn layout(&self) -> &[PhysicalQuantity] {
        &self.layout
    }

    /// Nodes per field
    pub fn points(&self) -> usize {
        self.points
    }

    /// Position of a quantity in the layout
    pub fn index_of(&self, quantity: PhysicalQuantity) -> Option<usize> {
        self.layout.iter().position(|q| *q == quantity)
    }

    /// Values of one field, by layout index
    pub fn field(&self, index: usize) -> &[f64] {
        let start = index * self.points;
        &self.values.as_slice()[start..start + self.points]
    }

    /// Get a field by quantity
    pub fn get(&self, quantity: PhysicalQuantity) -> Option<&[f64]> {
        self.index_of(quantity).map(|index| self.field(index))
    }

    /// Get mutable access to a field
    pub fn get_mut(&mut self, quantity: PhysicalQuantity) -> Option<&mut [f64]> {
        let index = self.index_of(quantity)?;
        let start = index * self.points;
        Some(&mut self.values.as_mut_slice()[start..start + self.points])
    }

    /// Field-major values
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Consume the state, keeping only its values
    pub fn into_values(self) -> DVector<f64> {
        self.values
    }

    /// Get a metadata
    pub fn get_metadata(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).copied()
    }

    /// Set a metadata
    pub fn set_metadata(&mut self, key: String, value: f64) {
        self.metadata.insert(key, value);
    }
}

// =================================================================================================
// Physical Model Trait
// =================================================================================================

/// Relative increment used by forward-difference Jacobians.
pub fn difference_increment(value: f64) -> f64 {
    f64::EPSILON.sqrt() * value.abs().max(1.0)
}

/// Trait for physical models
///
/// # Responsibility
/// Evaluates the semi-discrete right-hand side `dy/dt = f(t, y)` of a system.
/// Does NOT integrate it (that's the Solver's job).
///
/// The state handed to every method is field-major with
/// `points() * fields().len()` entries.
pub trait PhysicalModel: Send + Sync {
    /// Number of spatial points per field
    fn points(&self) -> usize;

    /// Fields tracked by the model, in state order
    fn fields(&self) -> &[PhysicalQuantity];

    /// Length of the state vector
    fn dimension(&self) -> usize {
        self.points() * self.fields().len()
    }

    /// Writes `dy/dt` at `(t, state)` into `rate`
    ///
    /// `rate` has the same length as `state`. Nodes that are algebraically
    /// constrained (for example a fixed-value boundary) must get a zero rate:
    /// they are re-imposed by [`enforce_constraints`](Self::enforce_constraints).
    fn compute_physics(&self, t: f64, state: &DVector<f64>, rate: &mut DVector<f64>) -> Result<()>;

    /// Overwrites constrained entries of `state` with the values their
    /// relations impose at time `t`
    ///
    /// Called on the initial state, after every accepted step and before a
    /// checkpoint is stored.
    fn enforce_constraints(&self, _t: f64, _state: &mut DVector<f64>) -> Result<()> {
        Ok(())
    }

    /// Jacobian `∂rate/∂state` at `(t, state)`, given `rate = f(t, state)`
    ///
    /// The default perturbs one column at a time (forward differences, one
    /// right-hand-side evaluation per state entry). Models with a narrow
    /// stencil should override it.
    fn jacobian(
        &self,
        t: f64,
        state: &DVector<f64>,
        rate: &DVector<f64>,
        jacobian: &mut DMatrix<f64>,
    ) -> Result<()> {
        let n = state.len();
        let mut perturbed = state.clone();
        let mut shifted = DVector::zeros(n);

        for j in 0..n {
            let original = perturbed[j];
            perturbed[j] = original + difference_increment(original);
            let delta = perturbed[j] - original;

            self.compute_physics(t, &perturbed, &mut shifted)?;
            perturbed[j] = original;

            for i in 0..n {
                jacobian[(i, j)] = (shifted[i] - rate[i]) / delta;
            }
        }
        Ok(())
    }

    /// Creates the initial state for this physical model
    fn setup_initial_state(&self) -> PhysicalState;

    /// Name of the model (used to display and logging)
    fn name(&self) -> &str;

    /// Description of the model (option)
    fn description(&self) -> Option<&str> {
        None
    }
}
