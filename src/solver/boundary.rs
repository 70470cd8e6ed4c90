//! Boundary conditions and their canonical encoding
//!
//! Every physical boundary statement is encoded as a relation
//!
//! ```text
//! p(u) + q · f(u, g(u)) = 0
//! ```
//!
//! at the boundary node, where `f` is the flux law of the field and `g(u)` the
//! one-sided gradient built from the adjacent interior node:
//!
//! ```text
//! left:   g(u) = (u₁ - u) / h
//! right:  g(u) = (u - u_{N-2}) / h
//! ```
//!
//! | Statement  | p(u)         | q |
//! |------------|--------------|---|
//! | Dirichlet  | u - V(t)     | 0 |
//! | Outflow    | v · u        | 1 |
//! | Zero flux  | 0            | 1 |
//! | Robin      | a · u + b    | 1 |
//!
//! With `f = D g - v u`, the outflow relation reduces to `D g = 0`
//! (zero dispersive flux leaving the bed).
//!
//! # Solving for the boundary value
//!
//! For affine `p` and the linear flux laws the relation is affine in `u`,
//! `A u + B = 0`, and is solved in closed form. Arbitrary `p` fall back to a
//! local Newton iteration with a difference-quotient derivative.
//!
//! When `A` vanishes the relation does not determine the node:
//! - if it also holds for every value of the node and its neighbour (zero
//!   flux on a field without transport, outflow without dispersion), the node
//!   is *evolved* with its own one-sided flux balance;
//! - otherwise the relation is unsolvable and the model is rejected.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SorbError};
use crate::models::{FluxLaw, InletProfile};

/// Newton iteration cap for nonlinear relations
const MAX_NEWTON_ITERATIONS: usize = 50;

/// Newton step tolerance, relative to `1 + |u|`
const NEWTON_TOLERANCE: f64 = 1e-12;

/// End of the column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl Side {
    /// `dg/du` of the one-sided gradient at this side
    fn gradient_sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// One-sided gradient from the boundary value and its interior neighbour
    #[inline]
    pub fn gradient(self, value: f64, neighbour: f64, spacing: f64) -> f64 {
        match self {
            Side::Left => (neighbour - value) / spacing,
            Side::Right => (value - neighbour) / spacing,
        }
    }
}

/// Residual function of a nonlinear relation
pub type ResidualFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

// =================================================================================================
// Boundary statements
// =================================================================================================

/// Physical statement imposed at one end of one field
pub enum BoundaryCondition {
    /// Fixed (possibly time-varying) value
    Dirichlet(InletProfile),

    /// `a · u + b + f = 0`
    Robin { coefficient: f64, offset: f64 },

    /// Free outflow: no dispersive flux across the boundary
    Outflow,

    /// No total flux across the boundary
    ZeroFlux,

    /// Arbitrary `p(u) + q · f = 0`
    Relation { p: ResidualFn, q: f64 },
}

impl Clone for BoundaryCondition {
    fn clone(&self) -> Self {
        match self {
            Self::Dirichlet(profile) => Self::Dirichlet(profile.clone()),
            Self::Robin { coefficient, offset } => Self::Robin {
                coefficient: *coefficient,
                offset: *offset,
            },
            Self::Outflow => Self::Outflow,
            Self::ZeroFlux => Self::ZeroFlux,
            Self::Relation { p, q } => Self::Relation {
                p: Arc::clone(p),
                q: *q,
            },
        }
    }
}

impl fmt::Debug for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dirichlet(profile) => f.debug_tuple("Dirichlet").field(profile).finish(),
            Self::Robin { coefficient, offset } => f
                .debug_struct("Robin")
                .field("coefficient", coefficient)
                .field("offset", offset)
                .finish(),
            Self::Outflow => write!(f, "Outflow"),
            Self::ZeroFlux => write!(f, "ZeroFlux"),
            Self::Relation { q, .. } => f
                .debug_struct("Relation")
                .field("p", &"<user-defined>")
                .field("q", q)
                .finish(),
        }
    }
}

impl BoundaryCondition {
    /// Constant Dirichlet value
    pub fn fixed(value: f64) -> Self {
        Self::Dirichlet(InletProfile::constant(value))
    }

    /// Nonlinear relation `p(u) + q · f = 0`
    pub fn relation<F>(p: F, q: f64) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Relation { p: Arc::new(p), q }
    }

    /// Canonical `(p, q)` form at time `t` for a field obeying `law`
    pub fn encode(&self, law: &FluxLaw, t: f64) -> Result<BoundaryRelation> {
        let relation = match self {
            Self::Dirichlet(profile) => BoundaryRelation::affine(1.0, -profile.value_at(t), 0.0),
            Self::Robin { coefficient, offset } => BoundaryRelation::affine(*coefficient, *offset, 1.0),
            Self::Outflow => {
                let velocity = law.velocity();
                if velocity < 0.0 {
                    return Err(SorbError::invalid(format!(
                        "outflow boundary requires a non-negative velocity, got {}",
                        velocity
                    )));
                }
                BoundaryRelation::affine(velocity, 0.0, 1.0)
            }
            Self::ZeroFlux => BoundaryRelation::affine(0.0, 0.0, 1.0),
            Self::Relation { p, q } => BoundaryRelation {
                p: Residual::Nonlinear(Arc::clone(p)),
                q: *q,
            },
        };
        relation.validate()?;
        Ok(relation)
    }
}

// =================================================================================================
// Canonical relation
// =================================================================================================

/// The `p` part of a relation
#[derive(Clone)]
pub enum Residual {
    /// `p(u) = slope · u + offset`
    Affine { slope: f64, offset: f64 },
    Nonlinear(ResidualFn),
}

impl Residual {
    #[inline]
    pub fn evaluate(&self, value: f64) -> f64 {
        match self {
            Residual::Affine { slope, offset } => slope * value + offset,
            Residual::Nonlinear(p) => p(value),
        }
    }
}

impl fmt::Debug for Residual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Residual::Affine { slope, offset } => f
                .debug_struct("Affine")
                .field("slope", slope)
                .field("offset", offset)
                .finish(),
            Residual::Nonlinear(_) => write!(f, "Nonlinear(<user-defined>)"),
        }
    }
}

/// How a boundary node is advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryTreatment {
    /// Value solved from the relation; never integrated
    Constrained,
    /// Value integrated with the one-sided flux balance
    Evolved,
}

/// Canonical `p(u) + q · f = 0`
#[derive(Debug, Clone)]
pub struct BoundaryRelation {
    pub p: Residual,
    pub q: f64,
}

impl BoundaryRelation {
    pub fn affine(slope: f64, offset: f64, q: f64) -> Self {
        Self {
            p: Residual::Affine { slope, offset },
            q,
        }
    }

    /// Rejects relations that constrain nothing (`p ≡ 0` with `q = 0`)
    pub fn validate(&self) -> Result<()> {
        if !self.q.is_finite() {
            return Err(SorbError::invalid(format!("boundary flux weight q = {} is not finite", self.q)));
        }
        if let Residual::Affine { slope, offset } = self.p {
            if !(slope.is_finite() && offset.is_finite()) {
                return Err(SorbError::invalid("boundary relation has non-finite coefficients"));
            }
            if slope == 0.0 && offset == 0.0 && self.q == 0.0 {
                return Err(SorbError::invalid("boundary relation p ≡ 0 with q = 0 is empty"));
            }
        }
        Ok(())
    }

    /// `p(u) + q · flux`
    #[inline]
    pub fn residual(&self, value: f64, flux: f64) -> f64 {
        self.p.evaluate(value) + self.q * flux
    }

    /// Coefficient `A` of `A u + B` for affine relations
    fn value_coefficient(slope: f64, q: f64, law: &FluxLaw, side: Side, spacing: f64) -> (f64, f64) {
        let (d_value, d_gradient) = law.sensitivity();
        let coefficient = slope + q * (d_value + d_gradient * side.gradient_sign() / spacing);
        let scale = slope.abs() + q.abs() * (d_value.abs() + d_gradient.abs() / spacing);
        (coefficient, scale)
    }

    /// Decides whether the relation determines the boundary node
    pub fn classify(
        &self,
        law: &FluxLaw,
        side: Side,
        spacing: f64,
    ) -> std::result::Result<BoundaryTreatment, String> {
        let Residual::Affine { slope, offset } = self.p else {
            return Ok(BoundaryTreatment::Constrained);
        };

        let (coefficient, scale) = Self::value_coefficient(slope, self.q, law, side, spacing);
        if coefficient.abs() > 1e-12 * scale {
            return Ok(BoundaryTreatment::Constrained);
        }

        let (_, d_gradient) = law.sensitivity();
        if offset == 0.0 && self.q * d_gradient == 0.0 {
            Ok(BoundaryTreatment::Evolved)
        } else {
            Err(format!(
                "relation does not depend on the boundary value (p = {:?}, q = {})",
                self.p, self.q
            ))
        }
    }

    /// Boundary value satisfying the relation given the interior neighbour
    ///
    /// `guess` seeds the Newton iteration of nonlinear relations.
    pub fn solve(
        &self,
        law: &FluxLaw,
        side: Side,
        neighbour: f64,
        spacing: f64,
        guess: f64,
    ) -> std::result::Result<f64, String> {
        let residual = |u: f64| self.residual(u, law.flux(u, side.gradient(u, neighbour, spacing)));

        match self.p {
            Residual::Affine { slope, .. } => {
                let (coefficient, scale) = Self::value_coefficient(slope, self.q, law, side, spacing);
                if coefficient.abs() <= 1e-12 * scale {
                    return Err("relation does not depend on the boundary value".to_string());
                }
                Ok(-residual(0.0) / coefficient)
            }
            Residual::Nonlinear(_) => {
                let mut u = if guess.is_finite() { guess } else { neighbour };

                for _ in 0..MAX_NEWTON_ITERATIONS {
                    let r = residual(u);
                    if !r.is_finite() {
                        return Err(format!("non-finite residual at u = {}", u));
                    }

                    let shifted = u + crate::physics::difference_increment(u);
                    let derivative = (residual(shifted) - r) / (shifted - u);
                    if derivative == 0.0 || !derivative.is_finite() {
                        return Err(format!("vanishing residual derivative at u = {}", u));
                    }

                    let step = r / derivative;
                    u -= step;
                    if step.abs() <= NEWTON_TOLERANCE * (1.0 + u.abs()) {
                        return Ok(u);
                    }
                }

                Err(format!(
                    "Newton iteration did not converge in {} iterations",
                    MAX_NEWTON_ITERATIONS
                ))
            }
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
