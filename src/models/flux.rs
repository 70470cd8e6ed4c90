//! Flux laws and reaction (source) terms
//!
//! Every field of a column obeys a conservation law written in flux form:
//!
//! ```text
//! ∂u/∂t = ∂f/∂x + s,        f(u, ∂u/∂x) = D · ∂u/∂x - v · u
//! ```
//!
//! `f` is the flux law of the field and `s` the local source contributed by
//! the reaction coupling the fields at a node. With this sign convention the
//! dispersive part of `f` points up the gradient, so `∂f/∂x` is the familiar
//! `D ∂²u/∂x² - v ∂u/∂x`.
//!
//! # Sorption
//!
//! The linear-driving-force (LDF) model exchanges mass between a fluid
//! concentration `c` and a sorbed loading `q`:
//!
//! ```text
//! ∂q/∂t = K_F · (q*(c) - q)
//! ∂c/∂t = ... - ρ_b (1 - ε) / ε · ∂q/∂t
//! ```
//!
//! The sorbed field does not move, so its flux law is [`FluxLaw::Stagnant`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SorbError};
use crate::models::Isotherm;

// =================================================================================================
// Flux laws
// =================================================================================================

/// Face interpolation of the advected value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvectionScheme {
    /// Upstream node value (first order, monotone)
    #[default]
    Upwind,

    /// Average of both nodes (second order, oscillates when v·h/D > 2)
    Central,
}

impl AdvectionScheme {
    /// Advected value at the face between `left` and `right`
    #[inline]
    pub fn face_value(self, left: f64, right: f64, velocity: f64) -> f64 {
        match self {
            AdvectionScheme::Upwind => {
                if velocity >= 0.0 {
                    left
                } else {
                    right
                }
            }
            AdvectionScheme::Central => 0.5 * (left + right),
        }
    }
}

/// Spatial flux of one field
///
/// Physical use requires `dispersion ≥ 0` and `velocity ≥ 0`; the
/// configuration layer enforces it, the law itself accepts any finite values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FluxLaw {
    /// `f = D · ∂u/∂x - v · u`
    AdvectionDispersion { dispersion: f64, velocity: f64 },

    /// No spatial transport, `f = 0`
    Stagnant,
}

impl FluxLaw {
    pub fn advection_dispersion(dispersion: f64, velocity: f64) -> Self {
        Self::AdvectionDispersion { dispersion, velocity }
    }

    /// Flux for a local value and gradient
    #[inline]
    pub fn flux(&self, value: f64, gradient: f64) -> f64 {
        match *self {
            Self::AdvectionDispersion { dispersion, velocity } => dispersion * gradient - velocity * value,
            Self::Stagnant => 0.0,
        }
    }

    /// Flux through the face between two neighbouring nodes
    #[inline]
    pub fn face_flux(&self, left: f64, right: f64, spacing: f64, scheme: AdvectionScheme) -> f64 {
        match *self {
            Self::AdvectionDispersion { dispersion, velocity } => {
                let gradient = (right - left) / spacing;
                dispersion * gradient - velocity * scheme.face_value(left, right, velocity)
            }
            Self::Stagnant => 0.0,
        }
    }

    pub fn dispersion(&self) -> f64 {
        match *self {
            Self::AdvectionDispersion { dispersion, .. } => dispersion,
            Self::Stagnant => 0.0,
        }
    }

    pub fn velocity(&self) -> f64 {
        match *self {
            Self::AdvectionDispersion { velocity, .. } => velocity,
            Self::Stagnant => 0.0,
        }
    }

    /// Partial derivatives `(∂f/∂u, ∂f/∂g)`
    ///
    /// Both laws are linear, so these are constants.
    #[inline]
    pub fn sensitivity(&self) -> (f64, f64) {
        match *self {
            Self::AdvectionDispersion { dispersion, velocity } => (-velocity, dispersion),
            Self::Stagnant => (0.0, 0.0),
        }
    }
}

// =================================================================================================
// Reactions
// =================================================================================================

/// Phase ratio `ρ_b (1 - ε) / ε` converting sorbed loading to fluid concentration
pub fn phase_ratio(porosity: f64, density: f64) -> Result<f64> {
    if !(porosity > 0.0 && porosity < 1.0) {
        return Err(SorbError::invalid(format!(
            "porosity must be in ]0,1[, got {}",
            porosity
        )));
    }
    if !(density > 0.0 && density.is_finite()) {
        return Err(SorbError::invalid(format!(
            "bulk density must be positive, got {}",
            density
        )));
    }
    Ok(density * (1.0 - porosity) / porosity)
}

/// Linear-driving-force exchange between a fluid field and a sorbed field
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDrivingForce {
    /// Index of the fluid concentration field
    pub fluid: usize,
    /// Index of the sorbed loading field
    pub sorbed: usize,
    /// Mass-transfer rate K_F \[1/s\]
    pub rate: f64,
    /// Equilibrium isotherm q*(c)
    pub isotherm: Isotherm,
    /// Sorbed-to-fluid conversion factor
    pub phase_ratio: f64,
}

impl LinearDrivingForce {
    pub fn new(fluid: usize, sorbed: usize, rate: f64, isotherm: Isotherm, phase_ratio: f64) -> Result<Self> {
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(SorbError::invalid(format!(
                "mass-transfer rate must be positive, got {}",
                rate
            )));
        }
        if !(phase_ratio > 0.0 && phase_ratio.is_finite()) {
            return Err(SorbError::invalid(format!(
                "phase ratio must be positive, got {}",
                phase_ratio
            )));
        }
        isotherm.validate()?;

        Ok(Self {
            fluid,
            sorbed,
            rate,
            isotherm,
            phase_ratio,
        })
    }

    /// `∂q/∂t = K_F (q*(c) - q)`
    #[inline]
    pub fn uptake_rate(&self, concentration: f64, loading: f64) -> f64 {
        self.rate * (self.isotherm.loading_equilibrium(concentration) - loading)
    }
}

/// Local coupling between the fields at one node
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Reaction {
    /// No source terms
    #[default]
    None,

    /// Sorption exchange
    LinearDrivingForce(LinearDrivingForce),
}

impl Reaction {
    /// Source term of every field given the local values of every field
    #[inline]
    pub fn sources(&self, local: &[f64], out: &mut [f64]) {
        out.fill(0.0);

        if let Reaction::LinearDrivingForce(ldf) = self {
            let uptake = ldf.uptake_rate(local[ldf.fluid], local[ldf.sorbed]);
            out[ldf.sorbed] = uptake;
            out[ldf.fluid] = -ldf.phase_ratio * uptake;
        }
    }

    /// Checks field indices against a model with `fields` fields
    pub fn validate(&self, fields: usize) -> Result<()> {
        match self {
            Reaction::None => Ok(()),
            Reaction::LinearDrivingForce(ldf) => {
                if ldf.fluid >= fields || ldf.sorbed >= fields || ldf.fluid == ldf.sorbed {
                    return Err(SorbError::invalid(format!(
                        "sorption couples fields {} and {} of a {}-field model",
                        ldf.fluid, ldf.sorbed, fields
                    )));
                }
                Ok(())
            }
        }
    }
}
