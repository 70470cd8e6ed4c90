//! Equilibrium isotherms
//!
//! An isotherm maps a fluid concentration `c` to the sorbed loading `q*` the
//! solid would hold at equilibrium with it.
//!
//! # Mathematical Background
//!
//! ```text
//! Langmuir:  q*(c) = q_max · K_L · c / (1 + K_L · c)
//! Linear:    q*(c) = K_d · c
//! ```
//!
//! The Langmuir form is monotone non-decreasing for `c ≥ 0`, vanishes at
//! `c = 0` and saturates at `q_max`. Integrators may undershoot slightly below
//! zero near steep fronts, so negative concentrations are evaluated as zero;
//! this also keeps the Langmuir denominator away from its pole at
//! `K_L · c = -1`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SorbError};

/// Equilibrium relationship between fluid concentration and sorbed loading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Isotherm {
    /// Single-site Langmuir isotherm
    Langmuir {
        /// Maximum loading q_max
        capacity: f64,
        /// Affinity constant K_L
        affinity: f64,
    },

    /// Henry (linear) isotherm
    Linear {
        /// Distribution coefficient K_d
        partition: f64,
    },
}

impl Isotherm {
    /// Validated Langmuir isotherm
    ///
    /// # Example
    ///
    /// ```rust
    /// use sorb_rs::models::Isotherm;
    ///
    /// let isotherm = Isotherm::langmuir(1.5e-5, 1e3).unwrap();
    /// assert_eq!(isotherm.loading_equilibrium(0.0), 0.0);
    /// assert!(Isotherm::langmuir(-1.0, 1e3).is_err());
    /// ```
    pub fn langmuir(capacity: f64, affinity: f64) -> Result<Self> {
        let isotherm = Self::Langmuir { capacity, affinity };
        isotherm.validate()?;
        Ok(isotherm)
    }

    /// Validated linear isotherm
    pub fn linear(partition: f64) -> Result<Self> {
        let isotherm = Self::Linear { partition };
        isotherm.validate()?;
        Ok(isotherm)
    }

    /// Checks the parameters are finite and positive
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SorbError::invalid(format!(
                    "isotherm {} must be positive and finite, got {}",
                    name, value
                )))
            }
        };

        match *self {
            Self::Langmuir { capacity, affinity } => {
                positive("capacity", capacity)?;
                positive("affinity", affinity)
            }
            Self::Linear { partition } => positive("partition coefficient", partition),
        }
    }

    /// Loading in equilibrium with concentration `c`
    ///
    /// Negative concentrations are treated as zero. NaN propagates.
    #[inline]
    pub fn loading_equilibrium(&self, c: f64) -> f64 {
        let c = if c < 0.0 { 0.0 } else { c };

        match *self {
            Self::Langmuir { capacity, affinity } => {
                capacity * affinity * c / (1.0 + affinity * c)
            }
            Self::Linear { partition } => partition * c,
        }
    }

    /// Slope `dq*/dc` at concentration `c`
    #[inline]
    pub fn slope(&self, c: f64) -> f64 {
        let c = if c < 0.0 { 0.0 } else { c };

        match *self {
            Self::Langmuir { capacity, affinity } => {
                let denominator = 1.0 + affinity * c;
                capacity * affinity / (denominator * denominator)
            }
            Self::Linear { partition } => partition,
        }
    }
}
