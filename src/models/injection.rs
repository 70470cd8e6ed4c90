//! Inlet concentration profiles
//!
//! The value imposed by a Dirichlet boundary may follow a feed schedule
//! `C_in(t)`. It is read each time the boundary relation is encoded, so a
//! closed inlet takes effect on the next right-hand-side evaluation.
//!
//! ```rust
//! use sorb_rs::models::InletProfile;
//!
//! // feed at 100 for the first 500 time units, then clean fluid
//! let pulse = InletProfile::pulse(500.0, 100.0).unwrap();
//!
//! assert_eq!(pulse.value_at(0.0), 100.0);
//! assert_eq!(pulse.value_at(499.9), 100.0);
//! assert_eq!(pulse.value_at(500.0), 0.0);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SorbError};

/// Shared user schedule `t -> C_in(t)`
#[derive(Clone)]
pub struct FeedFn(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl fmt::Debug for FeedFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FeedFn(<closure>)")
    }
}

/// Feed schedule at the inlet
#[derive(Clone, Debug)]
pub enum InletProfile {
    /// Step feed held for the whole run
    Constant(f64),

    /// `level` on `[from, until)`, zero elsewhere
    Window { from: f64, until: f64, level: f64 },

    /// `level · exp(-(t - peak_time)² / 2 spread²)`
    Gaussian { peak_time: f64, spread: f64, level: f64 },

    Custom(FeedFn),
}

impl InletProfile {
    pub fn constant(level: f64) -> Self {
        Self::Constant(level)
    }

    /// Feed between `from` (included) and `until` (excluded)
    pub fn window(from: f64, until: f64, level: f64) -> Result<Self> {
        if !(from.is_finite() && until > from) {
            return Err(SorbError::invalid(format!(
                "feed window [{}, {}) is empty",
                from, until
            )));
        }
        Ok(Self::Window { from, until, level })
    }

    /// Feed from `t = 0` for `duration`
    pub fn pulse(duration: f64, level: f64) -> Result<Self> {
        Self::window(0.0, duration, level)
    }

    pub fn gaussian(peak_time: f64, spread: f64, level: f64) -> Result<Self> {
        if !(spread > 0.0 && spread.is_finite()) {
            return Err(SorbError::invalid(format!(
                "gaussian feed needs a positive spread, got {}",
                spread
            )));
        }
        Ok(Self::Gaussian { peak_time, spread, level })
    }

    pub fn custom<F>(schedule: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(FeedFn(Arc::new(schedule)))
    }

    /// Inlet value at time `t`
    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            Self::Constant(level) => *level,
            Self::Window { from, until, level } => {
                if (*from..*until).contains(&t) {
                    *level
                } else {
                    0.0
                }
            }
            Self::Gaussian { peak_time, spread, level } => {
                let z = (t - peak_time) / spread;
                level * (-0.5 * z * z).exp()
            }
            Self::Custom(FeedFn(schedule)) => schedule(t),
        }
    }

    /// Largest value the schedule is known to reach; `None` for closures
    pub fn peak(&self) -> Option<f64> {
        match self {
            Self::Constant(level) => Some(*level),
            Self::Window { level, .. } | Self::Gaussian { level, .. } => Some(level.max(0.0)),
            Self::Custom(_) => None,
        }
    }
}
