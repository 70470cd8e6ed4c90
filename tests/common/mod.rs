//! Common utilities for integration tests

#![allow(dead_code)]

pub mod analytic;
pub mod mock_models;
pub mod test_helpers;

// Re-export commonly used items
pub use analytic::{erfc, ogata_banks};
pub use mock_models::{ExponentialDecay, StiffDecay};
pub use test_helpers::{column_scenario, max_abs_difference, relative_error, sorbing_scenario};
