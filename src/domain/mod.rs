//! Core domain types and logic.

pub mod error;
pub mod series;
pub mod alignment;
pub mod discretizer;
pub mod entropy;
pub mod horizon;
pub mod signal;
pub mod backtest;
pub mod metrics;
pub mod analysis;
pub mod config_validation;
