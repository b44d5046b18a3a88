//! Parsing and validation of `weft.toml` run configuration files.
//!
//! This crate reads the run configuration and produces a strongly-typed
//! [`RunConfig`]: the device and package, the seed, annealing and routing
//! tuning, and the pin map. Every table is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
