//! # regionmetrics-core
//!
//! Domain models, port traits and error types shared by every regionmetrics crate.
//!
//! ## Layout
//!
//! - [`models`]: region records, the metric catalog, readings, statistic points
//! - [`ports`]: hexagonal ports implemented by adapter crates (async_trait)
//! - [`projection`]: record → reading projection over the catalog
//! - [`error`]: core error type (thiserror)
//! - [`config`]: application configuration structs
//! - [`config_manager`]: config file load/save

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
pub mod projection;
