//! # regionmetrics-coordinator
//!
//! Refresh pipeline on top of the core ports:
//!
//! - [`coordinator`]: cached record, fixed-interval refresh, listener fan-out
//! - [`sensor`]: the nine reading entities of an entry
//! - [`appender`]: long-term statistics recording
//! - [`setup`]: operator setup validation
//! - [`registry`]: running entries keyed by entry id

pub mod appender;
pub mod coordinator;
pub mod registry;
pub mod sensor;
pub mod setup;

#[cfg(test)]
pub(crate) mod testing;
