//! Domain models.
//!
//! Pure data structures with serde derives where they cross a boundary.

pub mod catalog;
pub mod reading;
pub mod region;
pub mod statistic;
