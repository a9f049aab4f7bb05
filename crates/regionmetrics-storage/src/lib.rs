//! # regionmetrics-storage
//!
//! Local storage adapter.
//! SQLite-backed long-term statistics store with versioned schema migrations.
//!
//! ## Modules
//! - `sqlite`: statistics store (`StatisticsStore` implementation)
//! - `migration`: schema migrations

pub mod migration;
pub mod sqlite;
