//! Port interfaces (traits).
//!
//! Adapter crates implement these and `regionmetrics-app` wires them together
//! as `Arc<dyn T>`. Async traits use `async_trait` for object safety.

pub mod fetcher;
pub mod listener;
pub mod statistics;
