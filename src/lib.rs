// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod relay;

// Feed side, sink side, seen-set
pub mod ingest;
pub mod notify;
pub mod store;

// Chat reply path
pub mod chat;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::error::RelayError;
pub use crate::relay::{CycleReport, Relay, RelaySettings};
