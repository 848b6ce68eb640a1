// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod error;
pub mod ingest;
pub mod metrics;
pub mod orchestrator;
pub mod reconcile;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::error::{StoreError, SyncError};
pub use crate::ingest::types::{Item, Page, PageToken, Query, SourceAdapter};
pub use crate::orchestrator::Orchestrator;
pub use crate::reconcile::{QueryReport, Reconciler, RunSummary};
pub use crate::store::{ItemStore, SqliteStore};
