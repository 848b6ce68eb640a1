// src/orchestrator.rs
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::SyncError;
use crate::ingest::config::SyncConfig;
use crate::ingest::fetcher::PagedFetcher;
use crate::ingest::pacing::{FixedDelay, Pacer};
use crate::ingest::providers::{build_adapters, AdapterSet};
use crate::ingest::types::Query;
use crate::reconcile::{Reconciler, RunSummary};
use crate::store::ItemStore;

/// Runs the configured query list through the reconciler, one run at a time.
/// Manual and scheduled triggers share the same instance.
pub struct Orchestrator {
    reconciler: Reconciler,
    queries: Vec<Query>,
    running: Mutex<()>,
}

impl Orchestrator {
    pub fn new(reconciler: Reconciler, queries: Vec<Query>) -> Self {
        Self {
            reconciler,
            queries,
            running: Mutex::new(()),
        }
    }

    /// Wire the real adapters and pacing from config against `store`.
    pub fn from_config(cfg: &SyncConfig, store: Arc<dyn ItemStore>) -> anyhow::Result<Self> {
        let adapters: AdapterSet = build_adapters(cfg)?;
        let pacer: Arc<dyn Pacer> = Arc::new(FixedDelay::from_millis(cfg.pacing.delay_ms));
        let reconciler = Reconciler::new(adapters, store, PagedFetcher::new(pacer));
        Ok(Self::new(reconciler, cfg.queries.clone()))
    }

    pub fn with_preview(mut self, n: usize) -> Self {
        self.reconciler = self.reconciler.with_preview(n);
        self
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// One full sweep. Refuses to start while another sweep is in flight, so
    /// the stale set is never computed from a half-accumulated active set.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let _guard = self.running.try_lock().map_err(|_| {
            tracing::warn!(target: "sync", "run requested while another is in progress");
            SyncError::RunInProgress
        })?;

        let started = std::time::Instant::now();
        tracing::info!(target: "sync", queries = self.queries.len(), "sync run started");
        let summary = self.reconciler.run(&self.queries).await?;
        let failed = summary.failed_queries().count();
        tracing::info!(
            target: "sync",
            fetched = summary.fetched_count,
            active = summary.active_count,
            stale_removed = summary.stale_removed_count,
            failed_queries = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync run completed"
        );
        for q in summary.failed_queries() {
            tracing::warn!(target: "sync", source = %q.source, category = %q.category, failures = ?q.failures, "query incomplete");
        }
        Ok(summary)
    }
}
