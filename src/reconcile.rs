// src/reconcile.rs
//! Upsert-then-prune reconciliation.
//!
//! Items are written page by page while the run accumulates the set of keys it
//! has seen. Only once every query has been attempted are stored keys outside
//! that set deleted. A store failure aborts the run before the prune step.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, gauge};

use crate::error::SyncError;
use crate::ingest::ensure_metrics_described;
use crate::ingest::fetcher::PagedFetcher;
use crate::ingest::providers::AdapterSet;
use crate::ingest::types::{Item, Query};
use crate::store::ItemStore;

/// Per-query outcome. A query with any recorded failure counts as failed,
/// even if some of its sizes produced items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    pub source: String,
    pub category: String,
    pub items: usize,
    pub malformed: usize,
    pub failures: Vec<String>,
}

impl QueryReport {
    fn new(q: &Query) -> Self {
        Self {
            source: q.source.clone(),
            category: q.category.clone(),
            items: 0,
            malformed: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items upserted this run (a listing seen twice counts twice).
    pub fetched_count: usize,
    /// Distinct keys seen this run.
    pub active_count: usize,
    pub stale_removed_count: usize,
    pub queries: Vec<QueryReport>,
}

impl RunSummary {
    pub fn failed_queries(&self) -> impl Iterator<Item = &QueryReport> {
        self.queries.iter().filter(|q| q.is_failed())
    }
}

pub struct Reconciler {
    adapters: AdapterSet,
    store: Arc<dyn ItemStore>,
    fetcher: PagedFetcher,
    preview: usize,
}

impl Reconciler {
    pub fn new(adapters: AdapterSet, store: Arc<dyn ItemStore>, fetcher: PagedFetcher) -> Self {
        Self {
            adapters,
            store,
            fetcher,
            preview: 0,
        }
    }

    /// Log the first `n` items of every query at info level.
    pub fn with_preview(mut self, n: usize) -> Self {
        self.preview = n;
        self
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    pub async fn run(&self, queries: &[Query]) -> Result<RunSummary, SyncError> {
        ensure_metrics_described();

        let mut active_keys: HashSet<String> = HashSet::new();
        let mut summary = RunSummary::default();

        for q in queries {
            let report = self.run_query(q, &mut active_keys).await?;
            summary.fetched_count += report.items;
            summary.queries.push(report);
        }

        let stored = self.store.all_keys()?;
        let stale: HashSet<String> = stored.difference(&active_keys).cloned().collect();
        if stale.is_empty() {
            tracing::info!(target: "sync", "no stale items to remove");
        } else {
            tracing::info!(target: "sync", stale = stale.len(), "removing stale items");
        }
        summary.stale_removed_count = self.store.delete_many(&stale)?;
        summary.active_count = active_keys.len();

        counter!("sync_stale_removed_total").increment(summary.stale_removed_count as u64);
        counter!("sync_runs_total").increment(1);
        gauge!("sync_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(summary)
    }

    async fn run_query(
        &self,
        q: &Query,
        active_keys: &mut HashSet<String>,
    ) -> Result<QueryReport, SyncError> {
        let mut report = QueryReport::new(q);

        let Some(adapter) = self.adapters.get(&q.source) else {
            tracing::warn!(target: "sync", source = %q.source, category = %q.category, "unknown source, query skipped");
            counter!("sync_queries_skipped_total").increment(1);
            report
                .failures
                .push(format!("unknown source '{}'", q.source));
            return Ok(report);
        };

        tracing::info!(target: "sync", source = %q.source, category = %q.category, sizes = ?q.sizes, "query started");

        let store = &self.store;
        let preview = self.preview;
        let mut previewed = 0usize;
        let result = self
            .fetcher
            .fetch_each(adapter.as_ref(), &q.category, &q.sizes, |items: &[Item]| {
                let written = store.upsert_many(items)?;
                counter!("sync_items_upserted_total").increment(written as u64);
                for it in items {
                    active_keys.insert(it.unique_key.clone());
                    if previewed < preview {
                        previewed += 1;
                        tracing::info!(target: "sync", key = %it.unique_key, name = %it.name, price = ?it.price, url = %it.url, "preview item");
                    }
                }
                Ok(())
            })
            .await;

        match result {
            Ok(fetch) => {
                report.items = fetch.items;
                report.malformed = fetch.malformed;
                report.failures = fetch.failures.iter().map(ToString::to_string).collect();
            }
            Err(e) if !e.is_fatal() => {
                tracing::warn!(target: "sync", source = %q.source, category = %q.category, error = %e, "query skipped");
                counter!("sync_queries_skipped_total").increment(1);
                report.failures.push(e.to_string());
            }
            Err(e) => {
                tracing::error!(target: "sync", source = %q.source, category = %q.category, error = %e, "store failure, aborting run");
                return Err(e);
            }
        }

        tracing::info!(
            target: "sync",
            source = %q.source,
            category = %q.category,
            items = report.items,
            malformed = report.malformed,
            failures = report.failures.len(),
            "query finished"
        );
        Ok(report)
    }
}
