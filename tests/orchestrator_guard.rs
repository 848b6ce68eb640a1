// tests/orchestrator_guard.rs
mod common;

use std::sync::Arc;

use async_trait::async_trait;
use catalog_sync::error::SyncError;
use catalog_sync::ingest::types::{
    CatalogMapping, Item, Page, PageToken, Query, RawRecord, SourceAdapter,
};
use catalog_sync::{Orchestrator, Reconciler};
use common::*;
use tokio::sync::Notify;

/// Blocks inside the first page request until released.
struct GateAdapter {
    inner: StubAdapter,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl SourceAdapter for GateAdapter {
    fn name(&self) -> &'static str {
        self.inner.name()
    }
    fn mapping(&self) -> &CatalogMapping {
        self.inner.mapping()
    }
    fn initial_token(&self) -> PageToken {
        self.inner.initial_token()
    }
    async fn fetch_page(
        &self,
        category_code: &str,
        size_code: &str,
        token: &PageToken,
    ) -> Result<Page, SyncError> {
        if *token == PageToken::Number(1) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.fetch_page(category_code, size_code, token).await
    }
    fn normalize(&self, raw: &RawRecord, size: &str, category: &str) -> Result<Item, SyncError> {
        self.inner.normalize(raw, size, category)
    }
}

#[tokio::test]
async fn overlapping_trigger_is_refused_until_the_run_finishes() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gate: Arc<dyn SourceAdapter> = Arc::new(GateAdapter {
        inner: StubAdapter::new("stub").with_pages("2XL", vec![records(&["a"])]),
        entered: entered.clone(),
        release: release.clone(),
    });
    let store = memory_store();
    let reconciler = Reconciler::new(adapter_set(vec![gate]), store.clone(), no_pause_fetcher());
    let orch = Arc::new(Orchestrator::new(
        reconciler,
        vec![Query::new("stub", "Jumpers", &["2XL"])],
    ));

    let first = tokio::spawn({
        let orch = orch.clone();
        async move { orch.run().await }
    });
    entered.notified().await;

    let overlap = orch.run().await;
    assert!(matches!(overlap, Err(SyncError::RunInProgress)));

    release.notify_one();
    let summary = first.await.unwrap().unwrap();
    assert_eq!(summary.fetched_count, 1);

    // The guard is released once the first run is done. The gate only
    // blocks on page 1, so let the next run through right away.
    release.notify_one();
    let again = orch.run().await.unwrap();
    assert_eq!(again.stale_removed_count, 0);
}
