// src/ingest/fetcher.rs
//! Drives one adapter through every page of a (category, sizes) query.
//!
//! Pages are requested strictly in order since each token comes from the
//! previous response. A token that does not move forward ends the size. A
//! transport failure ends the current size only; items already handed to the
//! page sink stay handed over.

use std::sync::Arc;

use metrics::counter;

use crate::error::{StoreError, SyncError};
use crate::ingest::pacing::Pacer;
use crate::ingest::types::{Item, Page, SourceAdapter};

/// What a single `fetch_each` call did.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub pages: usize,
    pub items: usize,
    pub malformed: usize,
    /// Recovered per-size failures (unknown size, transport).
    pub failures: Vec<SyncError>,
}

pub struct PagedFetcher {
    pacer: Arc<dyn Pacer>,
}

impl PagedFetcher {
    pub fn new(pacer: Arc<dyn Pacer>) -> Self {
        Self { pacer }
    }

    /// Fetch everything and hand each normalized page to `on_page` as soon as
    /// it arrives. Only an unknown category (whole query unusable) or a sink
    /// failure is returned as `Err`.
    pub async fn fetch_each<F>(
        &self,
        adapter: &dyn SourceAdapter,
        category_name: &str,
        size_labels: &[String],
        mut on_page: F,
    ) -> Result<FetchReport, SyncError>
    where
        F: FnMut(&[Item]) -> Result<(), StoreError> + Send,
    {
        let source = adapter.name();
        let category_code = adapter.category_code(category_name)?.to_string();
        let mut report = FetchReport::default();
        let mut first_request = true;

        for size in size_labels {
            let size_code = match adapter.size_code(size) {
                Ok(code) => code.to_string(),
                Err(e) => {
                    tracing::warn!(target: "sync", source, category = category_name, size = %size, error = %e, "size skipped");
                    report.failures.push(e);
                    continue;
                }
            };

            let mut token = adapter.initial_token();
            loop {
                if !first_request {
                    self.pacer.pause().await;
                }
                first_request = false;

                tracing::debug!(target: "sync", source, category = category_name, size = %size, page = %token, "fetching page");
                let Page { records, next } =
                    match adapter.fetch_page(&category_code, &size_code, &token).await {
                        Ok(page) => page,
                        Err(e) => {
                            tracing::warn!(target: "sync", source, category = category_name, size = %size, page = %token, error = %e, "page fetch failed, abandoning size");
                            counter!("sync_page_errors_total", "source" => source).increment(1);
                            report.failures.push(e);
                            break;
                        }
                    };

                if records.is_empty() {
                    tracing::debug!(target: "sync", source, size = %size, "empty page, size exhausted");
                    break;
                }
                report.pages += 1;
                counter!("sync_pages_total", "source" => source).increment(1);

                let items = normalize_page(adapter, &records, size, category_name, &mut report);
                on_page(&items)?;
                report.items += items.len();
                tracing::info!(target: "sync", source, category = category_name, size = %size, page = %token, items = items.len(), "page stored");

                match next {
                    Some(t) if t == token => {
                        tracing::warn!(target: "sync", source, size = %size, page = %token, "next page token did not advance, size ended");
                        break;
                    }
                    Some(t) => token = t,
                    None => break,
                }
            }
        }

        Ok(report)
    }

    /// Same as `fetch_each` but collects all items in memory.
    pub async fn fetch_all(
        &self,
        adapter: &dyn SourceAdapter,
        category_name: &str,
        size_labels: &[String],
    ) -> Result<(Vec<Item>, FetchReport), SyncError> {
        let mut all = Vec::new();
        let report = self
            .fetch_each(adapter, category_name, size_labels, |items| {
                all.extend_from_slice(items);
                Ok(())
            })
            .await?;
        Ok((all, report))
    }
}

fn normalize_page(
    adapter: &dyn SourceAdapter,
    records: &[serde_json::Value],
    size: &str,
    category_name: &str,
    report: &mut FetchReport,
) -> Vec<Item> {
    let mut out = Vec::with_capacity(records.len());
    for raw in records {
        match adapter.normalize(raw, size, category_name) {
            Ok(item) => out.push(item),
            Err(e) => {
                tracing::warn!(target: "sync", source = adapter.name(), size, error = %e, "record dropped");
                counter!("sync_records_malformed_total", "source" => adapter.name()).increment(1);
                report.malformed += 1;
            }
        }
    }
    out
}
