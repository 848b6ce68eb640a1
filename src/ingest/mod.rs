// src/ingest/mod.rs
pub mod config;
pub mod fetcher;
pub mod pacing;
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_pages_total", "Non-empty catalog pages fetched.");
        describe_counter!(
            "sync_items_upserted_total",
            "Items written to the store (insert or overwrite)."
        );
        describe_counter!(
            "sync_records_malformed_total",
            "Raw records dropped because required fields were missing."
        );
        describe_counter!(
            "sync_page_errors_total",
            "Page requests that failed at the transport level."
        );
        describe_counter!(
            "sync_queries_skipped_total",
            "Queries skipped because of unknown source or category."
        );
        describe_counter!(
            "sync_stale_removed_total",
            "Stored items deleted because the last run did not see them."
        );
        describe_counter!("sync_runs_total", "Completed reconciliation runs.");
        describe_gauge!("sync_last_run_ts", "Unix ts when the last run completed.");
    });
}

/// Normalize a display string: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    out
}
