// tests/metrics_sync.rs
mod common;

use catalog_sync::ingest::types::Query;
use catalog_sync::Reconciler;
use common::*;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::test]
async fn metrics_exposed_after_run() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let stub = StubAdapter::new("stub").with_pages(
        "2XL",
        vec![
            Step::Records(vec![rec("a", 1.0), rec_without_price("b")]),
            Step::Fail,
        ],
    );
    let r = Reconciler::new(
        adapter_set(vec![shared(stub)]),
        memory_store(),
        no_pause_fetcher(),
    );
    r.run(&[Query::new("stub", "Jumpers", &["2XL"])])
        .await
        .unwrap();

    let out = handle.render();
    for series in [
        "sync_pages_total",
        "sync_items_upserted_total",
        "sync_records_malformed_total",
        "sync_page_errors_total",
        "sync_runs_total",
        "sync_last_run_ts",
    ] {
        assert!(out.contains(series), "missing {series} in:\n{out}");
    }
}
