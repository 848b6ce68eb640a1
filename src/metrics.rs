use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own `/metrics` listener on `addr`.
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    crate::ingest::ensure_metrics_described();
    tracing::info!(target: "sync", %addr, "metrics exporter listening");
    Ok(())
}
