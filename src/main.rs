//! catalog-sync — binary entrypoint.
//! Loads config, opens the item store and runs a sync either once or on a schedule.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog_sync::ingest::config::{load_config_default, load_config_from, SyncConfig};
use catalog_sync::ingest::scheduler::{spawn_scheduler, Schedule};
use catalog_sync::{ItemStore, Orchestrator, SqliteStore};

/// Items shown per query (and from the store) in test mode.
const TEST_MODE_PREVIEW: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "catalog-sync", about = "Clothing database updater")]
struct Cli {
    /// Run the scheduler for automatic updates.
    #[arg(long, conflicts_with = "manual")]
    schedule: bool,
    /// Trigger a single update and exit.
    #[arg(long)]
    manual: bool,
    /// Use an in-memory database instead of the configured file.
    #[arg(long)]
    test_mode: bool,
    /// Config file (TOML or JSON). Defaults to $CATALOG_SYNC_CONFIG, then config/sync.{toml,json}.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Expose Prometheus metrics on this address (scheduled mode).
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_sync=info,sync=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn open_store(cfg: &SyncConfig, test_mode: bool) -> Result<Arc<SqliteStore>> {
    let store = if test_mode {
        tracing::info!(target: "sync", "test mode: using in-memory store");
        SqliteStore::in_memory()
    } else {
        SqliteStore::open(&cfg.store.path)
    }
    .context("opening item store")?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    if !cli.schedule && !cli.manual {
        eprintln!("Please specify --schedule or --manual. Use -h for help.");
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(target: "sync", error = %format!("{e:#}"), "catalog-sync failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(p) => load_config_from(p)?,
        None => load_config_default()?,
    };

    let store = open_store(&cfg, cli.test_mode)?;
    let dyn_store: Arc<dyn ItemStore> = store.clone();
    let mut orchestrator = Orchestrator::from_config(&cfg, dyn_store)?;
    if cli.test_mode {
        orchestrator = orchestrator.with_preview(TEST_MODE_PREVIEW);
    }
    let orchestrator = Arc::new(orchestrator);

    if cli.manual {
        let summary = orchestrator.run().await.context("manual sync run")?;
        tracing::info!(
            target: "sync",
            fetched = summary.fetched_count,
            stale_removed = summary.stale_removed_count,
            failed_queries = summary.failed_queries().count(),
            "manual update completed"
        );
        if cli.test_mode {
            for it in store.sample(TEST_MODE_PREVIEW * 2)? {
                tracing::info!(target: "sync", key = %it.unique_key, name = %it.name, price = ?it.price, "sample row");
            }
        }
        return Ok(());
    }

    if let Some(addr) = cli.metrics_addr {
        catalog_sync::metrics::install_exporter(addr)?;
    }
    let schedule = Schedule::from_cfg(&cfg.schedule)?;
    tracing::info!(target: "sync", ?schedule, "running scheduler for automatic updates");
    let handle = spawn_scheduler(orchestrator, schedule, cfg.schedule.run_on_start);

    tokio::select! {
        res = handle => {
            res.context("scheduler task ended")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "sync", "shutdown requested");
        }
    }
    Ok(())
}
