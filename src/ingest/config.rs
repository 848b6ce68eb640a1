// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::{CatalogMapping, Query};

pub const ENV_PATH: &str = "CATALOG_SYNC_CONFIG";
const DEFAULT_TOML: &str = "config/sync.toml";
const DEFAULT_JSON: &str = "config/sync.json";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub store: StoreCfg,
    #[serde(default)]
    pub pacing: PacingCfg,
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub schedule: ScheduleCfg,
    #[serde(default = "default_queries")]
    pub queries: Vec<Query>,
    /// Per-source endpoint and mapping overrides, keyed by source name.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceCfg>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store: StoreCfg::default(),
            pacing: PacingCfg::default(),
            http: HttpCfg::default(),
            schedule: ScheduleCfg::default(),
            queries: default_queries(),
            sources: BTreeMap::new(),
        }
    }
}

fn default_queries() -> Vec<Query> {
    vec![Query::new("asos", "Jumpers", &["3XL"])]
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreCfg {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("clothing.db")
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PacingCfg {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for PacingCfg {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpCfg {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleCfg {
    /// Local wall-clock time, "HH:MM".
    #[serde(default)]
    pub daily_at: Option<String>,
    /// Fixed interval; wins over `daily_at` when both are set.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub run_on_start: bool,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            daily_at: Some("00:00".to_string()),
            interval_secs: None,
            run_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceCfg {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(flatten)]
    pub mapping: CatalogMapping,
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<SyncConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sync config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing sync config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $CATALOG_SYNC_CONFIG
/// 2) config/sync.toml
/// 3) config/sync.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<SyncConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_TOML);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON);
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    tracing::info!(target: "sync", "no config file found, using built-in defaults");
    Ok(SyncConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<SyncConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str::<SyncConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) if hint_ext != "toml" => {
            serde_json::from_str(s).map_err(|_| anyhow!(toml_err))
        }
        Err(e) => Err(e.into()),
    }
}
