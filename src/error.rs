// src/error.rs
use thiserror::Error;

/// Failures of the persistence layer. Always fatal to a run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Everything a sync run can fail with, from one record up to the whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{provider}: no mapping for category '{category}'")]
    UnknownCategory { provider: String, category: String },
    #[error("{provider}: no mapping for size '{size}'")]
    UnknownSize { provider: String, size: String },
    #[error("{provider}: malformed record: {reason}")]
    MalformedRecord { provider: String, reason: String },
    #[error("{provider}: transport failure: {detail}")]
    Transport { provider: String, detail: String },
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("a sync run is already in progress")]
    RunInProgress,
}

impl SyncError {
    pub fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    pub fn transport(provider: &str, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Fatal errors abort the run before stale deletion; everything else is
    /// recovered at record, page or query granularity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::RunInProgress)
    }
}
