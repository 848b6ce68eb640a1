// src/ingest/pacing.rs
use std::time::Duration;

/// Courtesy delay between consecutive page requests to the same catalog.
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps a fixed amount between requests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

#[async_trait::async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// No delay at all. For tests and fixture runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

#[async_trait::async_trait]
impl Pacer for NoPause {
    async fn pause(&self) {}
}
