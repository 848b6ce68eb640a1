// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;

use crate::ingest::config::ScheduleCfg;
use crate::orchestrator::Orchestrator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at this local wall-clock time.
    DailyAt(NaiveTime),
    Every(Duration),
}

impl Schedule {
    pub fn from_cfg(cfg: &ScheduleCfg) -> Result<Self> {
        if let Some(secs) = cfg.interval_secs {
            if secs == 0 {
                return Err(anyhow!("schedule.interval_secs must be > 0"));
            }
            return Ok(Self::Every(Duration::from_secs(secs)));
        }
        let at = cfg.daily_at.as_deref().unwrap_or("00:00");
        let t = NaiveTime::parse_from_str(at, "%H:%M")
            .with_context(|| format!("schedule.daily_at `{at}` is not HH:MM"))?;
        Ok(Self::DailyAt(t))
    }

    /// Time to sleep from `now` (local wall clock) until the next fire.
    /// DST shifts are ignored; a daily run may drift by an hour on those days.
    pub fn next_delay(&self, now: NaiveDateTime) -> Duration {
        match *self {
            Self::Every(d) => d,
            Self::DailyAt(t) => {
                let mut target = now.date().and_time(t);
                if target <= now {
                    target += chrono::Duration::days(1);
                }
                (target - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Spawn the periodic trigger. Each tick calls the same `Orchestrator::run`
/// a manual invocation would; failures are logged and the loop keeps going.
pub fn spawn_scheduler(
    orchestrator: Arc<Orchestrator>,
    schedule: Schedule,
    run_on_start: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if run_on_start {
            run_tick(&orchestrator).await;
        }
        loop {
            let now = chrono::Local::now().naive_local();
            let delay = schedule.next_delay(now);
            tracing::info!(target: "sync", next_in_secs = delay.as_secs(), "next sync scheduled");
            tokio::time::sleep(delay).await;
            run_tick(&orchestrator).await;
        }
    })
}

async fn run_tick(orchestrator: &Orchestrator) {
    match orchestrator.run().await {
        Ok(summary) => {
            tracing::info!(
                target: "sync",
                fetched = summary.fetched_count,
                stale_removed = summary.stale_removed_count,
                "scheduled sync tick"
            );
        }
        Err(e) => {
            tracing::warn!(target: "sync", error = %e, "scheduled sync tick failed");
        }
    }
}
