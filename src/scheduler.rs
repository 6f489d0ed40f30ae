// src/scheduler.rs
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::orchestrator::ScoringOrchestrator;

pub const ENV_SCORING_INTERVAL_SECS: &str = "SCORING_INTERVAL_SECS";
/// Matches the 2-hour ingestion cycle.
pub const DEFAULT_SCORING_INTERVAL_SECS: u64 = 2 * 3600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SCORING_INTERVAL_SECS,
        }
    }
}

impl SchedulerCfg {
    pub fn from_env() -> Self {
        Self::from_raw(std::env::var(ENV_SCORING_INTERVAL_SECS).ok())
    }

    fn from_raw(raw: Option<String>) -> Self {
        let interval_secs = raw
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SCORING_INTERVAL_SECS);
        Self { interval_secs }
    }
}

/// Spawn a periodic scorer. Each tick runs one cycle sized by the current
/// taxonomy's `max_items_per_cycle`; failures are logged and the loop keeps going.
pub fn spawn_scoring_scheduler(cfg: SchedulerCfg, orchestrator: ScoringOrchestrator) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
        loop {
            ticker.tick().await;
            match orchestrator.run_cycle().await {
                Ok(report) => tracing::info!(
                    target: "scheduler",
                    scored = report.scored,
                    passed = report.passed,
                    failed = report.failed,
                    "scoring tick"
                ),
                Err(e) => tracing::warn!(target: "scheduler", error = %e, "scoring tick failed"),
            }
        }
    })
}
