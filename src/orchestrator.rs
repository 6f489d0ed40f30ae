// src/orchestrator.rs
//! Batch driver: pull unprocessed items, score each independently, commit one
//! result per item.
//!
//! Failure policy:
//! - per-item faults (a panic while scoring, a rejected write) are logged and
//!   the batch moves on;
//! - an item that keeps failing is given up on after `max_attempts` runs, so
//!   it cannot hold a slot at the head of every later batch;
//! - a lost store (`StoreError::is_fatal`) aborts the batch and propagates;
//! - a `Duplicate` on commit means another run already scored the item, so it
//!   is marked processed and not counted.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Result, StoreError};
use crate::metrics::{
    ensure_metrics_described, BATCH_FATAL, BATCH_MS, ITEMS_PASSED, ITEMS_SCORED, ITEM_FAILURES,
    LAST_RUN_TS,
};
use crate::model::{RawItem, ScoredResult};
use crate::score::ScoringEngine;
use crate::store::TrendStore;
use crate::taxonomy::{TaxonomyConfig, TaxonomyHandle};

/// Failed runs after which a retried item is marked processed without a result.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What happens to an item whose scoring or commit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave it unprocessed so the next run picks it up again, up to
    /// `max_attempts` failures.
    #[default]
    Retry,
    /// Mark it processed without a result on the first failure.
    Drop,
}

/// Per-run summary. `scored` is what `run` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub selected: usize,
    pub scored: usize,
    pub passed: usize,
    pub failed: usize,
    /// Failed items that will not be offered again.
    pub abandoned: usize,
    pub duplicates: usize,
}

/// Produces the scored record for one item.
pub trait ItemScorer {
    fn score_item(&self, item: &RawItem, now: DateTime<Utc>) -> ScoredResult;
}

impl ItemScorer for ScoringEngine {
    fn score_item(&self, item: &RawItem, now: DateTime<Utc>) -> ScoredResult {
        self.score_result(item, now)
    }
}

#[derive(Clone)]
pub struct ScoringOrchestrator {
    store: Arc<dyn TrendStore>,
    taxonomy: TaxonomyHandle,
    policy: FailurePolicy,
    max_attempts: u32,
}

impl ScoringOrchestrator {
    pub fn new(store: Arc<dyn TrendStore>, taxonomy: TaxonomyHandle) -> Self {
        Self {
            store,
            taxonomy,
            policy: FailurePolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clamped to at least 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn taxonomy(&self) -> &TaxonomyHandle {
        &self.taxonomy
    }

    /// Score up to `batch_size` unprocessed items. Returns how many produced a result.
    pub async fn run(&self, batch_size: usize) -> Result<usize> {
        Ok(self.run_at(batch_size, Utc::now()).await?.scored)
    }

    /// One cycle using the configured `max_items_per_cycle`.
    pub async fn run_cycle(&self) -> Result<RunReport> {
        let batch = self.taxonomy.snapshot().max_items_per_cycle();
        self.run_at(batch, Utc::now()).await
    }

    /// Same as `run`, with an explicit clock and the full report.
    pub async fn run_at(&self, batch_size: usize, now: DateTime<Utc>) -> Result<RunReport> {
        // Re-read the taxonomy every run so config edits apply without restart.
        let cfg = self.taxonomy.snapshot();
        let engine = compile(&cfg)?;
        debug!(target: "scoring", threshold = engine.threshold(), "taxonomy compiled");
        self.run_with(&engine, batch_size, now).await
    }

    async fn run_with(
        &self,
        scorer: &(dyn ItemScorer + Sync),
        batch_size: usize,
        now: DateTime<Utc>,
    ) -> Result<RunReport> {
        ensure_metrics_described();
        let started = Instant::now();

        let report = self.score_batch(scorer, batch_size, now).await;

        histogram!(BATCH_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        gauge!(LAST_RUN_TS).set(now.timestamp().max(0) as f64);

        report.inspect_err(|e| {
            counter!(BATCH_FATAL).increment(1);
            error!(target: "scoring", error = %e, "scoring batch aborted");
        })
    }

    async fn score_batch(
        &self,
        scorer: &(dyn ItemScorer + Sync),
        batch_size: usize,
        now: DateTime<Utc>,
    ) -> Result<RunReport> {
        let items = self.store.fetch_unprocessed(batch_size).await?;
        let mut report = RunReport {
            selected: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            info!(target: "scoring", "no unprocessed items to score");
            return Ok(report);
        }

        for item in items {
            let item_id = item.id;
            let result = match score_isolated(|| scorer.score_item(&item, now)) {
                Ok(r) => r,
                Err(msg) => {
                    error!(target: "scoring", item_id, error = %msg, "scoring fault; skipping item");
                    self.handle_failure(item_id, &mut report).await?;
                    continue;
                }
            };

            let passed = result.passed_filter;
            match self.store.commit_scored(result).await {
                Ok(()) => {
                    report.scored += 1;
                    counter!(ITEMS_SCORED).increment(1);
                    if passed {
                        report.passed += 1;
                        counter!(ITEMS_PASSED).increment(1);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(StoreError::Duplicate(_)) => {
                    warn!(target: "scoring", item_id, "item already scored; marking processed");
                    report.duplicates += 1;
                    self.mark_processed_quietly(item_id).await?;
                }
                Err(e) => {
                    error!(target: "scoring", item_id, error = %e, "commit failed; skipping item");
                    self.handle_failure(item_id, &mut report).await?;
                }
            }
        }

        info!(
            target: "scoring",
            selected = report.selected,
            scored = report.scored,
            passed = report.passed,
            failed = report.failed,
            abandoned = report.abandoned,
            duplicates = report.duplicates,
            "scoring batch finished"
        );
        Ok(report)
    }

    async fn handle_failure(&self, item_id: i64, report: &mut RunReport) -> Result<()> {
        report.failed += 1;
        counter!(ITEM_FAILURES).increment(1);

        let give_up = match self.policy {
            FailurePolicy::Drop => true,
            FailurePolicy::Retry => match self.store.record_failure(item_id).await {
                Ok(attempts) => attempts >= self.max_attempts,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(target: "scoring", item_id, error = %e, "could not record failed attempt");
                    false
                }
            },
        };

        if give_up {
            warn!(target: "scoring", item_id, "giving up on item; marking processed without a result");
            report.abandoned += 1;
            self.mark_processed_quietly(item_id).await?;
        }
        Ok(())
    }

    /// Fatal errors propagate; anything else is only logged.
    async fn mark_processed_quietly(&self, item_id: i64) -> Result<()> {
        match self.store.mark_processed(item_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(target: "scoring", item_id, error = %e, "could not mark item processed");
                Ok(())
            }
        }
    }
}

fn compile(cfg: &TaxonomyConfig) -> Result<ScoringEngine> {
    ScoringEngine::from_config(cfg).map_err(|e| EngineError::Config(e.to_string()))
}

/// Run one scoring call behind a panic boundary; the panic message becomes the error.
fn score_isolated<F>(f: F) -> std::result::Result<ScoredResult, String>
where
    F: FnOnce() -> ScoredResult,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}
