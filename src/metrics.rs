use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ITEMS_SCORED: &str = "scoring_items_total";
pub const ITEMS_PASSED: &str = "scoring_passed_total";
pub const ITEM_FAILURES: &str = "scoring_item_failures_total";
pub const BATCH_FATAL: &str = "scoring_batch_fatal_total";
pub const BATCH_MS: &str = "scoring_batch_ms";
pub const LAST_RUN_TS: &str = "scoring_last_run_ts";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(ITEMS_SCORED, "Items that produced a scored result.");
        describe_counter!(ITEMS_PASSED, "Scored items that passed the filter gate.");
        describe_counter!(ITEM_FAILURES, "Items skipped due to a per-item fault.");
        describe_counter!(BATCH_FATAL, "Batches aborted by a persistence failure.");
        describe_histogram!(BATCH_MS, "Batch wall time in milliseconds.");
        describe_gauge!(LAST_RUN_TS, "Unix ts when a scoring batch last ran.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {}", e))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
