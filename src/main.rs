//! Trend scoring service: binary entrypoint.
//! Boots the Axum HTTP server, the taxonomy watcher and the scoring scheduler.

use shuttle_axum::ShuttleAxum;
use std::sync::Arc;

use trend_scorer::api::{create_router, AppState};
use trend_scorer::logging::init_tracing;
use trend_scorer::metrics::Metrics;
use trend_scorer::scheduler::{spawn_scoring_scheduler, SchedulerCfg};
use trend_scorer::store::{InMemoryStore, TrendStore};
use trend_scorer::taxonomy::{
    config_path_from_env, start_hot_reload_thread, TaxonomyConfig, TaxonomyHandle,
};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = TaxonomyConfig::from_env().map_err(shuttle_runtime::Error::Custom)?;
    let taxonomy = TaxonomyHandle::with_path(cfg, config_path_from_env());
    start_hot_reload_thread(taxonomy.clone());

    let store: Arc<dyn TrendStore> = Arc::new(InMemoryStore::new());
    let state = AppState::new(store, taxonomy);

    let sched = SchedulerCfg::from_env();
    tracing::info!(target: "scheduler", interval_secs = sched.interval_secs, "starting scoring scheduler");
    spawn_scoring_scheduler(sched, state.orchestrator.clone());

    let mut router = create_router(state);
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
