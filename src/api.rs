// src/api.rs
//! HTTP surface: ranked results for content generation, manual scoring runs
//! and taxonomy admin.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::{EngineError, StoreError};
use crate::model::{Engagement, RawItem, RiskLevel};
use crate::orchestrator::ScoringOrchestrator;
use crate::score::ScoringEngine;
use crate::store::{ItemRow, ScoredItem, StoreStats, TopQuery, TrendStore};
use crate::taxonomy::{TaxonomyConfig, TaxonomyHandle};

const MAX_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ScoringOrchestrator,
    pub store: Arc<dyn TrendStore>,
    pub taxonomy: TaxonomyHandle,
}

impl AppState {
    pub fn new(store: Arc<dyn TrendStore>, taxonomy: TaxonomyHandle) -> Self {
        Self {
            orchestrator: ScoringOrchestrator::new(store.clone(), taxonomy.clone()),
            store,
            taxonomy,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/trends", get(top_trends))
        .route("/trends/all", get(all_trends))
        .route("/trends/score", post(trigger_scoring))
        .route("/score/preview", post(preview))
        .route("/stats", get(stats))
        .route("/config/taxonomy", get(get_taxonomy))
        .route("/admin/reload-taxonomy", post(reload_taxonomy))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn store_err(e: StoreError) -> (StatusCode, String) {
    let code = if e.is_fatal() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, e.to_string())
}

async fn top_trends(
    State(state): State<AppState>,
    Query(mut q): Query<TopQuery>,
) -> ApiResult<Vec<ScoredItem>> {
    q.limit = q.limit.min(MAX_LIMIT);
    state.store.top_passed(&q).await.map(Json).map_err(store_err)
}

#[derive(Deserialize)]
struct LimitParam {
    #[serde(default = "default_all_limit")]
    limit: usize,
}

fn default_all_limit() -> usize {
    50
}

async fn all_trends(
    State(state): State<AppState>,
    Query(p): Query<LimitParam>,
) -> ApiResult<Vec<ItemRow>> {
    state
        .store
        .recent(p.limit.min(MAX_LIMIT))
        .await
        .map(Json)
        .map_err(store_err)
}

#[derive(Serialize)]
struct ScoreRunResp {
    status: &'static str,
    scored_count: usize,
}

async fn trigger_scoring(State(state): State<AppState>) -> ApiResult<ScoreRunResp> {
    match state.orchestrator.run_cycle().await {
        Ok(report) => Ok(Json(ScoreRunResp {
            status: "success",
            scored_count: report.scored,
        })),
        Err(EngineError::Store(e)) => Err(store_err(e)),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

#[derive(Deserialize)]
struct PreviewReq {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: String,
    /// RFC 3339 or RFC 2822; anything else is scored as "now".
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    engagement: Engagement,
}

#[derive(Serialize)]
struct PreviewResp {
    relevance_score: f32,
    virality_score: f32,
    macro_impact_score: f32,
    risk_level: RiskLevel,
    keyword_matches: Vec<String>,
    sensitive_flags: Vec<String>,
    risk_reason: String,
    passed_filter: bool,
}

/// Score an ad-hoc item against the current taxonomy without persisting it.
async fn preview(State(state): State<AppState>, Json(body): Json<PreviewReq>) -> ApiResult<PreviewResp> {
    let engine = ScoringEngine::from_config(&state.taxonomy.snapshot())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut item = RawItem::new("preview", "preview", body.text);
    item.title = body.title;
    item.engagement = body.engagement;
    if let Some(raw) = body.published_at.as_deref() {
        item = item.published_str(raw);
    }

    let r = engine.score_result(&item, Utc::now());
    Ok(Json(PreviewResp {
        relevance_score: r.relevance_score,
        virality_score: r.virality_score,
        macro_impact_score: r.macro_impact_score,
        risk_level: r.risk_level,
        keyword_matches: r.keyword_matches,
        sensitive_flags: r.sensitive_flags,
        risk_reason: r.risk_reason,
        passed_filter: r.passed_filter,
    }))
}

async fn stats(State(state): State<AppState>) -> ApiResult<StoreStats> {
    state.store.stats().await.map(Json).map_err(store_err)
}

#[derive(Serialize)]
struct TaxonomyOut {
    config: TaxonomyConfig,
    warnings: Vec<String>,
}

async fn get_taxonomy(State(state): State<AppState>) -> Json<TaxonomyOut> {
    let config = state.taxonomy.snapshot();
    let warnings = config.validate();
    Json(TaxonomyOut { config, warnings })
}

async fn reload_taxonomy(State(state): State<AppState>) -> Result<String, (StatusCode, String)> {
    match state.taxonomy.reload() {
        Ok(()) => Ok("reloaded".to_string()),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, format!("failed: {}", e))),
    }
}
