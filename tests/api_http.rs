// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - POST /trends/score (success + lost store -> 503)
// - GET  /trends (filters, bad risk_level -> 400), /trends/all, /stats
// - POST /score/preview
// - GET  /config/taxonomy, POST /admin/reload-taxonomy

use std::io::Write as _;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use trend_scorer::api::{create_router, AppState};
use trend_scorer::model::RawItem;
use trend_scorer::store::InMemoryStore;
use trend_scorer::taxonomy::{TaxonomyConfig, TaxonomyHandle};

const BODY_LIMIT: usize = 1024 * 1024;

fn seeded() -> (Arc<InMemoryStore>, TaxonomyHandle) {
    let store = Arc::new(InMemoryStore::new());
    for (id, text) in [
        ("1", "lagos housing rent policy"),
        ("2", "abuja land mortgage protest"),
        ("3", "nsfw lagos housing rent"),
        ("4", "weather is nice"),
    ] {
        store.insert_raw(RawItem::new("rss", id, text)).unwrap();
    }
    (store, TaxonomyHandle::new(TaxonomyConfig::default_seed()))
}

fn router_for(store: Arc<InMemoryStore>, taxonomy: TaxonomyHandle) -> Router {
    create_router(AppState::new(store, taxonomy))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn json_of(bytes: &[u8]) -> Json {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_ok() {
    let (store, tax) = seeded();
    let (status, body) = send(router_for(store, tax), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
}

#[tokio::test]
async fn trigger_scoring_then_read_ranked_trends() {
    let (store, tax) = seeded();

    let (status, body) = send(router_for(store.clone(), tax.clone()), "POST", "/trends/score", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "status": "success", "scored_count": 4 }));

    let (status, body) = send(router_for(store.clone(), tax.clone()), "GET", "/trends", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = json_of(&body);
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["item"]["source_id"].as_str().unwrap())
        .collect();
    // avoid (3) and below-threshold (4) are never returned
    assert_eq!(ids, vec!["1", "2"]);

    let (_, body) = send(
        router_for(store.clone(), tax.clone()),
        "GET",
        "/trends?risk_level=sensitive&min_relevance=50",
        None,
    )
    .await;
    let rows = json_of(&body);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["scored"]["risk_level"], "sensitive");

    let (_, body) = send(router_for(store.clone(), tax.clone()), "GET", "/trends/all?limit=2", None).await;
    assert_eq!(json_of(&body).as_array().unwrap().len(), 2);

    let (_, body) = send(router_for(store, tax), "GET", "/stats", None).await;
    let stats = json_of(&body);
    assert_eq!(stats["total"], 4);
    assert_eq!(stats["scored"], 4);
    assert_eq!(stats["avoid"], 1);
    assert_eq!(stats["passed_filter"], 2);
}

#[tokio::test]
async fn unknown_risk_level_is_a_bad_request() {
    let (store, tax) = seeded();
    let (status, _) = send(router_for(store, tax), "GET", "/trends?risk_level=spicy", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scoring_with_lost_store_is_503() {
    let (store, tax) = seeded();
    store.set_available(false);
    let (status, _) = send(router_for(store.clone(), tax), "POST", "/trends/score", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    store.set_available(true);
    assert!(!store.get(1).unwrap().processed);
}

#[tokio::test]
async fn preview_scores_without_persisting() {
    let (store, tax) = seeded();
    let payload = json!({
        "title": "Explicit",
        "text": "lagos housing rent property land",
        "engagement": { "likes": 10, "shares": 0, "comments": 0, "views": 5000 }
    });
    let (status, body) = send(router_for(store.clone(), tax), "POST", "/score/preview", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);

    let v = json_of(&body);
    assert_eq!(v["risk_level"], "avoid");
    assert_eq!(v["passed_filter"], false);
    assert_eq!(v["risk_reason"], "Contains prohibited keyword: explicit");
    assert!(v["relevance_score"].as_f64().unwrap() >= 80.0);
    assert!((v["virality_score"].as_f64().unwrap() - 10.0).abs() < 1e-3);

    assert!(store.result_for(1).is_none());
}

#[tokio::test]
async fn taxonomy_endpoint_reports_warnings() {
    let cfg = TaxonomyConfig::from_toml_str(
        r#"
        [keywords]
        tracked = ["rent"]
        priority = ["rent", "villa"]
        "#,
    )
    .unwrap();
    let (store, _) = seeded();
    let (status, body) = send(router_for(store, TaxonomyHandle::new(cfg)), "GET", "/config/taxonomy", None).await;
    assert_eq!(status, StatusCode::OK);

    let v = json_of(&body);
    assert_eq!(v["config"]["keywords"]["tracked"], json!(["rent"]));
    let warnings = v["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w.as_str().unwrap().contains("villa")));
}

#[tokio::test]
async fn reload_without_backing_file_fails() {
    let (store, tax) = seeded();
    let (status, _) = send(router_for(store, tax), "POST", "/admin/reload-taxonomy", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
#[serial_test::serial]
async fn reload_picks_up_file_edits() {
    std::env::remove_var("RELEVANCE_THRESHOLD");
    std::env::remove_var("MAX_TRENDS_PER_CYCLE");

    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "[keywords]\ntracked = [\"rent\"]\n").unwrap();
    let tax = TaxonomyHandle::with_path(TaxonomyConfig::default_seed(), f.path().to_path_buf());
    let (store, _) = seeded();

    let (status, body) = send(router_for(store, tax.clone()), "POST", "/admin/reload-taxonomy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "reloaded");
    assert_eq!(tax.snapshot().keywords.tracked, vec!["rent".to_string()]);
}
