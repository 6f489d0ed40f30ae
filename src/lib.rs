// src/lib.rs
//! Trend scoring engine: relevance, virality, macro impact and risk scoring
//! of ingested items against a configurable keyword taxonomy, plus the batch
//! orchestrator, scheduler and HTTP surface around it.

pub mod api;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod scheduler;
pub mod score;
pub mod store;
pub mod taxonomy;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::{EngineError, StoreError};
pub use crate::model::{Engagement, RawItem, RiskLevel, ScoredResult};
pub use crate::orchestrator::{FailurePolicy, ItemScorer, RunReport, ScoringOrchestrator};
pub use crate::score::ScoringEngine;
pub use crate::store::{InMemoryStore, TopQuery, TrendStore};
pub use crate::taxonomy::{TaxonomyConfig, TaxonomyHandle};
