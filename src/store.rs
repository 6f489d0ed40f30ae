// src/store.rs
//! Persistence seam between the engine and its collaborators.
//!
//! Ingestion writes raw items, the orchestrator reads unprocessed ones and
//! commits one scored result per item, content generation pulls the ranked
//! passed results. `InMemoryStore` is the bundled implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::model::{RawItem, RiskLevel, ScoredResult};

/// Downstream query over passed results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub min_relevance: Option<f32>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
}

fn default_limit() -> usize {
    10
}

impl Default for TopQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_relevance: None,
            risk_level: None,
        }
    }
}

/// A scored result joined with its raw item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: RawItem,
    pub scored: ScoredResult,
}

/// Any raw item with its result, if it has one yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub item: RawItem,
    pub scored: Option<ScoredResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub processed: usize,
    pub scored: usize,
    pub passed_filter: usize,
    pub safe: usize,
    pub sensitive: usize,
    pub avoid: usize,
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Up to `limit` items with `processed = false`, in insertion order.
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<RawItem>, StoreError>;

    /// Insert `result` and flip its item to processed as one unit of work.
    /// Fails with `Duplicate` if the item already has a result.
    async fn commit_scored(&self, result: ScoredResult) -> Result<(), StoreError>;

    async fn mark_processed(&self, item_id: i64) -> Result<(), StoreError>;

    /// Count one failed scoring attempt for `item_id`; returns the running total.
    async fn record_failure(&self, item_id: i64) -> Result<u32, StoreError>;

    /// Passed results ranked by relevance desc, then virality desc.
    async fn top_passed(&self, query: &TopQuery) -> Result<Vec<ScoredItem>, StoreError>;

    /// Newest items first, scored or not.
    async fn recent(&self, limit: usize) -> Result<Vec<ItemRow>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

#[derive(Debug)]
struct Inner {
    items: Vec<RawItem>,
    results: HashMap<i64, ScoredResult>,
    next_id: i64,
    available: bool,
    rejecting: HashSet<i64>,
    attempts: HashMap<i64, u32>,
}

/// Mutex-guarded in-process store. Commits are atomic per item.
#[derive(Debug)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: Vec::new(),
                results: HashMap::new(),
                next_id: 1,
                available: true,
                rejecting: HashSet::new(),
                attempts: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".into()))?;
        if !guard.available {
            return Err(StoreError::Unavailable("connection lost".into()));
        }
        Ok(guard)
    }

    /// Ingestion entrypoint. Assigns an id; returns `None` if `(source, source_id)`
    /// was already ingested.
    pub fn insert_raw(&self, mut item: RawItem) -> Result<Option<i64>, StoreError> {
        let mut g = self.lock()?;
        let exists = g
            .items
            .iter()
            .any(|it| it.source == item.source && it.source_id == item.source_id);
        if exists {
            return Ok(None);
        }
        let id = g.next_id;
        g.next_id += 1;
        item.id = id;
        item.processed = false;
        g.items.push(item);
        Ok(Some(id))
    }

    pub fn get(&self, item_id: i64) -> Option<RawItem> {
        let g = self.inner.lock().ok()?;
        g.items.iter().find(|it| it.id == item_id).cloned()
    }

    pub fn result_for(&self, item_id: i64) -> Option<ScoredResult> {
        let g = self.inner.lock().ok()?;
        g.results.get(&item_id).cloned()
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut g) = self.inner.lock() {
            g.available = available;
        }
    }

    /// Make every write for `item_id` fail with `Rejected`.
    pub fn reject_writes_for(&self, item_id: i64) {
        if let Ok(mut g) = self.inner.lock() {
            g.rejecting.insert(item_id);
        }
    }
}

#[async_trait]
impl TrendStore for InMemoryStore {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<RawItem>, StoreError> {
        let g = self.lock()?;
        Ok(g.items
            .iter()
            .filter(|it| !it.processed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn commit_scored(&self, result: ScoredResult) -> Result<(), StoreError> {
        let mut g = self.lock()?;
        let item_id = result.item_id;
        let idx = g
            .items
            .iter()
            .position(|it| it.id == item_id)
            .ok_or(StoreError::NotFound(item_id))?;
        if g.rejecting.contains(&item_id) {
            return Err(StoreError::Rejected {
                item_id,
                reason: "write refused".into(),
            });
        }
        if g.results.contains_key(&item_id) {
            return Err(StoreError::Duplicate(item_id));
        }
        g.results.insert(item_id, result);
        g.items[idx].processed = true;
        Ok(())
    }

    async fn mark_processed(&self, item_id: i64) -> Result<(), StoreError> {
        let mut g = self.lock()?;
        let item = g
            .items
            .iter_mut()
            .find(|it| it.id == item_id)
            .ok_or(StoreError::NotFound(item_id))?;
        item.processed = true;
        Ok(())
    }

    async fn record_failure(&self, item_id: i64) -> Result<u32, StoreError> {
        let mut g = self.lock()?;
        if !g.items.iter().any(|it| it.id == item_id) {
            return Err(StoreError::NotFound(item_id));
        }
        let n = g.attempts.entry(item_id).or_insert(0);
        *n += 1;
        Ok(*n)
    }

    async fn top_passed(&self, query: &TopQuery) -> Result<Vec<ScoredItem>, StoreError> {
        let g = self.lock()?;
        let mut rows: Vec<ScoredItem> = g
            .items
            .iter()
            .filter_map(|it| {
                g.results.get(&it.id).map(|r| ScoredItem {
                    item: it.clone(),
                    scored: r.clone(),
                })
            })
            .filter(|row| row.scored.passed_filter)
            .filter(|row| {
                query
                    .min_relevance
                    .map_or(true, |min| row.scored.relevance_score >= min)
            })
            .filter(|row| query.risk_level.map_or(true, |lvl| row.scored.risk_level == lvl))
            .collect();

        // stable sort keeps insertion order among exact ties
        rows.sort_by(|a, b| {
            b.scored
                .relevance_score
                .total_cmp(&a.scored.relevance_score)
                .then(b.scored.virality_score.total_cmp(&a.scored.virality_score))
        });
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ItemRow>, StoreError> {
        let g = self.lock()?;
        Ok(g.items
            .iter()
            .rev()
            .take(limit)
            .map(|it| ItemRow {
                item: it.clone(),
                scored: g.results.get(&it.id).cloned(),
            })
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let g = self.lock()?;
        let mut s = StoreStats {
            total: g.items.len(),
            processed: g.items.iter().filter(|it| it.processed).count(),
            scored: g.results.len(),
            ..Default::default()
        };
        for r in g.results.values() {
            if r.passed_filter {
                s.passed_filter += 1;
            }
            match r.risk_level {
                RiskLevel::Safe => s.safe += 1,
                RiskLevel::Sensitive => s.sensitive += 1,
                RiskLevel::Avoid => s.avoid += 1,
            }
        }
        Ok(s)
    }
}
