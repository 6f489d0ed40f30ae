//! Error taxonomy for the scoring engine.
//!
//! Scorers never fail; everything here belongs to the orchestration and
//! persistence edges. `StoreError::is_fatal` is the line between "skip this
//! item and keep going" and "abort the batch".

use thiserror::Error;

/// Errors surfaced by a [`crate::store::TrendStore`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity to the backing store is gone. Aborts the whole batch.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A scored result already exists for this item.
    #[error("scored result already exists for item {0}")]
    Duplicate(i64),

    /// The referenced raw item does not exist.
    #[error("raw item {0} not found")]
    NotFound(i64),

    /// A single write was refused (constraint, payload, ...). Per-item only.
    #[error("write rejected for item {item_id}: {reason}")]
    Rejected { item_id: i64, reason: String },
}

impl StoreError {
    /// True when the failure is infrastructure-wide rather than item-local.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Top-level engine error returned from orchestrator runs.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
