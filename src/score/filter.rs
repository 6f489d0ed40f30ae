// src/score/filter.rs
//! The pass/fail gate downstream content generation depends on.
//! Only relevance and risk decide; virality and macro impact are informational.

use crate::model::RiskLevel;

/// `relevance >= threshold` (inclusive) and not `avoid`.
pub fn passes_filter(relevance_score: f32, risk_level: RiskLevel, relevance_threshold: f32) -> bool {
    risk_level != RiskLevel::Avoid && relevance_score >= relevance_threshold
}
