// src/score/mod.rs
//! Scoring pipeline: relevance, virality, macro impact, risk, then the filter gate.
//!
//! `ScoringEngine` is compiled from one `TaxonomyConfig` snapshot and is pure:
//! no I/O, no shared mutable state, total over any `RawItem`.

pub mod filter;
pub mod macro_impact;
pub mod relevance;
pub mod risk;
pub mod virality;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::logging::{anon_hash, truncate_vec};
use crate::model::{RawItem, ScoredResult};
use crate::taxonomy::TaxonomyConfig;

pub use filter::passes_filter;
pub use macro_impact::MacroImpactScorer;
pub use relevance::{RelevanceOutcome, RelevanceScorer};
pub use risk::{RiskAssessment, RiskClassifier};

/// Clamp into [0, 100]; NaN collapses to 0.
pub fn clamp_score(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 100.0)
    }
}

/// Every field of a scored result except identity and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemScores {
    pub relevance: RelevanceOutcome,
    pub virality: f32,
    pub macro_impact: f32,
    pub risk: RiskAssessment,
    pub passed_filter: bool,
}

impl ItemScores {
    pub fn into_result(self, item_id: i64, scored_at: DateTime<Utc>) -> ScoredResult {
        ScoredResult {
            item_id,
            relevance_score: self.relevance.score,
            virality_score: self.virality,
            macro_impact_score: self.macro_impact,
            risk_level: self.risk.level,
            keyword_matches: self.relevance.matched,
            sensitive_flags: self.risk.flags,
            risk_reason: self.risk.reason,
            passed_filter: self.passed_filter,
            scored_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    relevance: RelevanceScorer,
    macro_impact: MacroImpactScorer,
    risk: RiskClassifier,
    threshold: f32,
}

impl ScoringEngine {
    pub fn from_config(cfg: &TaxonomyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            relevance: RelevanceScorer::new(cfg)?,
            macro_impact: MacroImpactScorer::new(&cfg.macro_impact)?,
            risk: RiskClassifier::new(cfg)?,
            threshold: cfg.relevance_threshold(),
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score one item as of `now`. Missing title/timestamp fall back to "" / `now`.
    pub fn score(&self, item: &RawItem, now: DateTime<Utc>) -> ItemScores {
        let text = item.normalized_text();

        let relevance = self.relevance.score(&text);
        let age_h = virality::age_hours(item.published_or(now), now);
        let virality = virality::score(&item.engagement, age_h);
        let macro_impact = self.macro_impact.score(&text, &relevance.matched);
        let risk = self.risk.classify(&text);
        let passed_filter = passes_filter(relevance.score, risk.level, self.threshold);

        debug!(
            target: "scoring",
            item_id = item.id,
            text_id = %anon_hash(&text),
            relevance = relevance.score,
            virality,
            macro_impact,
            risk = %risk.level,
            passed_filter,
            matched = ?truncate_vec(&relevance.matched, 5),
            "item scored"
        );

        ItemScores {
            relevance,
            virality,
            macro_impact,
            risk,
            passed_filter,
        }
    }

    pub fn score_result(&self, item: &RawItem, now: DateTime<Utc>) -> ScoredResult {
        self.score(item, now).into_result(item.id, now)
    }

    /// Convenience for callers holding only text (no engagement, scored "now").
    pub fn score_text(&self, text: &str, now: DateTime<Utc>) -> ItemScores {
        self.score(&RawItem::new("adhoc", "adhoc", text), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskLevel;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::from_config(&TaxonomyConfig::default_seed()).unwrap()
    }

    #[test]
    fn full_item_produces_consistent_result() {
        let item = RawItem::new("twitter", "t1", "CBN policy on mortgage rates hits Lagos housing")
            .with_title("Housing")
            .published(now() - Duration::hours(2))
            .with_engagement(150, 30, 20);
        let r = engine().score_result(&item, now());

        assert!(r.keyword_matches.contains(&"housing".to_string()));
        assert!(r.keyword_matches.contains(&"cbn".to_string()));
        assert!(r.relevance_score >= 60.0);
        assert!((r.virality_score - 91.666_67).abs() < 0.01);
        assert!(r.macro_impact_score > 0.0);
        assert_eq!(r.risk_level, RiskLevel::Safe);
        assert!(r.passed_filter);
        assert_eq!(r.scored_at, now());
    }

    #[test]
    fn avoid_blocks_even_highly_relevant_items() {
        let item = RawItem::new(
            "rss",
            "a1",
            "explicit lagos housing rent property land mortgage story",
        );
        let r = engine().score_result(&item, now());
        assert!(r.relevance_score >= 80.0);
        assert_eq!(r.risk_level, RiskLevel::Avoid);
        assert!(!r.passed_filter);
    }

    #[test]
    fn keyword_matches_are_subset_of_tracked() {
        let cfg = TaxonomyConfig::default_seed();
        let e = ScoringEngine::from_config(&cfg).unwrap();
        let s = e.score_text("naira falls as fuel subsidy ends; landlords in abuja react", now());
        for m in &s.relevance.matched {
            assert!(cfg.keywords.tracked.contains(m), "{} not tracked", m);
        }
    }

    #[test]
    fn malformed_items_still_score() {
        let item = RawItem::new("rss", "m1", "").published_str("not a date");
        let s = engine().score(&item, now());
        assert_eq!(s.relevance.score, 0.0);
        assert_eq!(s.virality, 0.0);
        assert_eq!(s.risk.level, RiskLevel::Safe);
        assert!(!s.passed_filter);
    }

    #[test]
    fn scoring_twice_is_deterministic() {
        let item = RawItem::new("rss", "d1", "rent protest in lagos")
            .published(now() - Duration::hours(5))
            .with_engagement(10, 2, 3);
        let e = engine();
        assert_eq!(e.score_result(&item, now()), e.score_result(&item, now()));
    }

    #[test]
    fn clamp_score_handles_nan_and_bounds() {
        assert_eq!(clamp_score(f32::NAN), 0.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(180.0), 100.0);
        assert_eq!(clamp_score(42.5), 42.5);
    }
}
