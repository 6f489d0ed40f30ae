// src/score/relevance.rs
//! Topical relevance: whole-word matches against tracked keywords, plus
//! bonuses for priority keywords and for topical breadth (categories hit).
//!
//! score = min( min(matches*10, 60) + priority*15 + categories*5, 100 )

use crate::matcher::{KeywordSet, MatchMode};
use crate::taxonomy::TaxonomyConfig;

pub const POINTS_PER_MATCH: f32 = 10.0;
pub const BASE_CAP: f32 = 60.0;
pub const PRIORITY_BONUS: f32 = 15.0;
pub const CATEGORY_BONUS: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelevanceOutcome {
    pub score: f32,
    /// Tracked keywords found, in configured order, each once.
    pub matched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    tracked: KeywordSet,
    priority: Vec<String>,
    categories: Vec<(String, Vec<String>)>,
}

impl RelevanceScorer {
    pub fn new(cfg: &TaxonomyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            tracked: KeywordSet::compile(&cfg.keywords.tracked, MatchMode::WholeWord)?,
            priority: cfg.keywords.priority.clone(),
            categories: cfg
                .categories
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    /// `text` is the normalized (lower-cased title + body) item text.
    pub fn score(&self, text: &str) -> RelevanceOutcome {
        let matched = self.tracked.find_all(text);
        if matched.is_empty() {
            return RelevanceOutcome::default();
        }

        let base = (matched.len() as f32 * POINTS_PER_MATCH).min(BASE_CAP);

        let priority_hits = matched
            .iter()
            .filter(|m| self.priority.contains(m))
            .count();
        let priority_bonus = priority_hits as f32 * PRIORITY_BONUS;

        let categories_hit = self.categories_hit(&matched);
        let category_bonus = categories_hit as f32 * CATEGORY_BONUS;

        RelevanceOutcome {
            score: super::clamp_score(base + priority_bonus + category_bonus),
            matched,
        }
    }

    /// Distinct categories with at least one matched keyword. A keyword listed
    /// under several categories counts toward each of them.
    pub fn categories_hit(&self, matched: &[String]) -> usize {
        self.categories
            .iter()
            .filter(|(_, kws)| kws.iter().any(|k| matched.contains(k)))
            .count()
    }
}
