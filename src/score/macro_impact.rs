// src/score/macro_impact.rs
//! Systemic/policy significance.
//!
//! Every high-impact term found as a *substring* adds `term_weight`; a
//! property-domain keyword match together with a policy-domain substring
//! adds `combo_bonus`. Clamped to 100 at the end.
//!
//! Terms match as substrings, unlike relevance keywords ("taxi" counts as "tax").

use crate::matcher::{KeywordSet, MatchMode};
use crate::taxonomy::MacroTerms;

#[derive(Debug, Clone)]
pub struct MacroImpactScorer {
    high_impact: KeywordSet,
    property: Vec<String>,
    policy: KeywordSet,
    term_weight: f32,
    combo_bonus: f32,
}

impl MacroImpactScorer {
    pub fn new(terms: &MacroTerms) -> anyhow::Result<Self> {
        Ok(Self {
            high_impact: KeywordSet::compile(&terms.high_impact, MatchMode::Substring)?,
            property: terms.property.clone(),
            policy: KeywordSet::compile(&terms.policy, MatchMode::Substring)?,
            term_weight: terms.term_weight,
            combo_bonus: terms.combo_bonus,
        })
    }

    /// `matched` is the relevance scorer's keyword set for the same text.
    pub fn score(&self, text: &str, matched: &[String]) -> f32 {
        let hits = self.high_impact.find_all(text).len();
        let mut total = hits as f32 * self.term_weight;

        let has_property = matched.iter().any(|m| self.property.contains(m));
        if has_property && self.policy.any_match(text) {
            total += self.combo_bonus;
        }

        super::clamp_score(total)
    }
}
