// src/score/risk.rs
//! Risk tiering: safe → sensitive → avoid.
//!
//! 1. Any avoid keyword as a substring short-circuits to `avoid` (sole flag).
//! 2. Otherwise collect every sensitive keyword matched as a whole word.
//! 3. 3+ flags escalate to `avoid`; 1–2 is `sensitive`; none is `safe`.

use crate::matcher::{KeywordSet, MatchMode};
use crate::model::RiskLevel;
use crate::taxonomy::TaxonomyConfig;

/// Number of sensitive flags that escalates an item to `avoid`.
pub const ESCALATION_FLAGS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub flags: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RiskClassifier {
    avoid: KeywordSet,
    sensitive: KeywordSet,
}

impl RiskClassifier {
    pub fn new(cfg: &TaxonomyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            avoid: KeywordSet::compile(&cfg.keywords.avoid, MatchMode::Substring)?,
            sensitive: KeywordSet::compile(&cfg.keywords.sensitive, MatchMode::WholeWord)?,
        })
    }

    pub fn classify(&self, text: &str) -> RiskAssessment {
        if let Some(kw) = self.avoid.find_first(text) {
            return RiskAssessment {
                level: RiskLevel::Avoid,
                flags: vec![kw.to_string()],
                reason: format!("Contains prohibited keyword: {}", kw),
            };
        }

        let flags = self.sensitive.find_all(text);
        let level = RiskLevel::from_sensitive_count(flags.len());
        let reason = match level {
            RiskLevel::Avoid => format!(
                "Multiple sensitive keywords: {}",
                flags[..ESCALATION_FLAGS.min(flags.len())].join(", ")
            ),
            RiskLevel::Sensitive => format!("Contains sensitive content: {}", flags.join(", ")),
            RiskLevel::Safe => "No risk flags detected".to_string(),
        };

        RiskAssessment {
            level,
            flags,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RiskClassifier {
        RiskClassifier::new(&TaxonomyConfig::default_seed()).unwrap()
    }

    #[test]
    fn avoid_keyword_short_circuits() {
        let r = classifier().classify("explicit clip from the riot and protest, one killed");
        assert_eq!(r.level, RiskLevel::Avoid);
        assert_eq!(r.flags, vec!["explicit".to_string()]);
        assert!(r.reason.contains("prohibited keyword: explicit"));
    }

    #[test]
    fn avoid_keywords_match_substrings() {
        let r = classifier().classify("some nsfwesque meme about rent");
        assert_eq!(r.level, RiskLevel::Avoid);
        assert_eq!(r.flags, vec!["nsfw".to_string()]);
    }

    #[test]
    fn three_sensitive_flags_escalate() {
        let r = classifier().classify("protest turned into a riot and a clash with police");
        assert_eq!(r.level, RiskLevel::Avoid);
        assert_eq!(r.flags.len(), 3);
        assert_eq!(r.reason, "Multiple sensitive keywords: protest, riot, clash");
    }

    #[test]
    fn reason_lists_only_first_three_flags() {
        let r = classifier().classify("death tragedy accident murder riot");
        assert_eq!(r.level, RiskLevel::Avoid);
        assert_eq!(r.flags.len(), 5);
        assert_eq!(r.reason, "Multiple sensitive keywords: death, tragedy, accident");
    }

    #[test]
    fn two_flags_are_sensitive() {
        let r = classifier().classify("protest over rent, police clash");
        assert_eq!(r.level, RiskLevel::Sensitive);
        assert_eq!(r.flags, vec!["protest".to_string(), "clash".to_string()]);
        assert_eq!(r.reason, "Contains sensitive content: protest, clash");
    }

    #[test]
    fn sensitive_requires_whole_words() {
        // "bombastic" / "riots" / "clashes" are not whole-word hits
        let r = classifier().classify("a bombastic speech about riots and clashes");
        assert_eq!(r.level, RiskLevel::Safe);
        assert!(r.flags.is_empty());
        assert_eq!(r.reason, "No risk flags detected");
    }

    #[test]
    fn empty_lists_are_always_safe() {
        let c = RiskClassifier::new(&TaxonomyConfig::empty()).unwrap();
        assert_eq!(c.classify("explicit riot protest clash").level, RiskLevel::Safe);
    }
}
