// src/taxonomy.rs
//! Keyword taxonomy: config schema (TOML), built-in seed, env overrides,
//! validation, and a thread-safe handle with optional hot reload.
//!
//! The taxonomy is an immutable value while a batch runs. The orchestrator
//! snapshots the handle at the start of every run, so edits to the file (or
//! an admin reload) take effect on the next run without a restart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

// --- env defaults & names ---
pub const DEFAULT_TAXONOMY_CONFIG_PATH: &str = "config/taxonomy.toml";
/// Two values circulated for this in the past (40 and 60); 60 is the shipped default.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 60.0;
pub const DEFAULT_MAX_ITEMS_PER_CYCLE: usize = 20;

pub const ENV_TAXONOMY_CONFIG_PATH: &str = "TAXONOMY_CONFIG_PATH";
pub const ENV_RELEVANCE_THRESHOLD: &str = "RELEVANCE_THRESHOLD";
pub const ENV_MAX_ITEMS_PER_CYCLE: &str = "MAX_TRENDS_PER_CYCLE";
pub const ENV_TAXONOMY_HOT_RELOAD: &str = "TAXONOMY_HOT_RELOAD";

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub keywords: KeywordLists,
    /// category name -> keywords; categories may overlap.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "macro")]
    pub macro_impact: MacroTerms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Relevance pass threshold on the 0–100 scale (inclusive).
    pub relevance: f32,
    pub max_items_per_cycle: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            relevance: DEFAULT_RELEVANCE_THRESHOLD,
            max_items_per_cycle: DEFAULT_MAX_ITEMS_PER_CYCLE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordLists {
    pub tracked: Vec<String>,
    /// Only entries that are also tracked can ever contribute.
    pub priority: Vec<String>,
    pub sensitive: Vec<String>,
    pub avoid: Vec<String>,
}

/// Vocabulary and weights of the macro-impact scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroTerms {
    /// Each term found as a substring adds `term_weight`.
    pub high_impact: Vec<String>,
    /// Matched tracked keywords that count as "property domain" for the combo bonus.
    pub property: Vec<String>,
    /// Substring terms that count as "policy domain" for the combo bonus.
    pub policy: Vec<String>,
    pub term_weight: f32,
    pub combo_bonus: f32,
}

impl Default for MacroTerms {
    fn default() -> Self {
        Self {
            high_impact: strings(&[
                "policy",
                "government",
                "cbn",
                "central bank",
                "regulation",
                "subsidy",
                "interest rate",
                "mortgage rate",
                "housing crisis",
                "rent control",
                "land reform",
                "tax",
                "budget",
            ]),
            property: strings(&["real estate", "housing", "rent", "property", "land"]),
            policy: strings(&["policy", "government", "regulation", "law"]),
            term_weight: 20.0,
            combo_bonus: 30.0,
        }
    }
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl TaxonomyConfig {
    /// A taxonomy with no keywords at all. Scores everything 0 and filters everything out.
    pub fn empty() -> Self {
        Self {
            thresholds: Thresholds::default(),
            keywords: KeywordLists::default(),
            categories: BTreeMap::new(),
            macro_impact: MacroTerms::default(),
        }
    }

    /// Built-in vocabulary for the Nigerian property/economy market.
    pub fn default_seed() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            "property".to_string(),
            strings(&[
                "real estate",
                "housing",
                "rent",
                "property",
                "land",
                "mortgage",
                "landlord",
                "tenant",
            ]),
        );
        categories.insert(
            "economy".to_string(),
            strings(&["inflation", "naira", "economy", "cbn", "subsidy", "fuel"]),
        );
        categories.insert(
            "utilities".to_string(),
            strings(&["power", "gas", "electricity", "nepa"]),
        );
        categories.insert(
            "location".to_string(),
            strings(&["lagos", "abuja", "nigeria"]),
        );

        Self {
            thresholds: Thresholds::default(),
            keywords: KeywordLists {
                tracked: strings(&[
                    "real estate",
                    "land",
                    "rent",
                    "housing",
                    "mortgage",
                    "property",
                    "power",
                    "gas",
                    "inflation",
                    "naira",
                    "policy",
                    "investment",
                    "lagos",
                    "abuja",
                    "nigeria",
                    "cbn",
                    "economy",
                    "subsidy",
                    "fuel",
                    "electricity",
                    "nepa",
                    "landlord",
                    "tenant",
                ]),
                priority: strings(&[
                    "real estate",
                    "housing",
                    "property",
                    "land",
                    "mortgage",
                    "rent",
                    "developer",
                    "construction",
                    "residential",
                    "commercial",
                    "apartment",
                ]),
                sensitive: strings(&[
                    "death", "died", "killed", "tragedy", "accident", "bomb", "terror", "kidnap",
                    "murder", "protest", "riot", "clash",
                ]),
                avoid: strings(&["explicit", "nsfw", "porn", "xxx"]),
            },
            categories,
            macro_impact: MacroTerms::default(),
        }
    }

    /// Parse from a TOML string and normalize keyword lists.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: TaxonomyConfig = toml::from_str(toml_str)?;
        cfg.normalize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read taxonomy config at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config path from `TAXONOMY_CONFIG_PATH` (or the default),
    /// load it (falling back to the built-in seed when the file is absent),
    /// then apply env overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = config_path_from_env();
        let mut cfg = if path.exists() {
            Self::load_from(&path)?
        } else {
            warn!(
                target: "taxonomy",
                path = %path.display(),
                "taxonomy config not found; using built-in seed"
            );
            Self::default_seed()
        };
        cfg.apply_overrides(
            std::env::var(ENV_RELEVANCE_THRESHOLD).ok(),
            std::env::var(ENV_MAX_ITEMS_PER_CYCLE).ok(),
        );
        for w in cfg.validate() {
            warn!(target: "taxonomy", "{}", w);
        }
        Ok(cfg)
    }

    /// Apply raw env values (already read) on top of the file values.
    pub fn apply_overrides(&mut self, threshold: Option<String>, max_items: Option<String>) {
        if let Some(t) = parse_threshold_env(threshold) {
            self.thresholds.relevance = t;
        }
        if let Some(n) = parse_batch_env(max_items) {
            self.thresholds.max_items_per_cycle = n;
        }
    }

    /// Trim, lower-case and de-duplicate every keyword list (first occurrence wins).
    pub fn normalize(&mut self) {
        let kw = &mut self.keywords;
        kw.tracked = clean_list(&kw.tracked);
        kw.priority = clean_list(&kw.priority);
        kw.sensitive = clean_list(&kw.sensitive);
        kw.avoid = clean_list(&kw.avoid);

        let cats = std::mem::take(&mut self.categories);
        self.categories = cats
            .into_iter()
            .map(|(name, v)| (name.trim().to_string(), clean_list(&v)))
            .filter(|(name, _)| !name.is_empty())
            .collect();

        let m = &mut self.macro_impact;
        m.high_impact = clean_list(&m.high_impact);
        m.property = clean_list(&m.property);
        m.policy = clean_list(&m.policy);
        let defaults = MacroTerms::default();
        if !m.term_weight.is_finite() || m.term_weight < 0.0 {
            m.term_weight = defaults.term_weight;
        }
        if !m.combo_bonus.is_finite() || m.combo_bonus < 0.0 {
            m.combo_bonus = defaults.combo_bonus;
        }

        if !self.thresholds.relevance.is_finite() {
            self.thresholds.relevance = DEFAULT_RELEVANCE_THRESHOLD;
        }
        self.thresholds.relevance = self.thresholds.relevance.clamp(0.0, 100.0);
        if self.thresholds.max_items_per_cycle == 0 {
            self.thresholds.max_items_per_cycle = DEFAULT_MAX_ITEMS_PER_CYCLE;
        }
    }

    /// Human-readable warnings about keywords that can never contribute.
    /// None of these are errors: an empty taxonomy is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut out = Vec::new();
        let tracked = &self.keywords.tracked;
        if tracked.is_empty() {
            out.push("no tracked keywords configured; every item will score 0".to_string());
        }
        for p in &self.keywords.priority {
            if !tracked.contains(p) {
                out.push(format!("priority keyword `{}` is not tracked", p));
            }
        }
        for (cat, kws) in &self.categories {
            for k in kws {
                if !tracked.contains(k) {
                    out.push(format!("category `{}` keyword `{}` is not tracked", cat, k));
                }
            }
        }
        out
    }

    pub fn relevance_threshold(&self) -> f32 {
        self.thresholds.relevance
    }

    pub fn max_items_per_cycle(&self) -> usize {
        self.thresholds.max_items_per_cycle
    }
}

pub fn config_path_from_env() -> PathBuf {
    std::env::var(ENV_TAXONOMY_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_TAXONOMY_CONFIG_PATH))
}

// parse optional float env and clamp to <0.0..=100.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 100.0))
}

fn parse_batch_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

fn clean_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// Shared, swappable taxonomy. Cheap to clone.
#[derive(Clone, Debug)]
pub struct TaxonomyHandle {
    inner: Arc<RwLock<TaxonomyConfig>>,
    path: Option<PathBuf>,
}

impl TaxonomyHandle {
    pub fn new(cfg: TaxonomyConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cfg)),
            path: None,
        }
    }

    /// Handle that knows where to re-read its config from.
    pub fn with_path(cfg: TaxonomyConfig, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cfg)),
            path: Some(path),
        }
    }

    /// Owned copy of the current config.
    pub fn snapshot(&self) -> TaxonomyConfig {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, cfg: TaxonomyConfig) {
        match self.inner.write() {
            Ok(mut g) => *g = cfg,
            Err(poisoned) => *poisoned.into_inner() = cfg,
        }
    }

    /// Re-read the backing file (plus env overrides). Keeps the old config on failure.
    pub fn reload(&self) -> anyhow::Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| anyhow::anyhow!("taxonomy handle has no backing file"))?;
        let mut fresh = TaxonomyConfig::load_from(&path)?;
        fresh.apply_overrides(
            std::env::var(ENV_RELEVANCE_THRESHOLD).ok(),
            std::env::var(ENV_MAX_ITEMS_PER_CYCLE).ok(),
        );
        self.replace(fresh);
        info!(target: "taxonomy", path = %path.display(), "taxonomy reloaded");
        Ok(())
    }
}

fn hot_reload_enabled() -> bool {
    std::env::var(ENV_TAXONOMY_HOT_RELOAD)
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Start a simple polling watcher on the handle's file. Polls mtime every 2s.
/// No-op unless `TAXONOMY_HOT_RELOAD=1` and the handle has a path.
pub fn start_hot_reload_thread(handle: TaxonomyHandle) {
    if !hot_reload_enabled() {
        return;
    }
    let Some(path) = handle.path.clone() else {
        return;
    };

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = match last_mtime {
                    None => {
                        last_mtime = Some(mtime);
                        false
                    }
                    Some(prev) => mtime > prev,
                };
                if changed {
                    if let Err(e) = handle.reload() {
                        warn!(target: "taxonomy", error = %e, "hot reload failed; keeping previous taxonomy");
                    }
                    last_mtime = Some(mtime);
                }
            }
            thread::sleep(poll);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TOML: &str = r#"
[thresholds]
relevance = 40
max_items_per_cycle = 5

[keywords]
tracked = [" Housing ", "rent", "RENT", "cbn", ""]
priority = ["housing", "developer"]
sensitive = ["riot"]
avoid = ["nsfw"]

[categories]
property = ["housing", "rent"]
policy = ["cbn", "tax"]
"#;

    #[test]
    fn parses_and_normalizes_lists() {
        let cfg = TaxonomyConfig::from_toml_str(TEST_TOML).expect("parse");
        assert_eq!(cfg.keywords.tracked, vec!["housing", "rent", "cbn"]);
        assert_eq!(cfg.relevance_threshold(), 40.0);
        assert_eq!(cfg.max_items_per_cycle(), 5);
        // [macro] omitted -> defaults
        assert_eq!(cfg.macro_impact, MacroTerms::default());
    }

    #[test]
    fn validate_reports_untracked_entries() {
        let cfg = TaxonomyConfig::from_toml_str(TEST_TOML).unwrap();
        let w = cfg.validate();
        assert!(w.iter().any(|s| s.contains("developer")));
        assert!(w.iter().any(|s| s.contains("`tax`")));
        assert!(!w.iter().any(|s| s.contains("housing")));
    }

    #[test]
    fn empty_document_is_valid() {
        let cfg = TaxonomyConfig::from_toml_str("").unwrap();
        assert!(cfg.keywords.tracked.is_empty());
        assert_eq!(cfg.relevance_threshold(), DEFAULT_RELEVANCE_THRESHOLD);
        assert_eq!(cfg.max_items_per_cycle(), DEFAULT_MAX_ITEMS_PER_CYCLE);
    }

    #[test]
    fn overrides_clamp_and_ignore_garbage() {
        let mut cfg = TaxonomyConfig::default_seed();
        cfg.apply_overrides(Some("250".into()), Some("0".into()));
        assert_eq!(cfg.relevance_threshold(), 100.0);
        assert_eq!(cfg.max_items_per_cycle(), DEFAULT_MAX_ITEMS_PER_CYCLE);

        cfg.apply_overrides(Some("abc".into()), Some(" 7 ".into()));
        assert_eq!(cfg.relevance_threshold(), 100.0);
        assert_eq!(cfg.max_items_per_cycle(), 7);

        cfg.apply_overrides(Some(" 40 ".into()), None);
        assert_eq!(cfg.relevance_threshold(), 40.0);
    }

    #[test]
    fn seed_has_expected_shape() {
        let cfg = TaxonomyConfig::default_seed();
        assert_eq!(cfg.keywords.tracked.len(), 23);
        assert_eq!(cfg.categories.len(), 4);
        assert!(cfg.keywords.avoid.contains(&"nsfw".to_string()));
    }

    #[test]
    fn handle_replace_is_visible_to_clones() {
        let h = TaxonomyHandle::new(TaxonomyConfig::empty());
        let h2 = h.clone();
        h.replace(TaxonomyConfig::default_seed());
        assert_eq!(h2.snapshot().keywords.tracked.len(), 23);
    }

    #[test]
    fn reload_without_path_errors() {
        let h = TaxonomyHandle::new(TaxonomyConfig::empty());
        assert!(h.reload().is_err());
    }
}
