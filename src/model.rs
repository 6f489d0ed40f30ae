//! Data model: raw items handed over by ingestion, and the immutable scored
//! record the engine writes once per item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engagement counters as reported by the source platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub views: u64,
}

impl Engagement {
    /// likes + shares + comments. Views are informational only.
    pub fn total(&self) -> u64 {
        self.likes
            .saturating_add(self.shares)
            .saturating_add(self.comments)
    }
}

/// A news/social item as produced by ingestion. Read-only to the engine
/// except for the `processed` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Store-assigned id; 0 until inserted.
    #[serde(default)]
    pub id: i64,
    /// e.g. "twitter", "google_news", "rss"
    pub source: String,
    /// Unique within `source`.
    pub source_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// `None` when the source timestamp was missing or unparsable.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub processed: bool,
}

impl RawItem {
    pub fn new(source: impl Into<String>, source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            source: source.into(),
            source_id: source_id.into(),
            title: None,
            text: text.into(),
            url: None,
            author: None,
            published_at: None,
            engagement: Engagement::default(),
            processed: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn published(mut self, ts: DateTime<Utc>) -> Self {
        self.published_at = Some(ts);
        self
    }

    /// Set the timestamp from a raw source string. Unparsable input leaves it unset.
    pub fn published_str(mut self, raw: &str) -> Self {
        self.published_at = parse_timestamp(raw);
        self
    }

    pub fn with_engagement(mut self, likes: u64, shares: u64, comments: u64) -> Self {
        self.engagement.likes = likes;
        self.engagement.shares = shares;
        self.engagement.comments = comments;
        self
    }

    /// Lower-cased `title + " " + text`; a missing title is treated as empty.
    pub fn normalized_text(&self) -> String {
        normalized_text(self.title.as_deref(), &self.text)
    }

    /// Publication time, substituting `now` when it is unknown.
    pub fn published_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.published_at.unwrap_or(now)
    }
}

pub fn normalized_text(title: Option<&str>, text: &str) -> String {
    format!("{} {}", title.unwrap_or(""), text).to_lowercase()
}

/// Accepts RFC 3339 and RFC 2822 (RSS `pubDate`). Anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Three-tier risk taxonomy. `Avoid` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Sensitive,
    Avoid,
}

impl RiskLevel {
    /// Escalation from accumulated sensitive flags: 0 → safe, 1–2 → sensitive, 3+ → avoid.
    pub fn from_sensitive_count(n: usize) -> Self {
        match n {
            0 => RiskLevel::Safe,
            1 | 2 => RiskLevel::Sensitive,
            _ => RiskLevel::Avoid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Sensitive => "sensitive",
            RiskLevel::Avoid => "avoid",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record. Exactly one per raw item; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub item_id: i64,
    pub relevance_score: f32,
    pub virality_score: f32,
    pub macro_impact_score: f32,
    pub risk_level: RiskLevel,
    pub keyword_matches: Vec<String>,
    pub sensitive_flags: Vec<String>,
    pub risk_reason: String,
    pub passed_filter: bool,
    pub scored_at: DateTime<Utc>,
}
