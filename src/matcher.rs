// src/matcher.rs
//! Keyword matching primitives shared by every scorer.
//!
//! A `KeywordRule` pairs a keyword with a match mode:
//! - `WholeWord`: case-insensitive, word-boundary regex over the escaped keyword
//!   (multi-word phrases like "real estate" work as-is).
//! - `Substring`: plain `contains` on lower-cased text, no boundary check.
//!
//! Tracked and sensitive keywords match whole words; avoid keywords and
//! high-impact terms match substrings ("nsfwesque" trips `nsfw`).

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    WholeWord,
    Substring,
}

#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub keyword: String,
    pub mode: MatchMode,
    re: Option<Regex>,
}

impl KeywordRule {
    /// Compile one rule. The keyword is lower-cased; regex metacharacters are escaped.
    pub fn new(keyword: &str, mode: MatchMode) -> anyhow::Result<Self> {
        let keyword = keyword.trim().to_lowercase();
        let re = match mode {
            MatchMode::WholeWord => {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(&keyword));
                let re = Regex::new(&pattern)
                    .map_err(|e| anyhow::anyhow!("keyword `{}` regex error: {}", keyword, e))?;
                Some(re)
            }
            MatchMode::Substring => None,
        };
        Ok(Self { keyword, mode, re })
    }

    /// `text` is expected to be lower-cased already (see `model::normalized_text`).
    pub fn is_match(&self, text: &str) -> bool {
        if self.keyword.is_empty() {
            return false;
        }
        match (&self.re, self.mode) {
            (Some(re), MatchMode::WholeWord) => re.is_match(text),
            _ => text.contains(self.keyword.as_str()),
        }
    }
}

/// An ordered list of rules sharing one match mode.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    rules: Vec<KeywordRule>,
}

impl KeywordSet {
    pub fn compile<S: AsRef<str>>(keywords: &[S], mode: MatchMode) -> anyhow::Result<Self> {
        let rules = keywords
            .iter()
            .map(|k| KeywordRule::new(k.as_ref(), mode))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Every keyword that matches, in configured order, each at most once.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.rules {
            if r.is_match(text) && !out.iter().any(|k| k == &r.keyword) {
                out.push(r.keyword.clone());
            }
        }
        out
    }

    /// First keyword (in configured order) that matches.
    pub fn find_first(&self, text: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.is_match(text))
            .map(|r| r.keyword.as_str())
    }

    pub fn any_match(&self, text: &str) -> bool {
        self.find_first(text).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_word_respects_boundaries() {
        let r = KeywordRule::new("rent", MatchMode::WholeWord).unwrap();
        assert!(r.is_match("rent is up again"));
        assert!(r.is_match("lagos rent."));
        assert!(!r.is_match("current prices"));
        assert!(!r.is_match("rented flats"));
    }

    #[test]
    fn substring_ignores_boundaries() {
        let r = KeywordRule::new("nsfw", MatchMode::Substring).unwrap();
        assert!(r.is_match("some nsfwesque clip"));
        assert!(!r.is_match("safe for work"));
    }

    #[test]
    fn phrases_and_metacharacters_are_escaped() {
        let phrase = KeywordRule::new("Real Estate", MatchMode::WholeWord).unwrap();
        assert_eq!(phrase.keyword, "real estate");
        assert!(phrase.is_match("lagos real estate boom"));
        assert!(!phrase.is_match("real-estate"));

        // no word boundary after a trailing `+`, so this keyword can never match
        let meta = KeywordRule::new("c++", MatchMode::WholeWord).unwrap();
        assert!(!meta.is_match("c++ code"));
        assert!(!meta.is_match("we use c++"));
        assert!(!meta.is_match("cccc"));
        let dotted = KeywordRule::new("u.s", MatchMode::WholeWord).unwrap();
        assert!(dotted.is_match("the u.s economy"));
        assert!(!dotted.is_match("the uxs economy"));
    }

    #[test]
    fn whole_word_is_case_insensitive() {
        let r = KeywordRule::new("cbn", MatchMode::WholeWord).unwrap();
        assert!(r.is_match("The CBN raised rates"));
    }

    #[test]
    fn find_all_counts_each_keyword_once() {
        let set = KeywordSet::compile(&["rent", "housing", "rent"], MatchMode::WholeWord).unwrap();
        let hits = set.find_all("rent rent rent and housing");
        assert_eq!(hits, vec!["rent".to_string(), "housing".to_string()]);
    }

    #[test]
    fn empty_keyword_never_matches() {
        let r = KeywordRule::new("   ", MatchMode::Substring).unwrap();
        assert!(!r.is_match("anything"));
    }
}
