//! Data models shared by all source adapters.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One normalized literature hit from any source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub url: String,
    /// Which adapter produced this hit (e.g. "arxiv", "zotero").
    pub source: String,
    pub publication_date: Option<NaiveDate>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Adapter-specific extras. After aggregation, carries the registered
    /// name of the contributing source under "data_source".
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            abstract_text: String::new(),
            url: String::new(),
            source: source.into(),
            publication_date: None,
            journal: None,
            doi: None,
            citation_count: None,
            keywords: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Deduplication key: the lower-cased, trimmed title. Empty titles are
    /// degenerate and yield `None` so they never enter a seen-set.
    pub fn title_key(&self) -> Option<String> {
        let key = self.title.trim().to_lowercase();
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    /// The aggregation-level source name when present, falling back to the
    /// adapter's own tag.
    pub fn data_source(&self) -> &str {
        self.metadata
            .get("data_source")
            .and_then(Value::as_str)
            .unwrap_or(&self.source)
    }
}

/// Drop results whose title was already seen (lower-cased, trimmed; first
/// occurrence wins). Results with an empty title are dropped outright.
pub fn dedup_by_title(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::new();
    results
        .into_iter()
        .filter(|r| match r.title_key() {
            Some(key) => seen.insert(key),
            None => false,
        })
        .collect()
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Parse a timestamp string from an external API into a date.
///
/// Accepts plain dates and a couple of known ISO datetime shapes; as a last
/// resort extracts a bare 4-digit year (mapped to January 1st). Returns
/// `None` when nothing matches.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S%.fZ"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    YEAR_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
}
