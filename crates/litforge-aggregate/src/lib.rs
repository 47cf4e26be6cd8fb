//! litforge-aggregate — Multi-source search coordination.
//!
//! Owns the set of configured data sources and provides per-source fan-out
//! and aggregated, deduplicated, relevance-ranked search over them.

pub mod relevance;

use futures::future::join_all;
use litforge_sources::config::{build_source, SourceConfig};
use litforge_sources::models::{dedup_by_title, SearchResult};
use litforge_sources::{DataSource, SourceInfo};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Outcome of one source's search within a fan-out call. A failed source is
/// an explicit branch carrying the error text, rather than a swallowed
/// exception; callers decide to treat it as empty.
#[derive(Debug)]
pub enum SourceOutcome {
    Hits(Vec<SearchResult>),
    Failed(String),
}

impl SourceOutcome {
    pub fn hits(&self) -> &[SearchResult] {
        match self {
            SourceOutcome::Hits(hits) => hits,
            SourceOutcome::Failed(_) => &[],
        }
    }

    pub fn into_hits(self) -> Vec<SearchResult> {
        match self {
            SourceOutcome::Hits(hits) => hits,
            SourceOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed(_))
    }
}

/// Per-source result of a fan-out search. Every registered source gets a
/// report, failing ones included.
#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    pub outcome: SourceOutcome,
}

struct NamedSource {
    name: String,
    source: Box<dyn DataSource>,
}

/// Owns a registration-ordered collection of named data sources.
///
/// Registration order is significant: it decides which duplicate survives
/// aggregation when two sources return the same title.
#[derive(Default)]
pub struct MultiSourceManager {
    sources: Vec<NamedSource>,
}

impl MultiSourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager from ordered, named source configs. Entries that fail
    /// construction or validation are logged and skipped; a bad entry is
    /// never fatal to the rest.
    pub fn from_configs<I>(configs: I) -> Self
    where
        I: IntoIterator<Item = (String, SourceConfig)>,
    {
        let mut manager = Self::new();
        for (name, config) in configs {
            manager.add_source(&name, &config);
        }
        manager
    }

    /// Validate-then-register a source built from config. Returns whether
    /// the source was registered.
    pub fn add_source(&mut self, name: &str, config: &SourceConfig) -> bool {
        match build_source(config) {
            Ok(source) => self.add_boxed_source(name, source),
            Err(e) => {
                error!(source = name, error = %e, "failed to construct data source");
                false
            }
        }
    }

    /// Register an already-built source under a name. Re-registering an
    /// existing name replaces the instance but keeps its position, so dedup
    /// precedence is unchanged.
    pub fn add_boxed_source(&mut self, name: &str, source: Box<dyn DataSource>) -> bool {
        if !source.validate_config() {
            warn!(source = name, "invalid source configuration, skipping");
            return false;
        }
        if let Some(existing) = self.sources.iter_mut().find(|s| s.name == name) {
            existing.source = source;
        } else {
            self.sources.push(NamedSource {
                name: name.to_string(),
                source,
            });
        }
        info!(source = name, "registered data source");
        true
    }

    /// Remove a source by name. Returns whether anything was removed.
    pub fn remove_source(&mut self, name: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.name != name);
        if self.sources.len() < before {
            info!(source = name, "removed data source");
            true
        } else {
            warn!(source = name, "no such data source to remove");
            false
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Registered source names, in registration order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Diagnostic descriptions of all registered sources.
    pub fn available_sources(&self) -> Vec<SourceInfo> {
        self.sources.iter().map(|s| s.source.source_info()).collect()
    }

    /// Fan one query out to every registered source concurrently. A failing
    /// source yields an explicit [`SourceOutcome::Failed`] entry and never
    /// cancels or corrupts the others. Reports come back in registration
    /// order.
    pub async fn search_all(&self, query: &str, limit_per_source: usize) -> Vec<SourceReport> {
        let searches = self.sources.iter().map(|named| async move {
            let outcome = match named.source.search(query, limit_per_source).await {
                Ok(hits) => SourceOutcome::Hits(hits),
                Err(e) => {
                    error!(source = %named.name, error = %e, "source search failed");
                    SourceOutcome::Failed(e.to_string())
                }
            };
            SourceReport {
                name: named.name.clone(),
                outcome,
            }
        });
        join_all(searches).await
    }

    /// Aggregated search: fan out, merge, deduplicate by title (first
    /// occurrence in registration order wins), rank by relevance, truncate
    /// to `total_limit`. Each surviving result's metadata carries the
    /// contributing source's registered name under "data_source".
    pub async fn search_aggregated(&self, query: &str, total_limit: usize) -> Vec<SearchResult> {
        if self.sources.is_empty() {
            return Vec::new();
        }
        let limit_per_source = std::cmp::max(1, total_limit / self.sources.len());
        let reports = self.search_all(query, limit_per_source).await;

        let mut merged = Vec::new();
        for report in reports {
            let name = report.name;
            for mut hit in report.outcome.into_hits() {
                hit.metadata
                    .insert("data_source".into(), Value::String(name.clone()));
                merged.push(hit);
            }
        }

        let mut unique = dedup_by_title(merged);
        relevance::rank_by_relevance(&mut unique, query);
        unique.truncate(total_limit);
        unique
    }

    /// Fetch one item from the named source. Unknown names and underlying
    /// failures both resolve to `None` (failures are logged).
    pub async fn get_by_id(&self, source_name: &str, id: &str) -> Option<SearchResult> {
        let named = self.sources.iter().find(|s| s.name == source_name)?;
        match named.source.get_by_id(id).await {
            Ok(hit) => hit,
            Err(e) => {
                error!(source = source_name, id, error = %e, "get_by_id failed");
                None
            }
        }
    }

    /// Probe every source; any failure counts as unhealthy.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let probes = self.sources.iter().map(|named| async move {
            (named.name.clone(), named.source.health_check().await)
        });
        join_all(probes).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litforge_common::{LitforgeError, Result};
    use litforge_sources::models::SearchResult;

    struct StubSource {
        tag: &'static str,
        results: Vec<SearchResult>,
        fail: bool,
    }

    impl StubSource {
        fn with_titles(tag: &'static str, titles: &[&str]) -> Box<Self> {
            let results = titles
                .iter()
                .map(|t| SearchResult::new(*t, tag))
                .collect();
            Box::new(Self {
                tag,
                results,
                fail: false,
            })
        }

        fn failing(tag: &'static str) -> Box<Self> {
            Box::new(Self {
                tag,
                results: Vec::new(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl DataSource for StubSource {
        fn name(&self) -> &str {
            self.tag
        }

        fn kind(&self) -> &str {
            "stub"
        }

        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchResult>> {
            if self.fail {
                return Err(LitforgeError::Config("stub failure".to_string()));
            }
            Ok(self.results.iter().take(limit).cloned().collect())
        }

        async fn get_by_id(&self, id: &str) -> Result<Option<SearchResult>> {
            if self.fail {
                return Err(LitforgeError::Config("stub failure".to_string()));
            }
            Ok(self.results.iter().find(|r| r.title == id).cloned())
        }

        fn validate_config(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_empty_manager_aggregates_to_empty() {
        let manager = MultiSourceManager::new();
        assert_eq!(manager.source_count(), 0);
        let hits = manager.search_aggregated("x", 10).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_limit_invariant() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("a", StubSource::with_titles("a", &["t1", "t2", "t3", "t4"]));
        manager.add_boxed_source("b", StubSource::with_titles("b", &["u1", "u2", "u3", "u4"]));

        for limit in [0usize, 1, 3, 10, 100] {
            let hits = manager.search_aggregated("q", limit).await;
            assert!(hits.len() <= limit, "limit {} violated: {}", limit, hits.len());
        }
    }

    #[tokio::test]
    async fn test_overlapping_titles_first_registered_wins() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("A", StubSource::with_titles("A", &["Deep Learning Survey"]));
        manager.add_boxed_source("B", StubSource::with_titles("B", &["deep learning survey "]));

        let hits = manager.search_aggregated("deep learning", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data_source(), "A");
        assert_eq!(hits[0].title, "Deep Learning Survey");
    }

    #[tokio::test]
    async fn test_dedup_is_deterministic_across_runs() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("first", StubSource::with_titles("first", &["Shared Title"]));
        manager.add_boxed_source("second", StubSource::with_titles("second", &["shared title"]));

        let run1 = manager.search_aggregated("shared", 10).await;
        let run2 = manager.search_aggregated("shared", 10).await;
        assert_eq!(run1.len(), 1);
        assert_eq!(run1[0].data_source(), "first");
        assert_eq!(run2[0].data_source(), "first");
    }

    #[tokio::test]
    async fn test_per_source_isolation() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("broken", StubSource::failing("broken"));
        manager.add_boxed_source("healthy", StubSource::with_titles("healthy", &["paper"]));

        let reports = manager.search_all("q", 5).await;
        assert_eq!(reports.len(), 2);

        let broken = reports.iter().find(|r| r.name == "broken").unwrap();
        assert!(broken.outcome.is_failed());
        assert!(broken.outcome.hits().is_empty());

        let healthy = reports.iter().find(|r| r.name == "healthy").unwrap();
        assert_eq!(healthy.outcome.hits().len(), 1);

        // The failing source does not poison aggregation either.
        let hits = manager.search_aggregated("paper", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data_source(), "healthy");
    }

    #[tokio::test]
    async fn test_title_match_ranks_first() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source(
            "s",
            StubSource::with_titles("s", &["background reading", "graph transformers at scale"]),
        );

        let hits = manager.search_aggregated("graph transformers", 10).await;
        assert_eq!(hits[0].title, "graph transformers at scale");
    }

    #[tokio::test]
    async fn test_get_by_id_unknown_source_and_failures_are_absent() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("ok", StubSource::with_titles("ok", &["target"]));
        manager.add_boxed_source("broken", StubSource::failing("broken"));

        assert!(manager.get_by_id("nope", "target").await.is_none());
        assert!(manager.get_by_id("broken", "target").await.is_none());
        let hit = manager.get_by_id("ok", "target").await;
        assert_eq!(hit.unwrap().title, "target");
    }

    #[tokio::test]
    async fn test_health_check_marks_failing_source() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("up", StubSource::with_titles("up", &[]));
        manager.add_boxed_source("down", StubSource::failing("down"));

        let health = manager.health_check().await;
        assert_eq!(health.get("up"), Some(&true));
        assert_eq!(health.get("down"), Some(&false));
    }

    #[tokio::test]
    async fn test_add_remove_and_replace() {
        let mut manager = MultiSourceManager::new();
        assert!(manager.add_boxed_source("a", StubSource::with_titles("a", &["old"])));
        assert!(manager.add_boxed_source("b", StubSource::with_titles("b", &["b1"])));
        assert_eq!(manager.source_names(), vec!["a", "b"]);

        // Replacing keeps position.
        assert!(manager.add_boxed_source("a", StubSource::with_titles("a", &["new"])));
        assert_eq!(manager.source_names(), vec!["a", "b"]);
        let hit = manager.get_by_id("a", "new").await;
        assert!(hit.is_some());

        assert!(manager.remove_source("a"));
        assert!(!manager.remove_source("a"));
        assert_eq!(manager.source_names(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_empty_titles_do_not_aggregate() {
        let mut manager = MultiSourceManager::new();
        manager.add_boxed_source("s", StubSource::with_titles("s", &["", "  ", "real title"]));

        let hits = manager.search_aggregated("real", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "real title");
    }
}
