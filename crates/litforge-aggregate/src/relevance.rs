//! Cross-source aggregate ranking.
//!
//! This is the manager-level ordering applied after merging all sources.
//! It is deliberately separate from any adapter-local ordering (e.g. the
//! web-search adapter's citation-count sort): the two operate at different
//! scopes and have independent contracts.

use litforge_sources::models::SearchResult;
use std::cmp::Ordering;

/// Per-source multipliers applied to the substring-match score. Sources not
/// listed here rank with the default weight.
pub const SOURCE_WEIGHTS: &[(&str, f64)] = &[
    ("web_search", 1.0),
    ("zotero", 1.1),
    ("local_knowledge", 1.2),
];

const DEFAULT_SOURCE_WEIGHT: f64 = 1.0;
const TITLE_MATCH_WEIGHT: f64 = 2.0;
const ABSTRACT_MATCH_WEIGHT: f64 = 1.0;
const AUTHOR_MATCH_WEIGHT: f64 = 0.5;

pub fn source_weight(name: &str) -> f64 {
    SOURCE_WEIGHTS
        .iter()
        .find(|(source, _)| *source == name)
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_SOURCE_WEIGHT)
}

/// Heuristic relevance of a result for a query: case-insensitive substring
/// matches in the title (2.0), abstract (1.0), and each author (0.5 apiece),
/// multiplied by the contributing source's weight.
pub fn relevance_score(result: &SearchResult, query: &str) -> f64 {
    let needle = query.to_lowercase();
    let mut score = 0.0;

    if result.title.to_lowercase().contains(&needle) {
        score += TITLE_MATCH_WEIGHT;
    }
    if !result.abstract_text.is_empty() && result.abstract_text.to_lowercase().contains(&needle) {
        score += ABSTRACT_MATCH_WEIGHT;
    }
    for author in &result.authors {
        if author.to_lowercase().contains(&needle) {
            score += AUTHOR_MATCH_WEIGHT;
        }
    }

    score * source_weight(result.data_source())
}

/// Sort results by relevance score descending. The sort is stable, so
/// equal-score ties keep their prior (registration/source) order.
pub fn rank_by_relevance(results: &mut [SearchResult], query: &str) {
    results.sort_by(|a, b| {
        relevance_score(b, query)
            .partial_cmp(&relevance_score(a, query))
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(title: &str, source: &str) -> SearchResult {
        let mut r = SearchResult::new(title, source);
        r.metadata.insert("data_source".into(), json!(source));
        r
    }

    #[test]
    fn test_source_weight_table() {
        assert_eq!(source_weight("web_search"), 1.0);
        assert_eq!(source_weight("zotero"), 1.1);
        assert_eq!(source_weight("local_knowledge"), 1.2);
        assert_eq!(source_weight("somewhere_else"), 1.0);
    }

    #[test]
    fn test_title_match_outranks_no_match() {
        let matching = result("graph neural networks in biology", "web_search");
        let other = result("unrelated topic", "web_search");
        assert!(
            relevance_score(&matching, "graph neural networks")
                > relevance_score(&other, "graph neural networks")
        );
    }

    #[test]
    fn test_component_weights_sum() {
        let mut r = result("Query term in title", "web_search");
        r.abstract_text = "the query term appears here too".to_string();
        r.authors = vec!["Query Term Fan".to_string(), "Someone Else".to_string()];
        // title 2.0 + abstract 1.0 + one author 0.5, weight 1.0
        assert!((relevance_score(&r, "query term") - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_source_multiplier_applies() {
        let web = result("query in title", "web_search");
        let local = result("query in title", "local_knowledge");
        let score_web = relevance_score(&web, "query");
        let score_local = relevance_score(&local, "query");
        assert!((score_local / score_web - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_stable_sort_keeps_tie_order() {
        let mut results = vec![
            result("no match one", "web_search"),
            result("no match two", "web_search"),
            result("query hit", "web_search"),
        ];
        rank_by_relevance(&mut results, "query");
        assert_eq!(results[0].title, "query hit");
        assert_eq!(results[1].title, "no match one");
        assert_eq!(results[2].title, "no match two");
    }
}
