//! litforge-sources — Literature data source adapters.
//!
//! Each adapter normalizes one external or local system (academic search
//! APIs, a Zotero library, a local knowledge base) into [`models::SearchResult`].

pub mod config;
pub mod local_knowledge;
pub mod models;
pub mod web_search;
pub mod zotero;

use async_trait::async_trait;
use litforge_common::Result;
use serde::Serialize;

use crate::models::SearchResult;

/// Common interface for all literature data sources.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Source tag stamped on every result produced by this adapter
    /// (e.g. "web_search", "zotero", "local_knowledge").
    fn name(&self) -> &str;

    /// Kind label for diagnostics (e.g. "academic_search", "bibliography_manager").
    fn kind(&self) -> &str;

    /// Search for literature matching a query. An ordinary "no results"
    /// condition is `Ok(vec![])`; `Err` is reserved for transport,
    /// authentication, or systemic failures.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Fetch a single item by its source-scoped ID. `Ok(None)` when the
    /// item does not exist or the ID scheme is not recognised.
    async fn get_by_id(&self, id: &str) -> Result<Option<SearchResult>>;

    /// Pure configuration check. No network I/O; may check local file
    /// existence.
    fn validate_config(&self) -> bool;

    /// Probe the source with a trivial limit-1 search. Any failure is
    /// logged and reported as unhealthy, never propagated.
    async fn health_check(&self) -> bool {
        match self.search("test", 1).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "health check failed");
                false
            }
        }
    }

    /// Diagnostic description of this source.
    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name().to_string(),
            kind: self.kind().to_string(),
            configured: self.validate_config(),
        }
    }
}

/// Diagnostic summary of a configured source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: String,
    pub configured: bool,
}
