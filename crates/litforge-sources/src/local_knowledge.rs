//! Local knowledge-base adapter.
//!
//! Thin wrapper exposing a local retrieval component (RAG-style semantic
//! search) through the [`DataSource`] contract. The retrieval internals are
//! a collaborator behind [`KnowledgeRetriever`]; this adapter only converts
//! retrieved chunks into search results.

use async_trait::async_trait;
use litforge_common::Result;
use once_cell::sync::OnceCell;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::LocalKnowledgeConfig;
use crate::models::SearchResult;
use crate::DataSource;

/// Abstract prefixes longer than this many characters are truncated.
const ABSTRACT_PREFIX_CHARS: usize = 500;

/// One raw hit from the underlying retriever.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub metadata: Map<String, Value>,
}

/// Black-box search oracle over a local knowledge base. Implementations may
/// wrap a vector store, an inverted index, or anything else that answers
/// free-text queries.
pub trait KnowledgeRetriever: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<RetrievedChunk>>;

    /// Optional capability; the default reports "unsupported".
    fn get_by_id(&self, _id: &str) -> anyhow::Result<Option<RetrievedChunk>> {
        Ok(None)
    }

    /// Optional capability; returns false when the backend cannot ingest.
    fn add_document(&self, _content: &str, _metadata: Map<String, Value>) -> anyhow::Result<bool> {
        Ok(false)
    }
}

type RetrieverFactory = Box<dyn Fn() -> anyhow::Result<Arc<dyn KnowledgeRetriever>> + Send + Sync>;

pub struct LocalKnowledgeSource {
    config: LocalKnowledgeConfig,
    factory: RetrieverFactory,
    // Constructed at most once; a failed construction is remembered as None.
    retriever: OnceCell<Option<Arc<dyn KnowledgeRetriever>>>,
}

impl LocalKnowledgeSource {
    /// Config-only construction. Without a wired retriever backend every
    /// search resolves to empty results (logged once at first use).
    pub fn new(config: LocalKnowledgeConfig) -> Self {
        Self {
            config,
            factory: Box::new(|| {
                anyhow::bail!("no knowledge retriever backend wired for this source")
            }),
            retriever: OnceCell::new(),
        }
    }

    /// Construction with an already-built retrieval oracle.
    pub fn with_retriever(
        config: LocalKnowledgeConfig,
        retriever: Arc<dyn KnowledgeRetriever>,
    ) -> Self {
        Self::with_factory(config, move || Ok(Arc::clone(&retriever)))
    }

    /// Construction with a deferred factory; the retriever is built lazily
    /// on first use and memoized.
    pub fn with_factory<F>(config: LocalKnowledgeConfig, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn KnowledgeRetriever>> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            retriever: OnceCell::new(),
        }
    }

    fn retriever(&self) -> Option<&Arc<dyn KnowledgeRetriever>> {
        self.retriever
            .get_or_init(|| match (self.factory)() {
                Ok(retriever) => Some(retriever),
                Err(e) => {
                    warn!(error = %e, "knowledge retriever construction failed");
                    None
                }
            })
            .as_ref()
    }

    /// Ingest a document into the knowledge base, when the backend supports
    /// it.
    pub fn add_document(&self, content: &str, metadata: Map<String, Value>) -> bool {
        let Some(retriever) = self.retriever() else {
            return false;
        };
        match retriever.add_document(content, metadata) {
            Ok(added) => added,
            Err(e) => {
                warn!(error = %e, "failed to add document to knowledge base");
                false
            }
        }
    }

    fn chunk_to_result(&self, chunk: RetrievedChunk) -> SearchResult {
        // The first content line doubles as the title; the abstract is a
        // bounded prefix of the whole chunk.
        let title = chunk.content.lines().next().unwrap_or("").trim().to_string();
        let abstract_text = truncate_chars(&chunk.content, ABSTRACT_PREFIX_CHARS);

        let mut result = SearchResult::new(title, "local_knowledge");
        result.abstract_text = abstract_text;
        result.authors = authors_from_metadata(&chunk.metadata);
        result.url = chunk
            .metadata
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let source_file = chunk
            .metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("");
        result
            .metadata
            .insert("source_file".into(), json!(source_file));
        result.metadata.insert("score".into(), json!(chunk.score));
        result.metadata.insert("chunk_id".into(), json!(chunk.id));
        for (key, value) in chunk.metadata {
            result.metadata.entry(key).or_insert(value);
        }
        result
    }
}

#[async_trait]
impl DataSource for LocalKnowledgeSource {
    fn name(&self) -> &str {
        "local_knowledge"
    }

    fn kind(&self) -> &str {
        "vector_database"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let Some(retriever) = self.retriever() else {
            return Ok(Vec::new());
        };

        let top_k = limit.min(self.config.top_k);
        match retriever.search(query, top_k) {
            Ok(chunks) => {
                debug!(count = chunks.len(), "local knowledge search returned chunks");
                Ok(chunks
                    .into_iter()
                    .map(|chunk| self.chunk_to_result(chunk))
                    .collect())
            }
            Err(e) => {
                warn!(error = %e, "local knowledge search failed");
                Ok(Vec::new())
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SearchResult>> {
        let Some(retriever) = self.retriever() else {
            return Ok(None);
        };
        match retriever.get_by_id(id) {
            Ok(chunk) => Ok(chunk.map(|c| self.chunk_to_result(c))),
            Err(e) => {
                warn!(error = %e, "local knowledge lookup failed");
                Ok(None)
            }
        }
    }

    /// The configured knowledge-base path must exist on disk.
    fn validate_config(&self) -> bool {
        self.config.knowledge_base_path.exists()
    }
}

/// In-memory retriever for tests and small fixed corpora: naive
/// case-insensitive substring matching over whole chunks.
pub struct InMemoryRetriever {
    chunks: Vec<RetrievedChunk>,
}

impl InMemoryRetriever {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }
}

impl KnowledgeRetriever for InMemoryRetriever {
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<RetrievedChunk>> {
        let needle = query.to_lowercase();
        Ok(self
            .chunks
            .iter()
            .filter(|c| c.content.to_lowercase().contains(&needle))
            .take(top_k)
            .cloned()
            .collect())
    }

    fn get_by_id(&self, id: &str) -> anyhow::Result<Option<RetrievedChunk>> {
        Ok(self.chunks.iter().find(|c| c.id == id).cloned())
    }
}

fn authors_from_metadata(metadata: &Map<String, Value>) -> Vec<String> {
    match metadata.get("authors") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let prefix: String = s.chars().take(max).collect();
        format!("{}...", prefix)
    } else {
        s.to_string()
    }
}
