//! Academic web-search adapter.
//!
//! Fans out one query to several external search backends under a shared
//! timeout-and-retry configuration and merges their results:
//!   Semantic Scholar: https://api.semanticscholar.org/graph/v1/paper/search
//!   arXiv (Atom):     http://export.arxiv.org/api/query
//!   CrossRef:         https://api.crossref.org/works

use async_trait::async_trait;
use litforge_common::{LitforgeError, Result, SandboxClient};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::WebSearchConfig;
use crate::models::{dedup_by_title, parse_date, SearchResult};
use crate::DataSource;

const S2_SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const S2_PAPER_URL: &str = "https://api.semanticscholar.org/graph/v1/paper";
const ARXIV_QUERY_URL: &str = "http://export.arxiv.org/api/query";
const CROSSREF_WORKS_URL: &str = "https://api.crossref.org/works";

const S2_FIELDS: &str =
    "title,authors,abstract,url,publicationDate,journal,citationCount,externalIds";
// Polite pool: set User-Agent with mailto (see CrossRef etiquette)
const USER_AGENT: &str = "Litforge/0.1 (mailto:litforge@example.com)";

pub struct WebSearchSource {
    client: SandboxClient,
    config: WebSearchConfig,
}

impl WebSearchSource {
    pub fn new(config: WebSearchConfig) -> Result<Self> {
        let client = SandboxClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { client, config })
    }

    fn enabled_backends(&self) -> usize {
        [
            self.config.semantic_scholar_enabled,
            self.config.arxiv_enabled,
            self.config.crossref_enabled,
        ]
        .iter()
        .filter(|on| **on)
        .count()
    }

    /// GET with up to `max_retries` attempts on transport errors. A non-2xx
    /// response is an immediate error, not retried.
    async fn get_with_retry(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = self
                .client
                .get(url)?
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .query(params);
            match request.send().await {
                Ok(resp) => return Ok(resp.error_for_status()?),
                Err(e) if attempt < attempts => {
                    warn!(url, attempt, error = %e, "request failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    #[instrument(skip(self))]
    async fn search_semantic_scholar(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let params = [
            ("query", query.to_string()),
            ("limit", limit.to_string()),
            ("fields", S2_FIELDS.to_string()),
        ];
        let resp: Value = self
            .get_with_retry(S2_SEARCH_URL, &params)
            .await?
            .json()
            .await?;

        let items = resp["data"].as_array().cloned().unwrap_or_default();
        debug!(count = items.len(), "Semantic Scholar search returned results");
        Ok(parse_s2_items(&items))
    }

    #[instrument(skip(self))]
    async fn search_arxiv(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let params = [
            ("search_query", format!("all:{}", query)),
            ("start", "0".to_string()),
            ("max_results", limit.to_string()),
        ];
        let xml = self
            .get_with_retry(ARXIV_QUERY_URL, &params)
            .await?
            .text()
            .await?;

        let papers = parse_arxiv_feed(&xml)?;
        debug!(count = papers.len(), "arXiv search returned results");
        Ok(papers)
    }

    #[instrument(skip(self))]
    async fn search_crossref(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let params = [
            ("query", query.to_string()),
            ("rows", limit.to_string()),
        ];
        let resp: Value = self
            .get_with_retry(CROSSREF_WORKS_URL, &params)
            .await?
            .json()
            .await?;

        let items = resp["message"]["items"].as_array().cloned().unwrap_or_default();
        debug!(count = items.len(), "CrossRef search returned results");
        Ok(parse_crossref_items(&items))
    }

    async fn get_arxiv_by_id(&self, arxiv_id: &str) -> Result<Option<SearchResult>> {
        let params = [
            ("id_list", arxiv_id.to_string()),
            ("max_results", "1".to_string()),
        ];
        let resp = self.client.get(ARXIV_QUERY_URL)?.query(&params).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let xml = resp.text().await?;
        Ok(parse_arxiv_feed(&xml)?.into_iter().next())
    }

    async fn get_crossref_by_doi(&self, doi: &str) -> Result<Option<SearchResult>> {
        let url = format!("{}/{}", CROSSREF_WORKS_URL, doi);
        let resp = self
            .client
            .get(&url)?
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: Value = resp.json().await?;
        Ok(parse_crossref_items(std::slice::from_ref(&body["message"]))
            .into_iter()
            .next())
    }

    async fn get_semantic_scholar_by_id(&self, paper_id: &str) -> Result<Option<SearchResult>> {
        let url = format!("{}/{}", S2_PAPER_URL, paper_id);
        let resp = self
            .client
            .get(&url)?
            .query(&[("fields", S2_FIELDS)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: Value = resp.json().await?;
        Ok(parse_s2_items(std::slice::from_ref(&body)).into_iter().next())
    }
}

#[async_trait]
impl DataSource for WebSearchSource {
    fn name(&self) -> &str {
        "web_search"
    }

    fn kind(&self) -> &str {
        "academic_search"
    }

    /// The requested limit is split evenly across enabled backends (integer
    /// division). A failing backend contributes zero results and never
    /// aborts the others.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let enabled = self.enabled_backends();
        if enabled == 0 {
            return Ok(Vec::new());
        }
        let per_backend = limit / enabled;

        let s2 = async {
            if !self.config.semantic_scholar_enabled {
                return Vec::new();
            }
            match self.search_semantic_scholar(query, per_backend).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(backend = "semantic_scholar", error = %e, "backend search failed");
                    Vec::new()
                }
            }
        };
        let arxiv = async {
            if !self.config.arxiv_enabled {
                return Vec::new();
            }
            match self.search_arxiv(query, per_backend).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(backend = "arxiv", error = %e, "backend search failed");
                    Vec::new()
                }
            }
        };
        let crossref = async {
            if !self.config.crossref_enabled {
                return Vec::new();
            }
            match self.search_crossref(query, per_backend).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(backend = "crossref", error = %e, "backend search failed");
                    Vec::new()
                }
            }
        };

        let (mut merged, arxiv_hits, crossref_hits) = tokio::join!(s2, arxiv, crossref);
        merged.extend(arxiv_hits);
        merged.extend(crossref_hits);

        let mut unique = dedup_by_title(merged);
        rank_by_citations(&mut unique);
        unique.truncate(limit);
        Ok(unique)
    }

    /// Dispatches on a string-prefixed ID scheme: `arxiv:<id>`, `doi:<doi>`,
    /// `s2:<paper_id>`. Unrecognised prefixes resolve to `None`.
    async fn get_by_id(&self, id: &str) -> Result<Option<SearchResult>> {
        if let Some(arxiv_id) = id.strip_prefix("arxiv:") {
            self.get_arxiv_by_id(arxiv_id).await
        } else if let Some(doi) = id.strip_prefix("doi:") {
            self.get_crossref_by_doi(doi).await
        } else if let Some(paper_id) = id.strip_prefix("s2:") {
            self.get_semantic_scholar_by_id(paper_id).await
        } else {
            Ok(None)
        }
    }

    fn validate_config(&self) -> bool {
        self.config.timeout_secs > 0 && self.config.max_retries > 0
    }
}

/// Adapter-local ordering: merged backend results sorted by citation count
/// descending, missing counts treated as zero. Independent of the manager's
/// cross-source relevance ranking.
pub fn rank_by_citations(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.citation_count
            .unwrap_or(0)
            .cmp(&a.citation_count.unwrap_or(0))
    });
}

/// Parse Semantic Scholar paper objects. Items without a usable title are
/// skipped, not fatal for the batch.
fn parse_s2_items(items: &[Value]) -> Vec<SearchResult> {
    items
        .iter()
        .filter_map(|item| {
            let title = item["title"].as_str().unwrap_or("").trim().to_string();
            if title.is_empty() {
                debug!("skipping Semantic Scholar item without title");
                return None;
            }

            let mut result = SearchResult::new(title, "semantic_scholar");
            result.authors = item["authors"]
                .as_array()
                .map(|authors| {
                    authors
                        .iter()
                        .filter_map(|a| a["name"].as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            result.abstract_text = item["abstract"].as_str().unwrap_or("").to_string();
            result.url = item["url"].as_str().unwrap_or("").to_string();
            result.publication_date = item["publicationDate"].as_str().and_then(parse_date);
            result.journal = item["journal"]["name"].as_str().map(String::from);
            result.citation_count = item["citationCount"].as_u64();
            if let Some(s2_id) = item["paperId"].as_str() {
                result.metadata.insert("s2_id".into(), json!(s2_id));
            }
            if item["externalIds"].is_object() {
                result
                    .metadata
                    .insert("external_ids".into(), item["externalIds"].clone());
            }
            Some(result)
        })
        .collect()
}

/// Parse CrossRef work objects. Per-item failures skip the item.
fn parse_crossref_items(items: &[Value]) -> Vec<SearchResult> {
    items
        .iter()
        .filter_map(|item| {
            let title = item["title"][0].as_str().unwrap_or("").trim().to_string();
            if title.is_empty() {
                debug!("skipping CrossRef item without title");
                return None;
            }

            let doi = item["DOI"].as_str().unwrap_or("").to_string();

            let mut result = SearchResult::new(title, "crossref");
            result.authors = item["author"]
                .as_array()
                .map(|authors| {
                    authors
                        .iter()
                        .filter_map(|a| {
                            let given = a["given"].as_str().unwrap_or("");
                            let family = a["family"].as_str().unwrap_or("");
                            let name = format!("{} {}", given, family).trim().to_string();
                            if name.is_empty() {
                                None
                            } else {
                                Some(name)
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            result.abstract_text = item["abstract"].as_str().unwrap_or("").to_string();
            result.url = if doi.is_empty() {
                String::new()
            } else {
                format!("https://doi.org/{}", doi)
            };
            result.publication_date = crossref_date(item);
            result.journal = item["container-title"][0].as_str().map(String::from);
            result.doi = if doi.is_empty() { None } else { Some(doi) };
            if let Some(work_type) = item["type"].as_str() {
                result.metadata.insert("type".into(), json!(work_type));
            }
            if let Some(publisher) = item["publisher"].as_str() {
                result.metadata.insert("publisher".into(), json!(publisher));
            }
            Some(result)
        })
        .collect()
}

/// CrossRef encodes dates as `date-parts: [[y, m, d]]`, with print dates
/// preferred over online ones. Missing month/day default to January 1st.
fn crossref_date(item: &Value) -> Option<chrono::NaiveDate> {
    let parts = item["published-print"]["date-parts"][0]
        .as_array()
        .or_else(|| item["published-online"]["date-parts"][0].as_array())?;
    let year = parts.first()?.as_i64()? as i32;
    let month = parts.get(1).and_then(Value::as_u64).unwrap_or(1) as u32;
    let day = parts.get(2).and_then(Value::as_u64).unwrap_or(1) as u32;
    chrono::NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an arXiv Atom feed into search results.
/// Handles the `<feed><entry>` structure; entries with an empty title are
/// skipped.
fn parse_arxiv_feed(xml: &str) -> Result<Vec<SearchResult>> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // State machine for XML parsing
    let mut in_entry = false;
    let mut in_title = false;
    let mut in_summary = false;
    let mut in_author = false;
    let mut in_name = false;
    let mut in_id = false;
    let mut in_published = false;
    let mut title = String::new();
    let mut summary = String::new();
    let mut id_text = String::new();
    let mut published = String::new();
    let mut authors: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    title.clear();
                    summary.clear();
                    id_text.clear();
                    published.clear();
                    authors.clear();
                }
                b"title" if in_entry => in_title = true,
                b"summary" if in_entry => in_summary = true,
                b"author" if in_entry => in_author = true,
                b"name" if in_author => in_name = true,
                b"id" if in_entry => in_id = true,
                b"published" if in_entry => in_published = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_title {
                    title.push_str(&text);
                } else if in_summary {
                    summary.push_str(&text);
                } else if in_name {
                    authors.push(text);
                } else if in_id {
                    id_text.push_str(&text);
                } else if in_published {
                    published.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"title" => in_title = false,
                b"summary" => in_summary = false,
                b"author" => in_author = false,
                b"name" => in_name = false,
                b"id" => in_id = false,
                b"published" => in_published = false,
                b"entry" => {
                    in_entry = false;
                    let title = title.trim().to_string();
                    if title.is_empty() {
                        warn!("Skipping arXiv entry with empty title");
                    } else {
                        // The Atom <id> is a URL; the arXiv id is its tail.
                        let arxiv_id = id_text
                            .rsplit('/')
                            .next()
                            .unwrap_or_default()
                            .to_string();
                        let mut result = SearchResult::new(title, "arxiv");
                        result.authors = authors.clone();
                        result.abstract_text = summary.trim().to_string();
                        result.url = if arxiv_id.is_empty() {
                            id_text.clone()
                        } else {
                            format!("https://arxiv.org/abs/{}", arxiv_id)
                        };
                        result.publication_date = parse_date(&published);
                        if !arxiv_id.is_empty() {
                            result.metadata.insert("arxiv_id".into(), json!(arxiv_id));
                        }
                        papers.push(result);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(LitforgeError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(papers)
}
