//! Zotero bibliography adapter.
//!
//! Queries a personal or group Zotero library through the web API.
//! Endpoint: https://api.zotero.org/{users|groups}/{id}/items

use async_trait::async_trait;
use litforge_common::{Result, SandboxClient};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::ZoteroConfig;
use crate::models::SearchResult;
use crate::DataSource;

const ZOTERO_API_BASE: &str = "https://api.zotero.org";
const USER_AGENT: &str = "Litforge/0.1 (mailto:litforge@example.com)";

pub struct ZoteroSource {
    client: SandboxClient,
    config: ZoteroConfig,
}

impl ZoteroSource {
    pub fn new(config: ZoteroConfig) -> Result<Self> {
        let client = SandboxClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { client, config })
    }

    /// Library items endpoint: personal when a user id is set, group
    /// otherwise.
    fn items_url(&self) -> Option<String> {
        if let Some(user_id) = &self.config.user_id {
            Some(format!("{}/users/{}/items", ZOTERO_API_BASE, user_id))
        } else {
            self.config
                .group_id
                .as_ref()
                .map(|group_id| format!("{}/groups/{}/items", ZOTERO_API_BASE, group_id))
        }
    }

    fn get(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .client
            .get(url)?
            .header("Zotero-API-Key", &self.config.api_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT))
    }
}

#[async_trait]
impl DataSource for ZoteroSource {
    fn name(&self) -> &str {
        "zotero"
    }

    fn kind(&self) -> &str {
        "bibliography_manager"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if !self.validate_config() {
            return Ok(Vec::new());
        }
        let url = match self.items_url() {
            Some(url) => url,
            None => return Ok(Vec::new()),
        };

        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("format", "json".to_string()),
            ("include", "data".to_string()),
        ];
        let resp = self.get(&url)?.query(&params).send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Zotero API error");
            return Ok(Vec::new());
        }

        let items: Vec<Value> = resp.json().await?;
        debug!(count = items.len(), "Zotero search returned items");
        Ok(parse_zotero_items(&items))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SearchResult>> {
        if !self.validate_config() {
            return Ok(None);
        }
        let url = match self.items_url() {
            Some(url) => format!("{}/{}", url, id),
            None => return Ok(None),
        };

        let resp = self.get(&url)?.send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let item: Value = resp.json().await?;
        Ok(parse_zotero_items(std::slice::from_ref(&item))
            .into_iter()
            .next())
    }

    /// Requires an API key and at least one of user id / group id.
    fn validate_config(&self) -> bool {
        if self.config.api_key.is_empty() {
            return false;
        }
        self.config.user_id.is_some() || self.config.group_id.is_some()
    }
}

/// Parse Zotero API items into search results. Per-item failures skip the
/// item, not the batch.
fn parse_zotero_items(items: &[Value]) -> Vec<SearchResult> {
    items
        .iter()
        .filter_map(|item| {
            let data = &item["data"];
            if !data.is_object() {
                debug!("skipping Zotero item without data payload");
                return None;
            }

            let title = data["title"].as_str().unwrap_or("").to_string();
            let mut result = SearchResult::new(title, "zotero");
            result.abstract_text = data["abstractNote"].as_str().unwrap_or("").to_string();
            result.url = data["url"].as_str().unwrap_or("").to_string();
            result.authors = parse_creators(&data["creators"]);

            let tags: Vec<Value> = data["tags"]
                .as_array()
                .map(|tags| {
                    tags.iter()
                        .filter_map(|t| t["tag"].as_str().map(|s| json!(s)))
                        .collect()
                })
                .unwrap_or_default();

            result.metadata.insert(
                "publication_title".into(),
                json!(data["publicationTitle"].as_str().unwrap_or("")),
            );
            result
                .metadata
                .insert("date".into(), json!(data["date"].as_str().unwrap_or("")));
            result.metadata.insert(
                "item_type".into(),
                json!(data["itemType"].as_str().unwrap_or("")),
            );
            result.metadata.insert(
                "zotero_key".into(),
                json!(item["key"].as_str().unwrap_or("")),
            );
            result.metadata.insert("tags".into(), Value::Array(tags));
            Some(result)
        })
        .collect()
}

/// Authors come from creator entries with role "author" or "editor",
/// formatted "first last", or just "last" when the first name is absent.
fn parse_creators(creators: &Value) -> Vec<String> {
    creators
        .as_array()
        .map(|creators| {
            creators
                .iter()
                .filter(|c| {
                    matches!(c["creatorType"].as_str(), Some("author") | Some("editor"))
                })
                .filter_map(|c| {
                    let first = c["firstName"].as_str().unwrap_or("");
                    let last = c["lastName"].as_str().unwrap_or("");
                    match (first.is_empty(), last.is_empty()) {
                        (false, false) => Some(format!("{} {}", first, last)),
                        (true, false) => Some(last.to_string()),
                        _ => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}
