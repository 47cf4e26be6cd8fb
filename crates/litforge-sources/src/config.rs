//! Source configuration and the static adapter factory.
//!
//! The set of supported source kinds is a closed enum; adding a new adapter
//! means adding a variant here and an arm in [`build_source`].

use litforge_common::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::local_knowledge::LocalKnowledgeSource;
use crate::web_search::WebSearchSource;
use crate::zotero::ZoteroSource;
use crate::DataSource;

/// Per-source configuration, discriminated by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    WebSearch(WebSearchConfig),
    Zotero(ZoteroConfig),
    LocalKnowledge(LocalKnowledgeConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub semantic_scholar_enabled: bool,
    #[serde(default = "default_true")]
    pub arxiv_enabled: bool,
    #[serde(default = "default_true")]
    pub crossref_enabled: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            semantic_scholar_enabled: default_true(),
            arxiv_enabled: default_true(),
            crossref_enabled: default_true(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZoteroConfig {
    #[serde(default)]
    pub api_key: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalKnowledgeConfig {
    pub knowledge_base_path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection_name: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_true() -> bool { true }
fn default_timeout_secs() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_collection() -> String { "literature".to_string() }
fn default_top_k() -> usize { 10 }

/// Construct the adapter for a config entry. This is the single switch
/// point from configuration to live [`DataSource`] instances.
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn DataSource>> {
    Ok(match config {
        SourceConfig::WebSearch(cfg) => Box::new(WebSearchSource::new(cfg.clone())?),
        SourceConfig::Zotero(cfg) => Box::new(ZoteroSource::new(cfg.clone())?),
        SourceConfig::LocalKnowledge(cfg) => Box::new(LocalKnowledgeSource::new(cfg.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_selects_variant() {
        let cfg: SourceConfig =
            serde_json::from_str(r#"{"type": "web_search", "arxiv_enabled": false}"#).unwrap();
        match cfg {
            SourceConfig::WebSearch(ws) => {
                assert!(!ws.arxiv_enabled);
                assert!(ws.semantic_scholar_enabled);
                assert_eq!(ws.timeout_secs, 30);
                assert_eq!(ws.max_retries, 3);
            }
            other => panic!("expected web_search, got {:?}", other),
        }
    }

    #[test]
    fn test_zotero_config_roundtrip() {
        let cfg: SourceConfig = serde_json::from_str(
            r#"{"type": "zotero", "api_key": "k", "user_id": "12345"}"#,
        )
        .unwrap();
        match cfg {
            SourceConfig::Zotero(z) => {
                assert_eq!(z.api_key, "k");
                assert_eq!(z.user_id.as_deref(), Some("12345"));
                assert!(z.group_id.is_none());
            }
            other => panic!("expected zotero, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let parsed: std::result::Result<SourceConfig, _> =
            serde_json::from_str(r#"{"type": "carrier_pigeon"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_build_source_dispatch() {
        let source = build_source(&SourceConfig::WebSearch(WebSearchConfig::default())).unwrap();
        assert_eq!(source.name(), "web_search");

        let source = build_source(&SourceConfig::Zotero(ZoteroConfig::default())).unwrap();
        assert_eq!(source.name(), "zotero");
        assert!(!source.validate_config()); // no API key

        let source = build_source(&SourceConfig::LocalKnowledge(LocalKnowledgeConfig {
            knowledge_base_path: PathBuf::from("/nonexistent"),
            collection_name: default_collection(),
            top_k: default_top_k(),
        }))
        .unwrap();
        assert_eq!(source.name(), "local_knowledge");
        assert!(!source.validate_config()); // path missing
    }
}
