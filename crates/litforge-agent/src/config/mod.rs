//! Configuration loading for Litforge.
//! Reads litforge.toml from the current directory or path in LITFORGE_CONFIG env var.

use litforge_sources::config::SourceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sources: Vec<NamedSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
}

fn default_base_dir() -> String { "artifacts/nobel".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { base_dir: default_base_dir() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_limit() -> usize { 50 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: default_limit() }
    }
}

/// One `[[sources]]` entry: a caller-chosen name plus the typed source
/// config it registers under that name. Array order is registration order,
/// which decides dedup precedence during aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedSourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub source: SourceConfig,
}


impl Config {
    /// Load configuration from litforge.toml.
    /// Checks LITFORGE_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("LITFORGE_CONFIG")
            .unwrap_or_else(|_| "litforge.toml".to_string());

        if !Path::new(&path).exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy litforge.example.toml to litforge.toml and edit it.",
                path
            );
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
