use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::LitforgeError;

/// Default per-request timeout for external literature APIs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A sandbox-capped HTTP client that only allows requests to approved domains.
/// Every outbound call made by a source adapter goes through this allowlist.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a new SandboxClient with the default allowlist of literature
    /// and baseline APIs, using [`DEFAULT_TIMEOUT`].
    pub fn new() -> Result<Self, LitforgeError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a new SandboxClient with a caller-supplied request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, LitforgeError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "api.semanticscholar.org", // Semantic Scholar
            "export.arxiv.org",        // arXiv Atom API
            "api.crossref.org",        // CrossRef
            "api.zotero.org",          // Zotero
            "api.nobelprize.org",      // Nobel Prize baseline
            "localhost",               // Local retrieval services
            "127.0.0.1",               // Localhost alt
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| LitforgeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Check exact match or if it's a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, LitforgeError> {
        if !self.is_allowed(url) {
            return Err(LitforgeError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for POST requests.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, LitforgeError> {
        if !self.is_allowed(url) {
            return Err(LitforgeError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.post(url))
    }
}
