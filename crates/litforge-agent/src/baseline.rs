//! Baseline dataset: Nobel Prize laureate records.
//!
//! Every collection run starts from this dataset regardless of whether a
//! query-driven multi-source search happens on top of it.

use async_trait::async_trait;
use chrono::Local;
use litforge_common::{Result, SandboxClient};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::table::Record;

const NOBEL_API_URL: &str = "https://api.nobelprize.org/2.1/nobelPrizes";
/// Page size requested from the Nobel API per fetch.
const NOBEL_FETCH_LIMIT: usize = 200;

/// Supplier of the baseline table rows. The production implementation hits
/// the Nobel Prize API; tests substitute a stub.
#[async_trait]
pub trait BaselineProvider: Send + Sync {
    /// Fetch and normalize the baseline dataset. `Err` is fine here; the
    /// agent logs it and runs with zero baseline rows.
    async fn fetch(&self) -> Result<Vec<Record>>;
}

/// Baseline provider backed by the public Nobel Prize API v2.1.
pub struct NobelPrizeProvider {
    client: SandboxClient,
}

impl NobelPrizeProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: SandboxClient::new()?,
        })
    }
}

#[async_trait]
impl BaselineProvider for NobelPrizeProvider {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<Record>> {
        let response = self
            .client
            .get(NOBEL_API_URL)?
            .query(&[("limit", NOBEL_FETCH_LIMIT.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let payload: NobelResponse = response.json().await?;
        let rows = normalize(payload);
        debug!(rows = rows.len(), "nobel baseline fetched");
        Ok(rows)
    }
}

#[derive(Debug, Deserialize)]
struct NobelResponse {
    #[serde(default, rename = "nobelPrizes")]
    nobel_prizes: Vec<NobelPrize>,
}

#[derive(Debug, Deserialize)]
struct NobelPrize {
    #[serde(rename = "awardYear")]
    award_year: Option<String>,
    category: Option<Localized>,
    #[serde(default)]
    laureates: Vec<Laureate>,
}

#[derive(Debug, Deserialize)]
struct Laureate {
    #[serde(rename = "knownName")]
    known_name: Option<Localized>,
    #[serde(rename = "orgName")]
    org_name: Option<Localized>,
    motivation: Option<Localized>,
}

#[derive(Debug, Deserialize)]
struct Localized {
    en: Option<String>,
}

impl Localized {
    fn text(&self) -> &str {
        self.en.as_deref().unwrap_or("")
    }
}

/// Flatten the API payload to one row per (prize, laureate). Prizes with no
/// laureates (years the prize was withheld) contribute no rows.
fn normalize(payload: NobelResponse) -> Vec<Record> {
    let collected_at = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let mut rows = Vec::new();

    for prize in payload.nobel_prizes {
        let category = prize
            .category
            .as_ref()
            .map(Localized::text)
            .unwrap_or("")
            .to_string();
        let year = prize
            .award_year
            .as_deref()
            .and_then(|y| y.parse::<i32>().ok());

        for laureate in &prize.laureates {
            let name = laureate
                .known_name
                .as_ref()
                .or(laureate.org_name.as_ref())
                .map(Localized::text)
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }

            let title = match (category.is_empty(), year) {
                (false, Some(y)) => format!("Nobel Prize in {} {} - {}", category, y, name),
                (false, None) => format!("Nobel Prize in {} - {}", category, name),
                (true, _) => format!("Nobel Prize - {}", name),
            };

            rows.push(Record {
                title,
                authors: name,
                abstract_text: laureate
                    .motivation
                    .as_ref()
                    .map(Localized::text)
                    .unwrap_or("")
                    .to_string(),
                data_source: "nobel_prize".to_string(),
                year,
                category: if category.is_empty() {
                    None
                } else {
                    Some(category.clone())
                },
                collected_at: collected_at.clone(),
                ..Record::default()
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOBEL_JSON: &str = r#"{
        "nobelPrizes": [
            {
                "awardYear": "1903",
                "category": {"en": "Physics"},
                "laureates": [
                    {"knownName": {"en": "Marie Curie"}, "motivation": {"en": "research on radiation phenomena"}},
                    {"knownName": {"en": "Pierre Curie"}, "motivation": {"en": "research on radiation phenomena"}}
                ]
            },
            {
                "awardYear": "1940",
                "category": {"en": "Peace"},
                "laureates": []
            },
            {
                "awardYear": "1917",
                "category": {"en": "Peace"},
                "laureates": [
                    {"orgName": {"en": "International Committee of the Red Cross"}}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_normalize_one_row_per_laureate() {
        let payload: NobelResponse = serde_json::from_str(NOBEL_JSON).unwrap();
        let rows = normalize(payload);

        assert_eq!(rows.len(), 3); // withheld 1940 prize contributes nothing
        assert_eq!(rows[0].title, "Nobel Prize in Physics 1903 - Marie Curie");
        assert_eq!(rows[0].authors, "Marie Curie");
        assert_eq!(rows[0].year, Some(1903));
        assert_eq!(rows[0].category.as_deref(), Some("Physics"));
        assert_eq!(rows[0].data_source, "nobel_prize");
        assert_eq!(rows[0].abstract_text, "research on radiation phenomena");

        // An organization laureate falls back to its orgName.
        assert_eq!(rows[2].authors, "International Committee of the Red Cross");
    }

    #[test]
    fn test_normalize_empty_payload() {
        let payload: NobelResponse = serde_json::from_str("{}").unwrap();
        assert!(normalize(payload).is_empty());
    }

    #[tokio::test]
    #[ignore] // network test, run with: cargo test -- --ignored
    async fn test_live_nobel_fetch() {
        let provider = NobelPrizeProvider::new().unwrap();
        let rows = provider.fetch().await.unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.data_source == "nobel_prize"));
    }
}
