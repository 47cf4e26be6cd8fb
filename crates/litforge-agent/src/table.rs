//! Flat table shape shared by the baseline and multi-source rows, plus the
//! standardization, CSV, and metrics steps of a collection run.

use chrono::Local;
use litforge_common::Result;
use litforge_sources::models::{self, SearchResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One row of the collected table. Field order is the CSV column order.
/// Rows from different origins leave columns they don't know about empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<u64>,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub data_source: String,
    pub year: Option<i32>,
    pub category: Option<String>,
    pub publication_date: String,
    pub publication_title: String,
    pub tags: String,
    pub collected_at: String,
}

/// Flatten an aggregated search hit into a table row. Authors are joined
/// with "; ", tag lists are flattened the same way, and the contributing
/// source name is taken from the aggregation stamp.
pub fn to_record(result: &SearchResult) -> Record {
    let publication_date = result
        .publication_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| metadata_str(result, "date"));

    let publication_title = {
        let from_meta = metadata_str(result, "publication_title");
        if from_meta.is_empty() {
            result.journal.clone().unwrap_or_default()
        } else {
            from_meta
        }
    };

    let tags = result
        .metadata
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();

    Record {
        title: result.title.clone(),
        authors: result.authors.join("; "),
        abstract_text: result.abstract_text.clone(),
        url: result.url.clone(),
        data_source: result.data_source().to_string(),
        publication_date,
        publication_title,
        tags,
        collected_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        ..Record::default()
    }
}

fn metadata_str(result: &SearchResult, key: &str) -> String {
    result
        .metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Standardize the concatenated table: derive missing years from
/// publication dates, backfill sequential ids when no row carries one, and
/// drop duplicate titles (first occurrence wins; empty titles are kept).
pub fn standardize(rows: Vec<Record>) -> Vec<Record> {
    let mut rows = rows;

    for row in &mut rows {
        if row.year.is_none() && !row.publication_date.is_empty() {
            row.year = models::parse_date(&row.publication_date).map(|d| {
                use chrono::Datelike;
                d.year()
            });
        }
    }

    if rows.iter().all(|r| r.id.is_none()) {
        for (i, row) in rows.iter_mut().enumerate() {
            row.id = Some(i as u64);
        }
    }

    let mut seen = HashSet::new();
    rows.retain(|row| row.title.is_empty() || seen.insert(row.title.clone()));
    rows
}

/// CSV column names, matching the [`Record`] field order.
const CSV_COLUMNS: [&str; 12] = [
    "id",
    "title",
    "authors",
    "abstract",
    "url",
    "data_source",
    "year",
    "category",
    "publication_date",
    "publication_title",
    "tags",
    "collected_at",
];

/// Write the table to CSV. The header row is always present, so an empty
/// run still produces an artifact carrying the schema.
pub fn write_csv(path: &Path, rows: &[Record]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    if rows.is_empty() {
        writer.write_record(CSV_COLUMNS).map_err(csv_err)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_err(e: csv::Error) -> litforge_common::LitforgeError {
    litforge_common::LitforgeError::Config(format!("CSV write failed: {}", e))
}

/// Summary metrics reported for one collection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub rows: usize,
    pub data_sources_count: usize,
    pub data_sources: Vec<String>,
    pub unique_titles: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_missing_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_range: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub source_distribution: BTreeMap<String, usize>,
}

pub fn compute_metrics(rows: &[Record], data_sources: &[String]) -> Metrics {
    let mut metrics = Metrics {
        rows: rows.len(),
        data_sources_count: data_sources.len(),
        data_sources: data_sources.to_vec(),
        ..Metrics::default()
    };
    if rows.is_empty() {
        return metrics;
    }

    metrics.unique_titles = rows
        .iter()
        .map(|r| r.title.as_str())
        .collect::<HashSet<_>>()
        .len();

    let missing = rows.iter().filter(|r| r.year.is_none()).count();
    metrics.year_missing_rate = Some(round4(missing as f64 / rows.len() as f64));

    let years: Vec<i32> = rows.iter().filter_map(|r| r.year).collect();
    if let (Some(min), Some(max)) = (years.iter().min(), years.iter().max()) {
        metrics.year_range = Some(format!("{}-{}", min, max));
    }

    for row in rows {
        *metrics
            .source_distribution
            .entry(row.data_source.clone())
            .or_insert(0) += 1;
    }

    metrics
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(title: &str, source: &str) -> Record {
        Record {
            title: title.to_string(),
            data_source: source.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn test_to_record_joins_authors_and_tags() {
        let mut result = SearchResult::new("Attention Is All You Need", "web_search");
        result.authors = vec!["A. Vaswani".to_string(), "N. Shazeer".to_string()];
        result.abstract_text = "We propose the Transformer.".to_string();
        result.journal = Some("NeurIPS".to_string());
        result.publication_date = NaiveDate::from_ymd_opt(2017, 6, 12);
        result.metadata.insert(
            "tags".into(),
            serde_json::json!(["attention", "transformers"]),
        );
        result
            .metadata
            .insert("data_source".into(), serde_json::json!("papers"));

        let record = to_record(&result);
        assert_eq!(record.authors, "A. Vaswani; N. Shazeer");
        assert_eq!(record.tags, "attention; transformers");
        assert_eq!(record.data_source, "papers");
        assert_eq!(record.publication_date, "2017-06-12");
        assert_eq!(record.publication_title, "NeurIPS");
        assert!(record.year.is_none()); // filled in by standardize
    }

    #[test]
    fn test_standardize_derives_year_and_backfills_ids() {
        let mut a = row("a", "s");
        a.publication_date = "2019-03-01".to_string();
        let b = row("b", "s");

        let rows = standardize(vec![a, b]);
        assert_eq!(rows[0].year, Some(2019));
        assert_eq!(rows[1].year, None);
        assert_eq!(rows[0].id, Some(0));
        assert_eq!(rows[1].id, Some(1));
    }

    #[test]
    fn test_standardize_keeps_existing_ids() {
        let mut a = row("a", "s");
        a.id = Some(42);
        let b = row("b", "s");

        let rows = standardize(vec![a, b]);
        assert_eq!(rows[0].id, Some(42));
        assert_eq!(rows[1].id, None);
    }

    #[test]
    fn test_standardize_drops_duplicate_titles_first_wins() {
        let rows = standardize(vec![row("same", "first"), row("same", "second"), row("", "x")]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data_source, "first");
        assert_eq!(rows[1].title, "");
    }

    #[test]
    fn test_metrics_on_empty_table() {
        let metrics = compute_metrics(&[], &["nobel_prize".to_string()]);
        assert_eq!(metrics.rows, 0);
        assert_eq!(metrics.data_sources_count, 1);
        assert!(metrics.year_missing_rate.is_none());
        assert!(metrics.source_distribution.is_empty());
    }

    #[test]
    fn test_metrics_year_and_distribution() {
        let mut a = row("a", "nobel_prize");
        a.year = Some(1903);
        let mut b = row("b", "nobel_prize");
        b.year = Some(2011);
        let c = row("c", "web_search");
        let d = row("d", "web_search");

        let metrics = compute_metrics(
            &[a, b, c, d],
            &["nobel_prize".to_string(), "web_search".to_string()],
        );
        assert_eq!(metrics.rows, 4);
        assert_eq!(metrics.unique_titles, 4);
        assert_eq!(metrics.year_missing_rate, Some(0.5));
        assert_eq!(metrics.year_range.as_deref(), Some("1903-2011"));
        assert_eq!(metrics.source_distribution["nobel_prize"], 2);
        assert_eq!(metrics.source_distribution["web_search"], 2);
    }

    #[test]
    fn test_csv_has_header_and_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut a = row("a", "s");
        a.year = Some(2001);
        write_csv(&path, &[a, row("b", "s")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,title,authors,abstract,url,data_source,year"));
        assert!(lines[1].contains("2001"));
    }

    #[test]
    fn test_csv_header_written_for_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_csv(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
    }
}
