//! Markdown report for one collection run.

use chrono::Local;

use crate::table::{Metrics, Record};

const SAMPLE_ROWS: usize = 5;
const SAMPLE_ABSTRACT_CHARS: usize = 200;

/// Render the human-readable collection report.
pub fn render_report(rows: &[Record], metrics: &Metrics, query: Option<&str>) -> String {
    let mut out = String::new();

    out.push_str("# Literature Collection Report\n\n");
    out.push_str(&format!(
        "**Generated**: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(query) = query {
        out.push_str(&format!("**Query**: {}\n\n", query));
    }

    out.push_str("## Data Overview\n\n");
    out.push_str(&format!("- **Rows**: {}\n", metrics.rows));
    out.push_str(&format!(
        "- **Data sources**: {}\n",
        metrics.data_sources_count
    ));
    out.push_str(&format!(
        "- **Sources used**: {}\n",
        metrics.data_sources.join(", ")
    ));
    if metrics.rows > 0 {
        out.push_str(&format!("- **Unique titles**: {}\n", metrics.unique_titles));
    }
    if let Some(range) = &metrics.year_range {
        out.push_str(&format!("- **Year range**: {}\n", range));
        if let Some(rate) = metrics.year_missing_rate {
            out.push_str(&format!("- **Year missing rate**: {:.2}%\n", rate * 100.0));
        }
    }

    if !metrics.source_distribution.is_empty() {
        out.push_str("\n## Source Distribution\n\n");
        for (source, count) in &metrics.source_distribution {
            out.push_str(&format!("- **{}**: {} rows\n", source, count));
        }
    }

    if !rows.is_empty() {
        out.push_str("\n## Sample Data\n\n");
        for (i, row) in rows.iter().take(SAMPLE_ROWS).enumerate() {
            out.push_str(&format!("### {}. {}\n", i + 1, row.title));
            if !row.authors.is_empty() {
                out.push_str(&format!("**Authors**: {}\n\n", row.authors));
            }
            if !row.abstract_text.is_empty() {
                out.push_str(&format!(
                    "**Abstract**: {}\n\n",
                    truncate_chars(&row.abstract_text, SAMPLE_ABSTRACT_CHARS)
                ));
            }
            out.push_str(&format!("**Source**: {}\n\n", row.data_source));
        }
    }

    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::compute_metrics;

    fn sample_rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                title: format!("Paper {}", i),
                authors: "A. Author".to_string(),
                abstract_text: "x".repeat(300),
                data_source: "web_search".to_string(),
                year: Some(2000 + i as i32),
                ..Record::default()
            })
            .collect()
    }

    #[test]
    fn test_report_sections_present() {
        let rows = sample_rows(7);
        let metrics = compute_metrics(&rows, &["web_search".to_string()]);
        let report = render_report(&rows, &metrics, Some("transformers"));

        assert!(report.starts_with("# Literature Collection Report"));
        assert!(report.contains("**Query**: transformers"));
        assert!(report.contains("## Data Overview"));
        assert!(report.contains("- **Rows**: 7"));
        assert!(report.contains("- **Year range**: 2000-2006"));
        assert!(report.contains("## Source Distribution"));
        assert!(report.contains("## Sample Data"));
        // Capped at five samples.
        assert!(report.contains("### 5. Paper 4"));
        assert!(!report.contains("### 6."));
        // Abstracts truncated with an ellipsis marker.
        assert!(report.contains(&format!("{}...", "x".repeat(200))));
    }

    #[test]
    fn test_report_on_empty_run() {
        let metrics = compute_metrics(&[], &[]);
        let report = render_report(&[], &metrics, None);

        assert!(report.contains("- **Rows**: 0"));
        assert!(!report.contains("**Query**"));
        assert!(!report.contains("## Sample Data"));
        assert!(!report.contains("## Source Distribution"));
    }
}
