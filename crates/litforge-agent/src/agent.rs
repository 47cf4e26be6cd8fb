//! End-to-end literature collection: baseline fetch, optional multi-source
//! aggregation, standardization, and artifact output.

use anyhow::Context;
use litforge_aggregate::MultiSourceManager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, instrument};

use crate::baseline::{BaselineProvider, NobelPrizeProvider};
use crate::config::Config;
use crate::report::render_report;
use crate::table::{self, Metrics, Record};

/// One collection task. Everything is optional; an empty task runs the
/// baseline alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    pub task_id: Option<String>,
    pub query: Option<String>,
    pub limit: Option<usize>,
}

/// Paths of the artifacts written for one run.
#[derive(Debug, Clone, Serialize)]
pub struct Artifacts {
    pub csv: PathBuf,
    pub report: PathBuf,
    pub run_dir: PathBuf,
}

/// Result of a completed collection task.
#[derive(Debug, Serialize)]
pub struct TaskResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub task_id: String,
    pub artifacts: Artifacts,
    pub metrics: Metrics,
    pub query: Option<String>,
    pub data_sources: Vec<String>,
    pub notes: String,
}

/// Literature collection agent. Always fetches the baseline dataset; layers
/// aggregated multi-source results on top when a manager is configured and
/// the task carries a query.
pub struct LiteratureAgent {
    base_dir: PathBuf,
    baseline: Box<dyn BaselineProvider>,
    manager: Option<MultiSourceManager>,
    default_limit: usize,
}

impl LiteratureAgent {
    /// Baseline-only agent, no multi-source search.
    pub fn new(base_dir: impl Into<PathBuf>) -> litforge_common::Result<Self> {
        Ok(Self {
            base_dir: base_dir.into(),
            baseline: Box::new(NobelPrizeProvider::new()?),
            manager: None,
            default_limit: 50,
        })
    }

    /// Agent with a configured multi-source manager.
    pub fn with_manager(
        base_dir: impl Into<PathBuf>,
        manager: MultiSourceManager,
    ) -> litforge_common::Result<Self> {
        let mut agent = Self::new(base_dir)?;
        agent.manager = Some(manager);
        Ok(agent)
    }

    /// Build an agent from the loaded TOML config. An empty `[[sources]]`
    /// list yields a baseline-only agent.
    pub fn from_config(config: &Config) -> litforge_common::Result<Self> {
        let mut agent = Self::new(config.output.base_dir.clone())?;
        agent.default_limit = config.search.default_limit;
        if !config.sources.is_empty() {
            let manager = MultiSourceManager::from_configs(
                config
                    .sources
                    .iter()
                    .map(|s| (s.name.clone(), s.source.clone())),
            );
            info!(sources = manager.source_count(), "multi-source manager ready");
            agent.manager = Some(manager);
        }
        Ok(agent)
    }

    /// Substitute the baseline provider. Used by tests.
    pub fn with_baseline_provider(mut self, baseline: Box<dyn BaselineProvider>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Run one collection task end to end.
    ///
    /// Source-level failures (baseline fetch, any data source) are logged
    /// and contribute zero rows; only filesystem failures (run directory,
    /// CSV, report) abort the task.
    #[instrument(skip(self, task), fields(query = task.query.as_deref()))]
    pub async fn handle(&self, task: &Task) -> anyhow::Result<TaskResult> {
        let run_id = task
            .task_id
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
        let run_dir = self.base_dir.join("runs").join(&run_id);
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create run directory {}", run_dir.display()))?;

        let mut rows: Vec<Record> = Vec::new();
        let mut data_sources_used: Vec<String> = Vec::new();

        match self.baseline.fetch().await {
            Ok(baseline_rows) => {
                info!(rows = baseline_rows.len(), "baseline collected");
                rows.extend(baseline_rows);
                data_sources_used.push("nobel_prize".to_string());
            }
            Err(e) => {
                error!(error = %e, "baseline collection failed, continuing without it");
            }
        }

        let query = task.query.as_deref().filter(|q| !q.trim().is_empty());
        if let (Some(manager), Some(query)) = (&self.manager, query) {
            let limit = task.limit.unwrap_or(self.default_limit);
            let hits = manager.search_aggregated(query, limit).await;
            info!(rows = hits.len(), "multi-source collection finished");
            for hit in &hits {
                let record = table::to_record(hit);
                if !data_sources_used.contains(&record.data_source) {
                    data_sources_used.push(record.data_source.clone());
                }
                rows.push(record);
            }
        }

        let rows = table::standardize(rows);

        let csv_path = run_dir.join("laureates_prizes.csv");
        table::write_csv(&csv_path, &rows)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;

        let metrics = table::compute_metrics(&rows, &data_sources_used);

        let report_path = run_dir.join("collection_report.md");
        let report = render_report(&rows, &metrics, query);
        std::fs::write(&report_path, report)
            .with_context(|| format!("failed to write {}", report_path.display()))?;

        Ok(TaskResult {
            kind: "literature_collect".to_string(),
            task_id: run_id,
            artifacts: Artifacts {
                csv: csv_path,
                report: report_path,
                run_dir,
            },
            notes: format!(
                "Enhanced collection from {} sources",
                data_sources_used.len()
            ),
            metrics,
            query: query.map(str::to_string),
            data_sources: data_sources_used,
        })
    }
}
