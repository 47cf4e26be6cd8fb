//! Litforge — Multi-source literature collection pipeline.
//! Entry point for the agent binary.

use litforge_agent::config::Config;
use litforge_agent::{LiteratureAgent, Task};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("litforge=debug,info")),
        )
        .init();

    info!("Litforge starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(c) => {
            info!(
                sources = c.sources.len(),
                base_dir = %c.output.base_dir,
                "Configuration loaded"
            );
            c
        }
        Err(e) => {
            tracing::warn!("Could not load litforge.toml: {e}");
            tracing::warn!("Running baseline-only with defaults.");
            Config {
                output: Default::default(),
                search: Default::default(),
                sources: Vec::new(),
            }
        }
    };

    let agent = LiteratureAgent::from_config(&config)?;

    // Optional query from the command line; without one the run is
    // baseline-only.
    let query = std::env::args().nth(1);
    let task = Task {
        task_id: None,
        query,
        limit: None,
    };

    let result = agent.handle(&task).await?;
    info!(
        rows = result.metrics.rows,
        sources = ?result.data_sources,
        "Collection finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
