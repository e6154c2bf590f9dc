mod config;
mod host;

use anyhow::Result;
use metri_collect::{Registry, Runner};
use metri_watch::WatchEvaluator;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("metri=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());

    let config = config::AgentConfig::load(&config_path)?;
    tracing::info!(application = %config.application, config = %config_path, "metri-agent starting");

    let host = host::HostMetrics::new(&config.watches)?;
    let watch_count = host.watch_count();
    let publisher = config.publisher.build()?;
    let evaluator = Arc::new(WatchEvaluator::new());
    let prefix = config.prefix.clone();

    let registry = Registry::builder()
        .publisher("default", publisher)
        .watcher("default", Arc::clone(&evaluator))
        .application(config.application.clone(), move |app| {
            app.publishers(["default"]).watchers(["default"]);
            if let Some(prefix) = prefix {
                app.prefix_metrics_with(prefix);
            }
            app.metrics(move |root| host.define(root));
        })
        .build()?;

    let application = registry.application(&config.application)?;
    tracing::info!(
        frequency_secs = config.frequency_secs,
        iterations = ?config.iterations,
        publisher = ?config.publisher.kind,
        watches = watch_count,
        "Starting collection loop"
    );

    let runner = Runner::new(
        application,
        Duration::from_secs(config.frequency_secs),
        config.iterations,
    );
    let passes = runner
        .run_until(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    let triggered = evaluator.registry().triggered();
    tracing::info!(passes, triggered = triggered.len(), "metri-agent stopped");
    Ok(())
}
