use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kube_job_cleaner::{config::Config, metrics, KubeCluster, Sweeper, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::load().context("invalid configuration")?;
    info!("Loaded configuration: {:?}", config);

    metrics::register_metrics();

    let cluster = KubeCluster::new()
        .await
        .context("failed to connect to the Kubernetes API")?;
    let sweeper = Sweeper::new(Arc::new(cluster), Arc::new(SystemClock), config.policy);

    let Some(interval) = config.schedule.interval_seconds else {
        sweeper.run_once().await.context("sweep failed")?;
        write_metrics(&config);
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    loop {
        ticker.tick().await;
        // A failed sweep is retried on the next tick.
        if let Err(e) = sweeper.run_once().await {
            error!("Sweep failed: {}", e);
        }
        write_metrics(&config);
    }
}

fn write_metrics(config: &Config) {
    if let Some(path) = &config.metrics.file {
        if let Err(e) = metrics::write_metrics_file(path) {
            error!("Failed to write metrics to {}: {}", path.display(), e);
        }
    }
}
