use anyhow::{Context, Result};
use friendcheck_core::{Sweeper, SweepReport};
use friendcheck_rekognition::{RekognitionClient, RekognitionConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    let backend_config = RekognitionConfig::load().context("loading backend configuration")?;
    let client = RekognitionClient::new(&backend_config).context("building backend client")?;
    let sweeper = Sweeper::new(Arc::new(client), config.policy());

    tracing::info!(floor = config.floor, interval = ?config.interval, "friendcheck-sweeper starting");

    let Some(interval) = config.interval else {
        let report = sweeper.run().await.context("sweep failed")?;
        finish(report, config.settle).await;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sweeper.run().await {
                    Ok(report) => finish(report, config.settle).await,
                    // A failed tick is retried on the next one.
                    Err(e) => tracing::error!(error = %e, "sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("friendcheck-sweeper shutting down");
                return Ok(());
            }
        }
    }
}

async fn finish(report: SweepReport, settle: bool) {
    tracing::info!(
        listed = report.listed,
        kept = report.kept,
        scheduled = report.scheduled.len(),
        first_deleted = ?report.first_deleted,
        outstanding = report.stragglers.len(),
        "sweep succeeded"
    );

    if !settle && !report.stragglers.is_empty() {
        tracing::info!(
            outstanding = report.stragglers.len(),
            "not waiting for remaining deletions; the next run retries any left over"
        );
    } else if settle && !report.stragglers.is_empty() {
        let settled = report.stragglers.settle().await;
        for (id, error) in &settled.failed {
            tracing::warn!(collection = ?id, error = %error, "straggler deletion failed");
        }
        tracing::info!(
            deleted = settled.deleted.len(),
            failed = settled.failed.len(),
            "stragglers settled"
        );
    }
}
