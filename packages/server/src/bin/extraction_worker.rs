//! Extraction worker
//!
//! Polls the job store and drains queued jobs one at a time. Runs until
//! Ctrl-C; a job in flight is finished before exiting.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use server_core::domains::extraction_jobs::PostgresJobStore;
use server_core::kernel::build_processor;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,catalog_extraction=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let processor = build_processor(&config, Arc::new(PostgresJobStore::new(pool))).await?;
    let interval = config.worker_poll_interval;

    info!(poll_interval_secs = interval.as_secs(), "Extraction worker started");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let drained = match processor.drain_one().await {
            Ok(Some((job_id, outcome))) => {
                info!(job_id = %job_id, outcome = ?outcome, "Job drained");
                true
            }
            Ok(None) => false,
            Err(e) => {
                error!(error = %e, "Drain failed");
                false
            }
        };

        // Drain back to back while jobs are queued
        let pause = if drained { Duration::ZERO } else { interval };

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping worker");
                break;
            }
            _ = tokio::time::sleep(pause) => {}
        }
    }

    Ok(())
}
