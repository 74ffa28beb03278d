//! Runlog Server
//!
//! Aggregates log entries emitted by running jobs and serves them back.
//!
//! Architecture:
//! - Repositories: blob stores and the key layout of runs, logs and cancel flags
//! - Services: write buffer, cursor reads, streaming, runs, cancellation, retention
//! - API: axum handlers over the services
//!
//! Every instance buffers recent entries in memory and flushes them to the
//! shared blob store on a size threshold and on a timer.

mod api;
mod config;
mod db;
mod repository;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::{Config, StoreBackend};
use crate::repository::{BlobStore, FsBlobStore, MemoryBlobStore, PgBlobStore};
use crate::service::{CancellationService, LogBuffer, LogService, RunService, retention};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runlog_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Runlog Server...");

    let config = Config::from_env().context("Invalid configuration")?;
    config.validate()?;

    let store = open_store(&config).await?;

    // Initialize services
    let buffer = Arc::new(LogBuffer::new(store.clone(), config.flush_threshold));
    let logs = Arc::new(LogService::new(
        store.clone(),
        buffer.clone(),
        config.stream_settings(),
    ));
    let runs = Arc::new(RunService::new(store.clone(), buffer.clone()));
    let cancel = Arc::new(CancellationService::new(store.clone()));

    info!(
        "Flush threshold: {}, flush interval: {:?}, stream poll interval: {:?}",
        config.flush_threshold, config.flush_interval, config.stream_poll_interval
    );

    spawn_flusher(buffer.clone(), config.flush_interval);
    if let Some(max_age) = config.retention {
        spawn_pruner(store.clone(), buffer.clone(), cancel.clone(), max_age);
    }

    // Build router with all API endpoints
    let app = api::create_router(AppState { logs, runs, cancel });

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let flushed = buffer.flush_all().await;
    info!("Flushed {} buffered entries, shutting down", flushed);

    Ok(())
}

/// Opens the configured blob store
async fn open_store(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.store {
        StoreBackend::Memory => {
            warn!("Using in-memory store; logs are lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
        StoreBackend::Fs => {
            info!("Using filesystem store at {}", config.data_dir.display());
            Arc::new(
                FsBlobStore::open(&config.data_dir)
                    .await
                    .context("Failed to open data directory")?,
            )
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL not set")?;

            info!("Connecting to database...");
            let pool = connect_with_retry(database_url).await?;

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Arc::new(PgBlobStore::new(pool))
        }
    };

    Ok(store)
}

/// Connect to Postgres with exponential backoff
///
/// The database may not be ready yet when the server starts (common in
/// container environments).
async fn connect_with_retry(database_url: &str) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match db::create_pool(database_url).await {
            Ok(pool) => {
                info!("Database connection pool created");
                return Ok(pool);
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to connect to database after {} attempts", MAX_RETRIES);
                    return Err(anyhow::anyhow!("Failed to create database pool: {}", e));
                }

                warn!(
                    "Failed to connect to database (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}

/// Flush every run's buffered entries on a fixed interval
fn spawn_flusher(buffer: Arc<LogBuffer>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            buffer.flush_all().await;
        }
    });
}

/// Delete expired runs once an hour
fn spawn_pruner(
    store: Arc<dyn BlobStore>,
    buffer: Arc<LogBuffer>,
    cancel: Arc<CancellationService>,
    max_age: Duration,
) {
    let max_age = match chrono::Duration::from_std(max_age) {
        Ok(age) => age,
        Err(e) => {
            warn!("Retention disabled, invalid max age: {}", e);
            return;
        }
    };

    info!("Retention enabled: runs older than {} days are deleted", max_age.num_days());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));

        loop {
            ticker.tick().await;
            match retention::prune_runs_older_than(store.as_ref(), &buffer, max_age).await {
                Ok(pruned) => {
                    for run_id in &pruned {
                        cancel.forget(run_id);
                    }
                }
                Err(e) => error!("Retention pass failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
