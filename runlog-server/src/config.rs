//! Server configuration
//!
//! Defines all configurable parameters for the server including
//! the blob store backend, buffering thresholds and stream polling.

use std::path::PathBuf;
use std::time::Duration;

use crate::service::log_buffer::DEFAULT_FLUSH_THRESHOLD;
use crate::service::stream::{DEFAULT_IDLE_LIMIT, DEFAULT_POLL_INTERVAL, StreamSettings};

/// Where blobs are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory; lost on restart, not shared between instances
    Memory,
    /// Files under `data_dir`
    Fs,
    /// The `blobs` table of `database_url`
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "fs" | "file" => Ok(Self::Fs),
            "postgres" | "pg" => Ok(Self::Postgres),
            other => anyhow::bail!("Unknown store backend: {}", other),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    pub store: StoreBackend,

    /// Root directory of the filesystem store
    pub data_dir: PathBuf,

    /// Postgres connection string, required for the postgres store
    pub database_url: Option<String>,

    /// Buffered entries per run that trigger an immediate flush
    pub flush_threshold: usize,

    /// How often buffered entries of every run are flushed
    pub flush_interval: Duration,

    pub stream_poll_interval: Duration,

    /// Consecutive empty polls after which a stream ends
    pub stream_idle_limit: u32,

    /// Runs untouched for this long are deleted; `None` keeps everything
    pub retention: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bind_addr: String) -> Self {
        Self {
            bind_addr,
            store: StoreBackend::Fs,
            data_dir: PathBuf::from("./data"),
            database_url: None,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: Duration::from_secs(5),
            stream_poll_interval: DEFAULT_POLL_INTERVAL,
            stream_idle_limit: DEFAULT_IDLE_LIMIT,
            retention: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RUNLOG_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - RUNLOG_STORE (optional, memory|fs|postgres, default: fs)
    /// - RUNLOG_DATA_DIR (optional, default: ./data)
    /// - DATABASE_URL (required for the postgres store)
    /// - RUNLOG_FLUSH_THRESHOLD (optional, default: 50)
    /// - RUNLOG_FLUSH_INTERVAL (optional, seconds, default: 5)
    /// - RUNLOG_STREAM_POLL_INTERVAL (optional, milliseconds, default: 1000)
    /// - RUNLOG_STREAM_IDLE_LIMIT (optional, default: 60)
    /// - RUNLOG_RETENTION_DAYS (optional, disabled when unset)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults =
            Self::new(var("RUNLOG_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()));

        let store = match var("RUNLOG_STORE") {
            Some(s) => s.parse()?,
            None => defaults.store,
        };

        let data_dir = var("RUNLOG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let flush_threshold = var("RUNLOG_FLUSH_THRESHOLD")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.flush_threshold);

        let flush_interval = var("RUNLOG_FLUSH_INTERVAL")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.flush_interval);

        let stream_poll_interval = var("RUNLOG_STREAM_POLL_INTERVAL")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.stream_poll_interval);

        let stream_idle_limit = var("RUNLOG_STREAM_IDLE_LIMIT")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.stream_idle_limit);

        let retention = var("RUNLOG_RETENTION_DAYS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(|days| Duration::from_secs(days * 24 * 60 * 60));

        Ok(Self {
            store,
            data_dir,
            database_url: var("DATABASE_URL"),
            flush_threshold,
            flush_interval,
            stream_poll_interval,
            stream_idle_limit,
            retention,
            ..defaults
        })
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            poll_interval: self.stream_poll_interval,
            idle_limit: self.stream_idle_limit,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.store == StoreBackend::Postgres && self.database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set for the postgres store");
        }

        if self.flush_threshold == 0 {
            anyhow::bail!("flush_threshold must be greater than 0");
        }

        if self.flush_interval.is_zero() {
            anyhow::bail!("flush_interval must be greater than 0");
        }

        if self.stream_poll_interval.is_zero() {
            anyhow::bail!("stream_poll_interval must be greater than 0");
        }

        if self.stream_idle_limit == 0 {
            anyhow::bail!("stream_idle_limit must be greater than 0");
        }

        if self.retention.is_some_and(|r| r.is_zero()) {
            anyhow::bail!("retention must be greater than 0 days");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("0.0.0.0:8080".to_string())
    }
}
