//! Log Service
//!
//! Business logic for run logs: ingest through the write buffer,
//! cursor-addressed reads over the merged durable + buffered view,
//! latest-run resolution, bulk export and polling streams.

use runlog_core::domain::log::LogEntry;
use runlog_core::dto::log::{LatestLogPage, LogPage, NewLogEntry};
use std::sync::Arc;
use thiserror::Error;

use super::log_buffer::{LogBuffer, RunLogSnapshot};
use super::stream::{self, StreamSettings};
use super::validate_run_id;
use crate::repository::{BlobStore, StoreError, log_repository, run_repository};

/// Service error type
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Logs not found for run {0}")]
    NotFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Failed to encode logs: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;

pub struct LogService {
    store: Arc<dyn BlobStore>,
    buffer: Arc<LogBuffer>,
    stream_settings: StreamSettings,
}

impl LogService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        buffer: Arc<LogBuffer>,
        stream_settings: StreamSettings,
    ) -> Self {
        Self {
            store,
            buffer,
            stream_settings,
        }
    }

    /// Producer entry point: buffer one entry
    ///
    /// Only the run ID is checked; flush failures stay inside the buffer.
    pub async fn append(&self, entry: LogEntry) -> Result<()> {
        validate_run_id(&entry.run_id).map_err(LogError::ValidationError)?;
        self.buffer.append(entry).await;
        Ok(())
    }

    /// Add a batch of producer events to a run
    pub async fn add_log_entries(&self, run_id: &str, entries: Vec<NewLogEntry>) -> Result<usize> {
        validate_run_id(run_id).map_err(LogError::ValidationError)?;
        validate_log_entries(&entries)?;

        let count = entries.len();
        for entry in entries {
            self.append(entry.into_entry(run_id)).await?;
        }

        tracing::debug!("Buffered {} log entries for run: {}", count, run_id);

        Ok(count)
    }

    /// Flush a run's buffered entries, surfacing storage failures
    pub async fn flush(&self, run_id: &str) -> Result<usize> {
        validate_run_id(run_id).map_err(LogError::ValidationError)?;
        Ok(self.buffer.flush(run_id).await?)
    }

    /// Get a run's log entries starting at `cursor`
    ///
    /// The view is the durable log followed by this instance's buffered
    /// entries. `next_cursor` never moves backwards.
    pub async fn get_logs(&self, run_id: &str, cursor: usize) -> Result<LogPage> {
        validate_run_id(run_id).map_err(LogError::ValidationError)?;

        let snapshot = self.buffer.snapshot(run_id).await?;
        page_from_snapshot(snapshot, cursor).ok_or_else(|| LogError::NotFound(run_id.to_string()))
    }

    /// Get log entries of the newest run; never fails
    pub async fn get_latest_logs(&self, cursor: usize) -> LatestLogPage {
        let run_id = match run_repository::read_index(self.store.as_ref()).await {
            Ok(index) => index.and_then(|i| i.latest().map(|r| r.run_id.clone())),
            Err(e) => {
                tracing::warn!("Failed to read run index: {}", e);
                return LatestLogPage::empty();
            }
        };

        let Some(run_id) = run_id else {
            return LatestLogPage::empty();
        };

        match self.get_logs(&run_id, cursor).await {
            Ok(page) => LatestLogPage {
                logs: page.logs,
                next_cursor: page.next_cursor,
                run_id: Some(run_id),
            },
            Err(LogError::NotFound(_)) => LatestLogPage {
                logs: Vec::new(),
                next_cursor: cursor,
                run_id: Some(run_id),
            },
            Err(e) => {
                tracing::warn!("Failed to read logs of latest run {}: {}", run_id, e);
                LatestLogPage {
                    logs: Vec::new(),
                    next_cursor: cursor,
                    run_id: Some(run_id),
                }
            }
        }
    }

    /// Export every entry of a run as JSON Lines
    pub async fn export_jsonl(&self, run_id: &str) -> Result<String> {
        let page = self.get_logs(run_id, 0).await?;
        Ok(log_repository::export(&page.logs)?)
    }

    /// Lazily stream a run's entries from `start_cursor` until the idle limit
    pub fn stream_logs(
        self: &Arc<Self>,
        run_id: impl Into<String>,
        start_cursor: usize,
    ) -> stream::LogStream {
        stream::stream_logs(
            Arc::clone(self),
            run_id.into(),
            start_cursor,
            self.stream_settings,
        )
    }
}

/// Merge a snapshot into a page; `None` if the run has no entries anywhere
fn page_from_snapshot(snapshot: RunLogSnapshot, cursor: usize) -> Option<LogPage> {
    let RunLogSnapshot { durable, buffered } = snapshot;

    let mut merged = match durable {
        Some(entries) => entries,
        None if buffered.is_empty() => return None,
        None => Vec::new(),
    };
    merged.extend(buffered);

    let total = merged.len();
    let logs = if cursor < total {
        merged.split_off(cursor)
    } else {
        Vec::new()
    };

    Some(LogPage {
        logs,
        next_cursor: total.max(cursor),
    })
}

// =============================================================================
// Validation
// =============================================================================

fn validate_log_entries(entries: &[NewLogEntry]) -> Result<()> {
    const MAX_MESSAGE_LENGTH: usize = 10_000;
    const MAX_BATCH_SIZE: usize = 1000;

    if entries.len() > MAX_BATCH_SIZE {
        return Err(LogError::ValidationError(format!(
            "Too many log entries in batch (max: {})",
            MAX_BATCH_SIZE
        )));
    }

    for (i, entry) in entries.iter().enumerate() {
        if entry.message.len() > MAX_MESSAGE_LENGTH {
            return Err(LogError::ValidationError(format!(
                "Log entry {} message too long (max: {} chars)",
                i, MAX_MESSAGE_LENGTH
            )));
        }
    }

    Ok(())
}
