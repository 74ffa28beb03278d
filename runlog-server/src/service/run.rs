//! Run Service
//!
//! Run registration, the newest-first run index and terminal status.

use runlog_core::domain::run::{RunRecord, RunStatus, RunSummary, new_run_id};
use runlog_core::dto::run::StartRun;
use std::sync::Arc;
use thiserror::Error;

use super::log_buffer::LogBuffer;
use super::validate_run_id;
use crate::repository::{BlobStore, StoreError, run_repository};

/// Service error type
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Run {0} not found")]
    NotFound(String),
    #[error("Run {0} already exists")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RunError>;

pub struct RunService {
    store: Arc<dyn BlobStore>,
    buffer: Arc<LogBuffer>,
}

impl RunService {
    pub fn new(store: Arc<dyn BlobStore>, buffer: Arc<LogBuffer>) -> Self {
        Self { store, buffer }
    }

    /// Register a new run and put it at the head of the index
    pub async fn start_run(&self, req: StartRun) -> Result<RunRecord> {
        let run_id = req.run_id.unwrap_or_else(new_run_id);
        validate_run_id(&run_id).map_err(RunError::ValidationError)?;

        if run_repository::find_by_id(self.store.as_ref(), &run_id)
            .await?
            .is_some()
        {
            return Err(RunError::AlreadyExists(run_id));
        }

        let record = RunRecord::started(run_id, req.name);
        run_repository::save(self.store.as_ref(), &record).await?;
        run_repository::prepend_to_index(self.store.as_ref(), &record).await?;

        tracing::info!("Run started: {}", record.run_id);

        Ok(record)
    }

    /// Get a run by ID
    pub async fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        validate_run_id(run_id).map_err(RunError::ValidationError)?;

        run_repository::find_by_id(self.store.as_ref(), run_id)
            .await?
            .ok_or_else(|| RunError::NotFound(run_id.to_string()))
    }

    /// List runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let index = run_repository::read_index(self.store.as_ref()).await?;
        Ok(index.map(|i| i.runs).unwrap_or_default())
    }

    /// ID of the most recently started run, if any
    pub async fn latest_run_id(&self) -> Result<Option<String>> {
        let index = run_repository::read_index(self.store.as_ref()).await?;
        Ok(index.and_then(|i| i.latest().map(|r| r.run_id.clone())))
    }

    /// Record a run's terminal status
    ///
    /// Buffered logs of the run are flushed first. A run that was already
    /// cancelled keeps its cancelled status.
    pub async fn complete_run(&self, run_id: &str, status: RunStatus) -> Result<RunRecord> {
        validate_completion_status(status)?;
        let mut record = self.get_run(run_id).await?;

        if let Err(e) = self.buffer.flush(run_id).await {
            tracing::warn!("Failed to flush logs while completing run {}: {}", run_id, e);
        }

        if record.status == RunStatus::Cancelled {
            tracing::info!(
                "Run {} was cancelled, ignoring completion status {:?}",
                run_id,
                status
            );
            return Ok(record);
        }

        if record.status.is_terminal() {
            tracing::warn!(
                "Completing run {} that is not running (current: {:?})",
                run_id,
                record.status
            );
        }

        record.status = status;
        record.completed_at = Some(chrono::Utc::now());
        run_repository::save(self.store.as_ref(), &record).await?;

        tracing::info!("Run {} completed with status: {:?}", run_id, status);

        Ok(record)
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_completion_status(status: RunStatus) -> Result<()> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(RunError::ValidationError(format!(
            "Invalid completion status: {:?}",
            status
        )))
    }
}
