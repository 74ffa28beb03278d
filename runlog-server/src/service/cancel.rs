//! Cancellation Service
//!
//! Cross-instance cancellation of in-flight runs.
//!
//! The durable cancel flag is the source of truth: any instance can set it
//! and every instance polls it. A process-local set of run IDs acts as a
//! fast hint for producers running in the same process.

use runlog_core::domain::cancel::{CancelFlag, CancelState};
use runlog_core::domain::run::{RunRecord, RunStatus};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::validate_run_id;
use crate::repository::{BlobStore, StoreError, cancel_repository, run_repository};

/// Service error type
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("Run {0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CancelError>;

pub struct CancellationService {
    store: Arc<dyn BlobStore>,
    local: Mutex<HashSet<String>>,
}

impl CancellationService {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            local: Mutex::new(HashSet::new()),
        }
    }

    fn local(&self) -> MutexGuard<'_, HashSet<String>> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the in-process hint only; other instances do not see it
    pub fn request_cancel(&self, run_id: &str) {
        self.local().insert(run_id.to_string());
        debug!("Local cancel hint set for run {}", run_id);
    }

    /// Drop the in-process hint of a finished or deleted run
    pub fn forget(&self, run_id: &str) {
        if self.local().remove(run_id) {
            debug!("Local cancel hint cleared for run {}", run_id);
        }
    }

    /// Durably request cancellation of an in-progress run
    ///
    /// Returns `false` if the run is unknown or finished without being
    /// cancelled. Asking again for a run that is already being cancelled
    /// returns `true` without touching the stored flag.
    pub async fn request_cancel_run(&self, run_id: &str) -> Result<bool> {
        validate_run_id(run_id).map_err(CancelError::ValidationError)?;

        let Some(record) = run_repository::find_by_id(self.store.as_ref(), run_id).await? else {
            debug!("Cancel requested for unknown run {}", run_id);
            return Ok(false);
        };

        match record.status {
            RunStatus::Running => {}
            RunStatus::Cancelled => {
                self.request_cancel(run_id);
                return Ok(true);
            }
            status => {
                debug!(
                    "Cancel requested for run {} in terminal state {:?}",
                    run_id, status
                );
                self.forget(run_id);
                return Ok(false);
            }
        }

        if cancel_repository::find_by_run(self.store.as_ref(), run_id)
            .await?
            .is_some()
        {
            self.request_cancel(run_id);
            return Ok(true);
        }

        cancel_repository::save(self.store.as_ref(), &CancelFlag::requested(run_id)).await?;
        self.request_cancel(run_id);

        info!("Cancellation requested for run {}", run_id);

        Ok(true)
    }

    /// Mark the run cancelled right away, before the producer notices
    pub async fn cancel_run(&self, run_id: &str, reason: Option<String>) -> Result<RunRecord> {
        validate_run_id(run_id).map_err(CancelError::ValidationError)?;

        let mut record = run_repository::find_by_id(self.store.as_ref(), run_id)
            .await?
            .ok_or_else(|| CancelError::NotFound(run_id.to_string()))?;

        match record.status {
            RunStatus::Running => {}
            RunStatus::Cancelled => return Ok(record),
            status => {
                return Err(CancelError::InvalidState(format!(
                    "Cannot cancel run {} in state {:?}",
                    run_id, status
                )));
            }
        }

        record.status = RunStatus::Cancelled;
        record.completed_at = Some(chrono::Utc::now());
        record.cancel_reason = reason;
        run_repository::save(self.store.as_ref(), &record).await?;

        info!("Run {} marked cancelled", run_id);

        Ok(record)
    }

    /// Whether a producer should stop: local hint first, then the durable flag
    pub async fn is_cancel_requested(&self, run_id: &str) -> Result<bool> {
        if self.local().contains(run_id) {
            return Ok(true);
        }

        validate_run_id(run_id).map_err(CancelError::ValidationError)?;

        let flag = cancel_repository::find_by_run(self.store.as_ref(), run_id).await?;
        Ok(flag.is_some())
    }

    /// Producer-side acknowledgement of a requested cancel
    ///
    /// Returns `false` if no cancel was requested.
    pub async fn acknowledge(&self, run_id: &str) -> Result<bool> {
        validate_run_id(run_id).map_err(CancelError::ValidationError)?;

        let Some(mut flag) = cancel_repository::find_by_run(self.store.as_ref(), run_id).await?
        else {
            return Ok(false);
        };

        if flag.state == CancelState::Requested {
            flag.state = CancelState::Acknowledged;
            flag.acknowledged_at = Some(chrono::Utc::now());
            cancel_repository::save(self.store.as_ref(), &flag).await?;
            info!("Cancellation of run {} acknowledged", run_id);
        }

        Ok(true)
    }

    /// Poll until cancellation of `run_id` is observed or the run ends
    ///
    /// A run that finishes without being cancelled, or whose record is
    /// gone, resolves to [`WaitOutcome::Finished`]. Read failures are logged
    /// and retried on the next tick.
    pub async fn wait_for_cancel(&self, run_id: &str, interval: Duration) -> WaitOutcome {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match self.poll_once(run_id).await {
                Ok(Some(outcome)) => {
                    if outcome == WaitOutcome::Finished {
                        self.forget(run_id);
                    }
                    return outcome;
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to check cancellation of run {}: {}", run_id, e),
            }
        }
    }

    async fn poll_once(&self, run_id: &str) -> Result<Option<WaitOutcome>> {
        if self.is_cancel_requested(run_id).await? {
            return Ok(Some(WaitOutcome::Cancelled));
        }

        let outcome = match run_repository::find_by_id(self.store.as_ref(), run_id).await? {
            None => Some(WaitOutcome::Finished),
            Some(record) => match record.status {
                RunStatus::Running => None,
                RunStatus::Cancelled => Some(WaitOutcome::Cancelled),
                _ => Some(WaitOutcome::Finished),
            },
        };

        Ok(outcome)
    }
}

/// How [`CancellationService::wait_for_cancel`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Cancelled,
    Finished,
}
