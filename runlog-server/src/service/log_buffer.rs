//! Log buffer service
//!
//! Per-run, in-memory write buffer in front of the durable log store.
//!
//! Producers append entries here; a run's queue is flushed to the blob
//! store when it reaches the flush threshold, when a flush is requested
//! explicitly and on the periodic background tick. The buffer belongs to
//! this process only: other instances cannot see entries until they are
//! flushed, and unflushed entries are lost if the process dies.

use runlog_core::domain::log::LogEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

use crate::repository::{BlobStore, StoreError, log_repository};

pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

/// Durable and buffered halves of a run's log, captured together
#[derive(Debug, Clone, Default)]
pub struct RunLogSnapshot {
    /// `None` if the run has never been flushed
    pub durable: Option<Vec<LogEntry>>,
    pub buffered: Vec<LogEntry>,
}

/// In-memory log buffer keyed by run ID
pub struct LogBuffer {
    store: Arc<dyn BlobStore>,
    queues: Mutex<HashMap<String, Vec<LogEntry>>>,
    flush_threshold: usize,
    // Serializes flushes with each other and with snapshots
    flush_lock: tokio::sync::Mutex<()>,
}

impl LogBuffer {
    /// Creates a new buffer flushing into `store`
    pub fn new(store: Arc<dyn BlobStore>, flush_threshold: usize) -> Self {
        Self {
            store,
            queues: Mutex::new(HashMap::new()),
            flush_threshold: flush_threshold.max(1),
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, Vec<LogEntry>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an entry to the tail of its run's queue
    ///
    /// Flushes the run when its queue reaches the threshold. Storage
    /// failures are logged and the entries stay buffered for the next flush.
    pub async fn append(&self, entry: LogEntry) {
        let run_id = entry.run_id.clone();

        let pending = {
            let mut queues = self.queues();
            let queue = queues.entry(run_id.clone()).or_default();
            queue.push(entry);
            queue.len()
        };

        if pending >= self.flush_threshold {
            debug!(
                "Log buffer for run {} reached {} entries, flushing",
                run_id, pending
            );
            if let Err(e) = self.flush(&run_id).await {
                error!("Failed to flush logs for run {}: {}", run_id, e);
            }
        }
    }

    /// Writes a run's buffered entries to the durable store
    ///
    /// Entries are only removed from the buffer once the durable append
    /// succeeded. Returns the number of entries flushed.
    pub async fn flush(&self, run_id: &str) -> Result<usize, StoreError> {
        let _guard = self.flush_lock.lock().await;
        self.flush_locked(run_id).await
    }

    /// Flushes every run with buffered entries
    ///
    /// Failures are logged per run and do not stop the other runs.
    pub async fn flush_all(&self) -> usize {
        let run_ids: Vec<String> = self
            .queues()
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(run_id, _)| run_id.clone())
            .collect();

        let mut flushed = 0;
        for run_id in run_ids {
            match self.flush(&run_id).await {
                Ok(n) => flushed += n,
                Err(e) => error!("Failed to flush logs for run {}: {}", run_id, e),
            }
        }
        flushed
    }

    /// Captures the durable log and the buffered queue of a run consistently
    pub async fn snapshot(&self, run_id: &str) -> Result<RunLogSnapshot, StoreError> {
        let _guard = self.flush_lock.lock().await;

        let durable = match log_repository::read(self.store.as_ref(), run_id).await {
            Ok(entries) => Some(entries),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let buffered = self.queues().get(run_id).cloned().unwrap_or_default();

        Ok(RunLogSnapshot { durable, buffered })
    }

    /// Number of entries waiting to be flushed for a run
    pub fn pending(&self, run_id: &str) -> usize {
        self.queues().get(run_id).map_or(0, Vec::len)
    }

    async fn flush_locked(&self, run_id: &str) -> Result<usize, StoreError> {
        let batch: Vec<LogEntry> = {
            let queues = self.queues();
            match queues.get(run_id) {
                Some(queue) if !queue.is_empty() => queue.clone(),
                _ => return Ok(0),
            }
        };

        log_repository::append(self.store.as_ref(), run_id, &batch).await?;

        let mut queues = self.queues();
        if let Some(queue) = queues.get_mut(run_id) {
            let flushed = batch.len().min(queue.len());
            queue.drain(..flushed);
            if queue.is_empty() {
                queues.remove(run_id);
            }
        }

        debug!("Flushed {} log entries for run {}", batch.len(), run_id);
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::blob::testing::InstrumentedBlobStore;
    use runlog_core::domain::log::LogLevel;

    fn entry(run_id: &str, message: impl Into<String>) -> LogEntry {
        LogEntry::new(run_id, LogLevel::Info, message)
    }

    fn setup(threshold: usize) -> (Arc<InstrumentedBlobStore>, LogBuffer) {
        let store = Arc::new(InstrumentedBlobStore::new());
        let buffer = LogBuffer::new(store.clone(), threshold);
        (store, buffer)
    }

    async fn durable_messages(store: &InstrumentedBlobStore, run_id: &str) -> Vec<String> {
        log_repository::read(store, run_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[tokio::test]
    async fn test_flush_preserves_append_order() {
        let (store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        for i in 0..10 {
            buffer.append(entry("r1", format!("m{}", i))).await;
        }
        assert_eq!(buffer.flush("r1").await.unwrap(), 10);

        let expected: Vec<String> = (0..10).map(|i| format!("m{}", i)).collect();
        assert_eq!(durable_messages(&store, "r1").await, expected);
        assert_eq!(buffer.pending("r1"), 0);
    }

    #[tokio::test]
    async fn test_threshold_triggers_exactly_one_flush() {
        let (store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        for i in 0..50 {
            buffer.append(entry("r1", format!("m{}", i))).await;
        }

        assert_eq!(store.put_count(), 1);
        assert_eq!(durable_messages(&store, "r1").await.len(), 50);
        assert_eq!(buffer.pending("r1"), 0);
    }

    #[tokio::test]
    async fn test_below_threshold_does_not_flush() {
        let (store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        for i in 0..49 {
            buffer.append(entry("r1", format!("m{}", i))).await;
        }

        assert_eq!(store.put_count(), 0);
        assert_eq!(buffer.pending("r1"), 49);
        assert!(
            log_repository::read(store.as_ref(), "r1")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_entries_for_retry() {
        let (store, buffer) = setup(3);
        store.fail_puts(true);

        // Threshold flush fails silently from the producer's point of view
        for i in 0..3 {
            buffer.append(entry("r1", format!("m{}", i))).await;
        }
        assert_eq!(buffer.pending("r1"), 3);
        assert!(buffer.flush("r1").await.is_err());
        assert_eq!(buffer.pending("r1"), 3);

        store.fail_puts(false);
        assert_eq!(buffer.flush("r1").await.unwrap(), 3);
        assert_eq!(durable_messages(&store, "r1").await, vec!["m0", "m1", "m2"]);
    }

    #[tokio::test]
    async fn test_runs_flush_independently() {
        let (store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        buffer.append(entry("r1", "a")).await;
        buffer.append(entry("r2", "x")).await;
        buffer.append(entry("r1", "b")).await;

        buffer.flush("r1").await.unwrap();

        assert_eq!(durable_messages(&store, "r1").await, vec!["a", "b"]);
        assert_eq!(buffer.pending("r2"), 1);
        assert!(
            log_repository::read(store.as_ref(), "r2")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_flush_empty_queue_is_noop() {
        let (store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        assert_eq!(buffer.flush("r1").await.unwrap(), 0);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_all_flushes_every_run() {
        let (store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        buffer.append(entry("r1", "a")).await;
        buffer.append(entry("r2", "b")).await;
        buffer.append(entry("r2", "c")).await;

        assert_eq!(buffer.flush_all().await, 3);
        assert_eq!(durable_messages(&store, "r1").await, vec!["a"]);
        assert_eq!(durable_messages(&store, "r2").await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_snapshot_splits_durable_and_buffered() {
        let (_store, buffer) = setup(DEFAULT_FLUSH_THRESHOLD);

        buffer.append(entry("r1", "a")).await;
        buffer.flush("r1").await.unwrap();
        buffer.append(entry("r1", "b")).await;

        let snapshot = buffer.snapshot("r1").await.unwrap();
        assert_eq!(snapshot.durable.unwrap().len(), 1);
        assert_eq!(snapshot.buffered.len(), 1);
        assert_eq!(snapshot.buffered[0].message, "b");

        let empty = buffer.snapshot("unknown").await.unwrap();
        assert!(empty.durable.is_none());
        assert!(empty.buffered.is_empty());
    }
}
