//! Retention
//!
//! Age-based deletion of whole runs. A run is expired when the newest blob
//! under `runs/<run_id>/` is older than the cutoff.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use super::log_buffer::LogBuffer;
use crate::repository::{BlobStore, RUNS_PREFIX, StoreError, run_prefix, run_repository};

/// Delete every run whose last write is older than `max_age`
///
/// Runs with entries still buffered on this instance are kept.
/// Returns the IDs of the deleted runs.
pub async fn prune_runs_older_than(
    store: &dyn BlobStore,
    buffer: &LogBuffer,
    max_age: chrono::Duration,
) -> Result<Vec<String>, StoreError> {
    let cutoff = Utc::now() - max_age;

    let mut newest: HashMap<String, DateTime<Utc>> = HashMap::new();
    for blob in store.list(RUNS_PREFIX).await? {
        let Some((run_id, _)) = blob.path[RUNS_PREFIX.len()..].split_once('/') else {
            continue;
        };
        newest
            .entry(run_id.to_string())
            .and_modify(|t| *t = (*t).max(blob.uploaded_at))
            .or_insert(blob.uploaded_at);
    }

    let mut expired: Vec<String> = newest
        .into_iter()
        .filter(|(run_id, last_write)| *last_write < cutoff && buffer.pending(run_id) == 0)
        .map(|(run_id, _)| run_id)
        .collect();

    if expired.is_empty() {
        return Ok(expired);
    }
    expired.sort();

    for run_id in &expired {
        for blob in store.list(&run_prefix(run_id)).await? {
            store.delete(&blob.path).await?;
        }
        debug!("Deleted expired run {}", run_id);
    }

    if let Some(mut index) = run_repository::read_index(store).await? {
        let before = index.runs.len();
        index.runs.retain(|r| !expired.contains(&r.run_id));
        if index.runs.len() != before {
            run_repository::write_index(store, &index).await?;
        }
    }

    info!("Pruned {} expired runs", expired.len());

    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryBlobStore, log_key, log_repository, run_key};
    use runlog_core::domain::log::{LogEntry, LogLevel};
    use runlog_core::domain::run::RunRecord;
    use std::sync::Arc;

    async fn seed_run(store: &MemoryBlobStore, run_id: &str) {
        let record = RunRecord::started(run_id, None);
        run_repository::save(store, &record).await.unwrap();
        run_repository::prepend_to_index(store, &record).await.unwrap();
        log_repository::append(store, run_id, &[LogEntry::new(run_id, LogLevel::Info, "hi")])
            .await
            .unwrap();
    }

    fn age(store: &MemoryBlobStore, run_id: &str, days: i64) {
        let at = Utc::now() - chrono::Duration::days(days);
        store.set_uploaded_at(&log_key(run_id), at);
        store.set_uploaded_at(&run_key(run_id), at);
    }

    #[tokio::test]
    async fn test_prune_deletes_only_expired_runs() {
        let store = Arc::new(MemoryBlobStore::new());
        let buffer = LogBuffer::new(store.clone(), 50);

        seed_run(&store, "old").await;
        seed_run(&store, "new").await;
        age(&store, "old", 10);

        let pruned = prune_runs_older_than(store.as_ref(), &buffer, chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(pruned, vec!["old".to_string()]);

        assert!(store.list(&run_prefix("old")).await.unwrap().is_empty());
        assert!(!store.list(&run_prefix("new")).await.unwrap().is_empty());

        let index = run_repository::read_index(store.as_ref())
            .await
            .unwrap()
            .unwrap();
        let ids: Vec<_> = index.runs.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[tokio::test]
    async fn test_prune_keeps_run_with_recent_write() {
        let store = Arc::new(MemoryBlobStore::new());
        let buffer = LogBuffer::new(store.clone(), 50);

        seed_run(&store, "r1").await;
        // Only the record is old; the log was written just now
        store.set_uploaded_at(&run_key("r1"), Utc::now() - chrono::Duration::days(30));

        let pruned = prune_runs_older_than(store.as_ref(), &buffer, chrono::Duration::days(7))
            .await
            .unwrap();
        assert!(pruned.is_empty());
    }

    #[tokio::test]
    async fn test_prune_skips_runs_with_buffered_entries() {
        let store = Arc::new(MemoryBlobStore::new());
        let buffer = LogBuffer::new(store.clone(), 50);

        seed_run(&store, "r1").await;
        age(&store, "r1", 10);
        buffer
            .append(LogEntry::new("r1", LogLevel::Info, "late"))
            .await;

        let pruned = prune_runs_older_than(store.as_ref(), &buffer, chrono::Duration::days(7))
            .await
            .unwrap();
        assert!(pruned.is_empty());
        assert!(log_repository::read(store.as_ref(), "r1").await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_empty_store() {
        let store = Arc::new(MemoryBlobStore::new());
        let buffer = LogBuffer::new(store.clone(), 50);

        let pruned = prune_runs_older_than(store.as_ref(), &buffer, chrono::Duration::days(1))
            .await
            .unwrap();
        assert!(pruned.is_empty());
    }
}
