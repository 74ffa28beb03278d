//! Log Repository
//!
//! Durable, append-ordered storage of run logs as JSON Lines.
//!
//! The blob store has no native append, so appending is a read-modify-write
//! of the whole blob. This is only safe with a single writer per run.

use runlog_core::domain::log::LogEntry;

use super::blob::{BlobStore, JSONL_CONTENT_TYPE, StoreError};
use super::log_key;

/// Append entries after the existing durable content of a run's log
pub async fn append(
    store: &dyn BlobStore,
    run_id: &str,
    entries: &[LogEntry],
) -> Result<(), StoreError> {
    if entries.is_empty() {
        return Ok(());
    }

    let key = log_key(run_id);
    let mut content = match store.get(&key).await {
        Ok(existing) => existing,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    if !content.is_empty() && !content.ends_with(b"\n") {
        content.push(b'\n');
    }
    content.extend(encode_lines(entries)?);

    store.put(&key, content, JSONL_CONTENT_TYPE).await?;

    tracing::debug!("Appended {} log entries for run: {}", entries.len(), run_id);

    Ok(())
}

/// Read every durable entry of a run, in append order
///
/// Fails with `StoreError::NotFound` if the run never flushed.
pub async fn read(store: &dyn BlobStore, run_id: &str) -> Result<Vec<LogEntry>, StoreError> {
    let bytes = store.get(&log_key(run_id)).await?;
    Ok(parse_lines(&bytes))
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode entries as newline-terminated JSON lines
pub fn encode_lines(entries: &[LogEntry]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Decode JSON lines, skipping blank and malformed lines
pub fn parse_lines(bytes: &[u8]) -> Vec<LogEntry> {
    let text = String::from_utf8_lossy(bytes);

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping malformed log line {}: {}", n + 1, e);
                None
            }
        })
        .collect()
}

/// Bulk export format: one JSON object per line, no trailing newline
pub fn export(entries: &[LogEntry]) -> Result<String, serde_json::Error> {
    let lines = entries
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryBlobStore;
    use runlog_core::domain::log::LogLevel;

    fn entry(run_id: &str, message: &str) -> LogEntry {
        LogEntry::new(run_id, LogLevel::Info, message)
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.message.as_str()).collect()
    }

    #[tokio::test]
    async fn test_read_unwritten_run_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = read(&store, "r1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_append_preserves_order_across_batches() {
        let store = MemoryBlobStore::new();

        append(&store, "r1", &[entry("r1", "a"), entry("r1", "b")])
            .await
            .unwrap();
        append(&store, "r1", &[entry("r1", "c")]).await.unwrap();

        let entries = read(&store, "r1").await.unwrap();
        assert_eq!(messages(&entries), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_append_does_not_create_log() {
        let store = MemoryBlobStore::new();
        append(&store, "r1", &[]).await.unwrap();

        assert!(read(&store, "r1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_runs_are_isolated() {
        let store = MemoryBlobStore::new();
        append(&store, "r1", &[entry("r1", "one")]).await.unwrap();
        append(&store, "r2", &[entry("r2", "two")]).await.unwrap();

        assert_eq!(messages(&read(&store, "r1").await.unwrap()), vec!["one"]);
        assert_eq!(messages(&read(&store, "r2").await.unwrap()), vec!["two"]);
    }

    #[tokio::test]
    async fn test_append_after_unterminated_content() {
        let store = MemoryBlobStore::new();
        let first = serde_json::to_vec(&entry("r1", "a")).unwrap();
        store
            .put(&log_key("r1"), first, JSONL_CONTENT_TYPE)
            .await
            .unwrap();

        append(&store, "r1", &[entry("r1", "b")]).await.unwrap();

        assert_eq!(messages(&read(&store, "r1").await.unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let mut bytes = encode_lines(&[entry("r1", "a")]).unwrap();
        bytes.extend_from_slice(b"{not json\n\n{\"half\":\n");
        bytes.extend(encode_lines(&[entry("r1", "b")]).unwrap());

        let entries = parse_lines(&bytes);
        assert_eq!(messages(&entries), vec!["a", "b"]);
    }

    #[test]
    fn test_export_joins_with_single_newline() {
        let entries = vec![entry("r1", "a"), entry("r1", "b")];
        let exported = export(&entries).unwrap();

        let expected = format!(
            "{}\n{}",
            serde_json::to_string(&entries[0]).unwrap(),
            serde_json::to_string(&entries[1]).unwrap()
        );
        assert_eq!(exported, expected);
        assert!(!exported.ends_with('\n'));
        assert_eq!(export(&[]).unwrap(), "");
    }
}
