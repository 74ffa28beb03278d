//! Log streaming
//!
//! Turns repeated cursor reads into a lazy stream of new entries. There is
//! no push channel: the stream re-reads the run on a fixed interval and
//! gives up after a run of idle polls. Dropping the stream stops polling.

use futures::stream::{self, BoxStream, StreamExt};
use runlog_core::domain::log::LogEntry;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::log::{LogError, LogService};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_IDLE_LIMIT: u32 = 60;

pub type LogStream = BoxStream<'static, LogEntry>;

/// Polling parameters for log streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Wait between two polls
    pub poll_interval: Duration,
    /// Consecutive polls without new entries before the stream ends
    pub idle_limit: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_limit: DEFAULT_IDLE_LIMIT,
        }
    }
}

struct PollState {
    logs: Arc<LogService>,
    run_id: String,
    cursor: usize,
    idle: u32,
    pending: VecDeque<LogEntry>,
    polled: bool,
    settings: StreamSettings,
}

impl PollState {
    async fn poll_once(&mut self) {
        match self.logs.get_logs(&self.run_id, self.cursor).await {
            Ok(page) if !page.logs.is_empty() => {
                self.cursor = page.next_cursor;
                self.idle = 0;
                self.pending.extend(page.logs);
            }
            Ok(_) | Err(LogError::NotFound(_)) => self.idle += 1,
            Err(e) => {
                warn!("Log stream for run {} failed to read: {}", self.run_id, e);
                self.idle += 1;
            }
        }
    }
}

/// Streams entries of `run_id` from `start_cursor` onwards
///
/// The k-th yielded entry sits at position `start_cursor + k` of the run's
/// log, so a consumer can resume with a new stream from the last position
/// it saw plus one.
pub fn stream_logs(
    logs: Arc<LogService>,
    run_id: String,
    start_cursor: usize,
    settings: StreamSettings,
) -> LogStream {
    let state = PollState {
        logs,
        run_id,
        cursor: start_cursor,
        idle: 0,
        pending: VecDeque::new(),
        polled: false,
        settings,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(entry) = state.pending.pop_front() {
                return Some((entry, state));
            }

            if state.idle >= state.settings.idle_limit {
                debug!(
                    "Log stream for run {} idle after {} polls, ending at cursor {}",
                    state.run_id, state.idle, state.cursor
                );
                return None;
            }

            if state.polled {
                tokio::time::sleep(state.settings.poll_interval).await;
            }
            state.polled = true;

            state.poll_once().await;
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryBlobStore;
    use crate::repository::blob::testing::InstrumentedBlobStore;
    use crate::repository::BlobStore;
    use crate::service::log_buffer::{DEFAULT_FLUSH_THRESHOLD, LogBuffer};
    use runlog_core::domain::log::LogLevel;
    use std::time::Instant;

    fn fast() -> StreamSettings {
        StreamSettings {
            poll_interval: Duration::from_millis(5),
            idle_limit: 3,
        }
    }

    fn service(store: Arc<dyn BlobStore>, settings: StreamSettings) -> Arc<LogService> {
        let buffer = Arc::new(LogBuffer::new(store.clone(), DEFAULT_FLUSH_THRESHOLD));
        Arc::new(LogService::new(store, buffer, settings))
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry::new("r1", LogLevel::Info, message)
    }

    #[tokio::test]
    async fn test_stream_emits_existing_entries_then_ends() {
        let logs = service(Arc::new(MemoryBlobStore::new()), fast());
        logs.append(entry("a")).await.unwrap();
        logs.flush("r1").await.unwrap();
        logs.append(entry("b")).await.unwrap();

        let collected: Vec<String> = logs
            .stream_logs("r1", 0)
            .map(|e| e.message)
            .collect()
            .await;

        assert_eq!(collected, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stream_starts_at_cursor() {
        let logs = service(Arc::new(MemoryBlobStore::new()), fast());
        for m in ["a", "b", "c"] {
            logs.append(entry(m)).await.unwrap();
        }

        let collected: Vec<String> = logs
            .stream_logs("r1", 2)
            .map(|e| e.message)
            .collect()
            .await;

        assert_eq!(collected, vec!["c"]);
    }

    #[tokio::test]
    async fn test_idle_stream_terminates_without_entries() {
        let logs = service(Arc::new(MemoryBlobStore::new()), fast());
        logs.append(entry("a")).await.unwrap();

        let started = Instant::now();
        let collected: Vec<LogEntry> = logs.stream_logs("r1", 1).collect().await;

        assert!(collected.is_empty());
        // idle_limit polls with a sleep between each pair
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_unknown_run_ends_after_idle_limit() {
        let logs = service(Arc::new(MemoryBlobStore::new()), fast());

        let collected: Vec<LogEntry> = logs.stream_logs("never-started", 0).collect().await;
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_stream_picks_up_entries_appended_later() {
        let settings = StreamSettings {
            poll_interval: Duration::from_millis(10),
            idle_limit: 20,
        };
        let logs = service(Arc::new(MemoryBlobStore::new()), settings);
        logs.append(entry("first")).await.unwrap();

        let mut stream = logs.stream_logs("r1", 0);
        assert_eq!(stream.next().await.unwrap().message, "first");

        let producer = Arc::clone(&logs);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            producer.append(entry("second")).await.unwrap();
        });

        assert_eq!(stream.next().await.unwrap().message, "second");
    }

    #[tokio::test]
    async fn test_read_errors_count_as_idle() {
        let store = Arc::new(InstrumentedBlobStore::new());
        let logs = service(store.clone(), fast());
        logs.append(entry("a")).await.unwrap();
        store.fail_gets(true);

        let collected: Vec<LogEntry> = logs.stream_logs("r1", 0).collect().await;
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_default_settings() {
        let settings = StreamSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.idle_limit, 60);
    }
}
