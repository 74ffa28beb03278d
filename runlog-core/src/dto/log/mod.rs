//! Log DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::{LogEntry, LogLevel};

/// A slice of a run's log starting at the requested cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    pub logs: Vec<LogEntry>,
    pub next_cursor: usize,
}

/// Log page for whichever run is currently the newest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestLogPage {
    pub logs: Vec<LogEntry>,
    pub next_cursor: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl LatestLogPage {
    /// Page returned when there is no run yet
    pub fn empty() -> Self {
        Self {
            logs: Vec::new(),
            next_cursor: 0,
            run_id: None,
        }
    }
}

/// Query string for cursor-addressed reads
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CursorQuery {
    #[serde(default)]
    pub cursor: usize,
}

/// Log event sent by a producer; the run ID comes from the request path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl NewLogEntry {
    /// Binds the event to its run
    pub fn into_entry(self, run_id: &str) -> LogEntry {
        LogEntry {
            timestamp: self.timestamp.unwrap_or_else(chrono::Utc::now),
            level: self.level,
            agent: self.agent,
            message: self.message,
            data: self.data,
            run_id: run_id.to_string(),
        }
    }
}

/// Number of entries accepted into the write buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

/// Result of an explicit flush
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushResponse {
    pub flushed: usize,
}
