//! Run domain types

use serde::{Deserialize, Serialize};

/// Generates an ID for a run whose producer did not supply one
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Metadata record for a single run
///
/// Persisted per run and updated when the run reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: RunStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl RunRecord {
    /// Creates a record for a run that has just started
    pub fn started(run_id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            run_id: run_id.into(),
            name,
            status: RunStatus::Running,
            started_at: chrono::Utc::now(),
            completed_at: None,
            cancel_reason: None,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            name: self.name.clone(),
            started_at: self.started_at,
        }
    }
}

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Whether the run can no longer make progress
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Entry of the run index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Newest-first list of runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunIndex {
    #[serde(default)]
    pub runs: Vec<RunSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

impl RunIndex {
    /// The most recently started run, if any
    pub fn latest(&self) -> Option<&RunSummary> {
        self.runs.first()
    }

    /// Puts a run at the head of the index
    pub fn prepend(&mut self, summary: RunSummary) {
        self.runs.retain(|r| r.run_id != summary.run_id);
        self.runs.insert(0, summary);
        self.last_updated = Some(chrono::Utc::now());
    }
}
