//! Cancellation domain types

use serde::{Deserialize, Serialize};

/// Durable cancellation marker for a run
///
/// Absence of a flag means no cancellation was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelFlag {
    pub run_id: String,
    pub state: CancelState,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CancelFlag {
    pub fn requested(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: CancelState::Requested,
            requested_at: chrono::Utc::now(),
            acknowledged_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelState {
    /// A cancel was asked for and the producer has not seen it yet
    Requested,
    /// The producer observed the flag and is unwinding
    Acknowledged,
}
