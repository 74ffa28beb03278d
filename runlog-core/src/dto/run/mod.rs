//! Run and cancellation DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::RunStatus;

/// Request to register a new run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRun {
    /// Caller-chosen ID; one is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Terminal status reported by the producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRun {
    pub status: RunStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRunRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunResponse {
    pub cancelled: bool,
}

/// What a producer sees when it polls for cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelStatus {
    pub run_id: String,
    pub cancel_requested: bool,
}
