//! Cancellation API Handlers
//!
//! Any instance can cancel a run; producers poll the status endpoint and
//! acknowledge once they have stopped.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use runlog_core::dto::run::{CancelRunRequest, CancelRunResponse, CancelStatus};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// POST /runs/{id}/cancel
/// Request cancellation and mark the run cancelled
///
/// Responds 404 when the run is unknown or already finished. The
/// `{ "reason": ... }` body is optional.
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<CancelRunResponse>> {
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<CancelRunRequest>(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid cancel request: {}", e)))?
            .reason
    };

    tracing::info!("Cancel requested for run: {}", id);

    if !state.cancel.request_cancel_run(&id).await? {
        return Err(ApiError::NotFound(format!(
            "Run {} not found or not cancellable",
            id
        )));
    }

    state.cancel.cancel_run(&id, reason).await?;

    Ok(Json(CancelRunResponse { cancelled: true }))
}

/// GET /runs/{id}/cancel
/// Producer-side poll for a pending cancellation
pub async fn get_cancel_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelStatus>> {
    let cancel_requested = state.cancel.is_cancel_requested(&id).await?;

    Ok(Json(CancelStatus {
        run_id: id,
        cancel_requested,
    }))
}

/// POST /runs/{id}/cancel/ack
pub async fn acknowledge_cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.cancel.acknowledge(&id).await? {
        return Err(ApiError::NotFound(format!(
            "No cancellation requested for run {}",
            id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}
