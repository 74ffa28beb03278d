//! Run API Handlers
//!
//! HTTP endpoints for run registration and completion.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use runlog_core::domain::run::{RunRecord, RunSummary};
use runlog_core::dto::run::{CompleteRun, StartRun};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// POST /runs
/// Register a run and make it the latest
pub async fn start_run(
    State(state): State<AppState>,
    Json(req): Json<StartRun>,
) -> ApiResult<(StatusCode, Json<RunRecord>)> {
    let record = state.runs.start_run(req).await?;

    tracing::info!("Started run: {}", record.run_id);

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /runs
/// List runs, newest first
pub async fn list_runs(State(state): State<AppState>) -> ApiResult<Json<Vec<RunSummary>>> {
    tracing::debug!("Listing runs");

    Ok(Json(state.runs.list_runs().await?))
}

/// GET /runs/latest
/// The most recently started run
pub async fn get_latest_run(State(state): State<AppState>) -> ApiResult<Json<RunRecord>> {
    let run_id = state
        .runs
        .latest_run_id()
        .await?
        .ok_or_else(|| ApiError::NotFound("No runs found".to_string()))?;

    Ok(Json(state.runs.get_run(&run_id).await?))
}

/// GET /runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunRecord>> {
    tracing::debug!("Getting run: {}", id);

    Ok(Json(state.runs.get_run(&id).await?))
}

/// POST /runs/{id}/complete
/// Flush the run's buffered logs and record its terminal status
pub async fn complete_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CompleteRun>,
) -> ApiResult<Json<RunRecord>> {
    tracing::info!("Completing run: {} with status {:?}", id, req.status);

    let record = state.runs.complete_run(&id, req.status).await?;
    state.cancel.forget(&id);

    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::state_with;
    use crate::repository::MemoryBlobStore;
    use runlog_core::domain::run::RunStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_complete_run_drops_local_cancel_hint() {
        let state = state_with(Arc::new(MemoryBlobStore::new()));
        let record = state
            .runs
            .start_run(StartRun {
                run_id: Some("r1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        state.cancel.request_cancel(&record.run_id);

        let Json(done) = complete_run(
            State(state.clone()),
            Path("r1".to_string()),
            Json(CompleteRun {
                status: RunStatus::Completed,
            }),
        )
        .await
        .unwrap();

        assert_eq!(done.status, RunStatus::Completed);
        assert!(!state.cancel.is_cancel_requested("r1").await.unwrap());
    }
}
