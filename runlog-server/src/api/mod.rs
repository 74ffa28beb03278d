//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod cancel;
pub mod error;
pub mod health;
pub mod log;
pub mod run;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::{CancellationService, LogService, RunService};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub logs: Arc<LogService>,
    pub runs: Arc<RunService>,
    pub cancel: Arc<CancellationService>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Run endpoints
        .route("/runs", post(run::start_run).get(run::list_runs))
        .route("/runs/latest", get(run::get_latest_run))
        .route("/runs/{id}", get(run::get_run))
        .route("/runs/{id}/complete", post(run::complete_run))
        // Log endpoints
        .route("/runs/{id}/logs", get(log::get_logs).post(log::add_logs))
        .route("/runs/{id}/logs/flush", post(log::flush_logs))
        .route("/runs/{id}/logs/stream", get(log::stream_logs))
        .route("/runs/{id}/logs/export", get(log::export_logs))
        .route("/logs/latest", get(log::get_latest_logs))
        // Cancellation endpoints
        .route(
            "/runs/{id}/cancel",
            post(cancel::cancel_run).get(cancel::get_cancel_status),
        )
        .route("/runs/{id}/cancel/ack", post(cancel::acknowledge_cancel))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
