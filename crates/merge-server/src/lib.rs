//! Router and handlers for the merge demo service.
//!
//! Two endpoints: an unauthenticated status probe and a merge submission
//! guarded by a [`Gate`]. A granted merge runs as a detached background task
//! that holds the branch's permit for the simulated duration; the HTTP
//! response never waits for it.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use branch_gate::{Gate, GateConfig, GateError, Permit};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// A simple message response.
#[derive(Debug, Serialize)]
pub struct SimpleMessage {
    pub message: String,
}

/// Error body for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// A merge request; just the branch name, for simplicity.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub branch_name: String,
}

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    gate: Gate<String>,
    merge_duration: Duration,
}

impl AppState {
    /// Creates fresh state with its own isolated gate.
    pub fn new(merge_duration: Duration) -> Self {
        Self {
            gate: GateConfig::builder().name("merge-gate").build(),
            merge_duration,
        }
    }
}

/// Builds the router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/public/test", get(public_test))
        .route("/merge", post(merge_branches))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A test public get endpoint returning a simple message.
async fn public_test() -> Json<SimpleMessage> {
    Json(SimpleMessage {
        message: "anyone can see this".to_string(),
    })
}

/// Submits a merge for a branch.
///
/// If the branch is free, schedules the simulated merge in the background and
/// acknowledges immediately; if it is already being merged, rejects with 400.
async fn merge_branches(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Response {
    match state.gate.try_acquire(req.branch_name) {
        Ok(permit) => {
            let message = format!("merge for branch: {} in progress", permit.key());
            tokio::spawn(run_merge(permit, state.merge_duration));
            Json(SimpleMessage { message }).into_response()
        }
        Err(GateError::Busy { key }) => {
            tracing::warn!(branch = %key, "merge requested but the branch is already in use");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorDetail {
                    detail: format!("Branch {key} already in use!"),
                }),
            )
                .into_response()
        }
    }
}

/// The simulated merge. Owns the permit; the branch is released when this
/// task finishes, whatever happens inside it.
async fn run_merge(permit: Permit<String>, duration: Duration) {
    tracing::info!(branch = %permit.key(), "merging branch");
    tokio::time::sleep(duration).await;
}
