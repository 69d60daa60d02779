//! Health and readiness probes.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is up.
    pub status: &'static str,
}

/// Liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness probe: verifies the store answers queries.
///
/// # Errors
///
/// Returns a 500 if the store is unreachable.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, AppError> {
    state.service.list_events(None, 1, 0).await?;
    Ok(Json(HealthResponse { status: "ok" }))
}
