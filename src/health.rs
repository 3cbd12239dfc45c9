// src/health.rs
//! Liveness check covering the database and the ephemeral store

use axum::{extract::Extension, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::common::{ApiError, AppState};

#[derive(Serialize, Debug)]
pub struct PingResponse {
    pub ping: &'static str,
}

pub fn health_routes() -> Router {
    Router::new().route("/ping", get(ping_handler))
}

/// GET /ping
pub async fn ping_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<PingResponse>, ApiError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database health check failed");
            ApiError::ServiceUnavailable("database unavailable".to_string())
        })?;

    state.store.ping().await.map_err(|e| {
        error!(error = %e, backend = state.store.backend(), "Store health check failed");
        ApiError::ServiceUnavailable("ephemeral store unavailable".to_string())
    })?;

    debug!(store = state.store.backend(), "Health check passed");
    Ok(Json(PingResponse { ping: "pong" }))
}
