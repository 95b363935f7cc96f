use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::app::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) version: &'static str,
    pub(crate) build_commit: Option<&'static str>,
    pub(crate) uptime_seconds: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route(super::HEALTH_PATH, get(health))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    let version = env!("CARGO_PKG_VERSION");
    let build_commit = option_env!("GIT_COMMIT");
    let timeout = state.config.store.ping_timeout();

    let reachable = match tokio::time::timeout(timeout, state.store.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::warn!(event = "health_ping_failed", error = %err);
            false
        }
        Err(_) => {
            tracing::warn!(event = "health_ping_timeout", timeout_ms = timeout.as_millis() as u64);
            false
        }
    };

    if reachable {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version,
                build_commit,
                uptime_seconds,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "db_error",
                version,
                build_commit,
                uptime_seconds,
            }),
        )
    }
}
