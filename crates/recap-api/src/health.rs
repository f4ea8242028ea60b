use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::error;

use recap_types::api::HealthResponse;

use crate::state::{AppState, blocking};

/// GET /health
///
/// 200 when the database answers, 503 otherwise. The provider is reported
/// but never called.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match blocking(&state, |db| db.ping()).await {
        Ok(()) => ("ok", StatusCode::OK, "connected".to_string()),
        Err(e) => {
            error!("Health check: database unavailable: {}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now(),
            database,
            provider: state.llm.name().to_string(),
            model: state.llm.model().to_string(),
        }),
    )
}
