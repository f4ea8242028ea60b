use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use recap_types::api::{DeleteSessionResponse, ListSessionsResponse, SessionResponse};

use crate::convert::{parse_id, row_to_session};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

fn session_id(raw: &str) -> Result<String, ApiError> {
    parse_id(raw).ok_or(ApiError::SessionNotFound)
}

pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::new_v4().to_string();
    let row = blocking(&state, move |db| db.create_session(&id)).await?;
    info!("Session {} created", row.id);
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session: row_to_session(row),
        }),
    ))
}

pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<ListSessionsResponse>, ApiError> {
    let rows = blocking(&state, |db| db.list_sessions()).await?;
    Ok(Json(ListSessionsResponse {
        sessions: rows.into_iter().map(row_to_session).collect(),
    }))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = session_id(&id)?;
    let row = blocking(&state, move |db| db.get_session(&id))
        .await?
        .ok_or(ApiError::SessionNotFound)?;
    Ok(Json(SessionResponse {
        session: row_to_session(row),
    }))
}

/// Deletes the session and every digest filed under it.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, ApiError> {
    let session_id: Uuid = id.parse().map_err(|_| ApiError::SessionNotFound)?;
    let target = session_id.to_string();
    let deleted_digests = blocking(&state, move |db| db.delete_session(&target))
        .await?
        .ok_or(ApiError::SessionNotFound)?;

    info!("Session {} deleted with {} digests", session_id, deleted_digests);
    Ok(Json(DeleteSessionResponse {
        session_id,
        deleted_digests,
    }))
}
