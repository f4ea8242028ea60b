use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use recap_llm::parse::parse_digest;
use recap_llm::prompt::structured_digest_prompt;
use recap_types::api::{
    CountResponse, CreateDigestRequest, DeleteResponse, DigestListItem, DigestResponse,
    ListDigestsResponse, ListQuery, MAX_LIST_LIMIT, SessionFilter, SharedDigestResponse,
    VisibilityRequest,
};
use recap_types::models::DigestContent;

use crate::convert::{parse_id, row_to_digest};
use crate::error::ApiError;
use crate::extract::{JsonBody, QueryParams};
use crate::state::{AppState, blocking, require_session, validate_transcript};

fn digest_id(raw: &str) -> Result<String, ApiError> {
    parse_id(raw).ok_or(ApiError::NotFound)
}

async fn generate(state: &AppState, transcript: &str) -> Result<DigestContent, ApiError> {
    let prompt = structured_digest_prompt(transcript);
    let raw = state.llm.complete(&prompt).await?;
    Ok(parse_digest(&raw))
}

// -- Collection --

pub async fn create_digest(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateDigestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transcript = validate_transcript(&req.transcript, &state.limits)?;
    let session_id = require_session(&state, req.session_id).await?;
    let content = generate(&state, &transcript).await?;

    let (decisions, actions) = (content.key_decisions.len(), content.action_items.len());

    let id = Uuid::new_v4().to_string();
    let public_id = Uuid::new_v4().to_string();
    let row = blocking(&state, move |db| {
        db.insert_digest(&id, &public_id, session_id.as_deref(), &transcript, &content)
    })
    .await?;

    info!("Digest {} created ({} decisions, {} action items)", row.id, decisions, actions);

    Ok((
        StatusCode::CREATED,
        Json(DigestResponse {
            digest: row_to_digest(row),
        }),
    ))
}

pub async fn list_digests(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<ListDigestsResponse>, ApiError> {
    let limit = query.limit.clamp(1, MAX_LIST_LIMIT);
    let offset = query.offset;
    let session_id = require_session(&state, query.session_id).await?;

    let rows = blocking(&state, move |db| db.list_digests(limit, offset, session_id.as_deref())).await?;
    let digests = rows
        .into_iter()
        .map(|row| DigestListItem::from(row_to_digest(row)))
        .collect();

    Ok(Json(ListDigestsResponse {
        digests,
        limit,
        offset,
    }))
}

pub async fn count_digests(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<SessionFilter>,
) -> Result<Json<CountResponse>, ApiError> {
    let session_id = require_session(&state, filter.session_id).await?;
    let count = blocking(&state, move |db| db.count_digests(session_id.as_deref())).await?;
    Ok(Json(CountResponse { count }))
}

/// DELETE /api/digests, optionally scoped with `?session_id=`.
pub async fn clear_digests(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<SessionFilter>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let session_id = require_session(&state, filter.session_id).await?;
    let scope = session_id.clone();
    let deleted = blocking(&state, move |db| db.clear_digests(scope.as_deref())).await?;
    match session_id {
        Some(session_id) => info!("Cleared {} digests from session {}", deleted, session_id),
        None => warn!("Cleared all digests ({} removed)", deleted),
    }
    Ok(Json(DeleteResponse { deleted }))
}

// -- Single digest --

pub async fn get_digest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DigestResponse>, ApiError> {
    let id = digest_id(&id)?;
    let row = blocking(&state, move |db| db.get_digest(&id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(DigestResponse {
        digest: row_to_digest(row),
    }))
}

/// Re-run generation for a new transcript, keeping both ids.
pub async fn regenerate_digest(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateDigestRequest>,
) -> Result<Json<DigestResponse>, ApiError> {
    let id = digest_id(&id)?;
    let transcript = validate_transcript(&req.transcript, &state.limits)?;

    // Don't spend a model call on a digest that isn't there
    let lookup_id = id.clone();
    if blocking(&state, move |db| db.get_digest(&lookup_id)).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let content = generate(&state, &transcript).await?;
    let row = blocking(&state, move |db| db.replace_content(&id, &transcript, &content))
        .await?
        .ok_or(ApiError::NotFound)?;

    info!("Digest {} regenerated", row.id);
    Ok(Json(DigestResponse {
        digest: row_to_digest(row),
    }))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<VisibilityRequest>,
) -> Result<Json<DigestResponse>, ApiError> {
    let id = digest_id(&id)?;
    let row = blocking(&state, move |db| db.update_visibility(&id, req.is_public))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(DigestResponse {
        digest: row_to_digest(row),
    }))
}

pub async fn delete_digest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = digest_id(&id)?;
    let removed_id = id.clone();
    if !blocking(&state, move |db| db.delete_digest(&id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("Digest {} deleted", removed_id);
    Ok(Json(DeleteResponse { deleted: 1 }))
}

// -- Sharing --

pub async fn get_shared_digest(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<SharedDigestResponse>, ApiError> {
    let public_id = digest_id(&public_id)?;
    let row = blocking(&state, move |db| db.get_digest_by_public_id(&public_id))
        .await?
        .filter(|row| row.is_public)
        .ok_or(ApiError::NotFound)?;
    Ok(Json(SharedDigestResponse {
        digest: row_to_digest(row).into(),
    }))
}
