use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ActionItem, Digest, Session};

/// Overview previews in list responses are cut to this many characters.
pub const OVERVIEW_PREVIEW_CHARS: usize = 200;

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 100;

// -- Digests --

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDigestRequest {
    // Missing and blank transcripts get the same "required" error
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestResponse {
    pub digest: Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestListItem {
    pub id: Uuid,
    pub public_id: Uuid,
    pub overview: String,
    pub key_decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub is_public: bool,
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Digest> for DigestListItem {
    fn from(d: Digest) -> Self {
        Self {
            id: d.id,
            public_id: d.public_id,
            overview: preview(&d.overview),
            key_decisions: d.key_decisions,
            action_items: d.action_items,
            is_public: d.is_public,
            session_id: d.session_id,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDigestsResponse {
    pub digests: Vec<DigestListItem>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub session_id: Option<Uuid>,
}

/// `?session_id=` on count and clear.
#[derive(Debug, Default, Deserialize)]
pub struct SessionFilter {
    pub session_id: Option<Uuid>,
}

fn default_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

/// Shared digests omit the transcript; the share link is meant for the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDigest {
    pub public_id: Uuid,
    pub overview: String,
    pub key_decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub created_at: DateTime<Utc>,
}

impl From<Digest> for SharedDigest {
    fn from(d: Digest) -> Self {
        Self {
            public_id: d.public_id,
            overview: d.overview,
            key_decisions: d.key_decisions,
            action_items: d.action_items,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDigestResponse {
    pub digest: SharedDigest,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisibilityRequest {
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

// -- Sessions --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session: Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSessionResponse {
    pub session_id: Uuid,
    pub deleted_digests: u64,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
    pub provider: String,
    pub model: String,
}

/// Cut `text` to the preview length on a char boundary, marking the cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(OVERVIEW_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
