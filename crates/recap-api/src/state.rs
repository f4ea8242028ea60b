use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use recap_db::Database;
use recap_llm::LlmProvider;

use crate::error::ApiError;

pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 100_000;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub llm: Arc<dyn LlmProvider>,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_transcript_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
        }
    }
}

impl AppStateInner {
    pub fn new(db: Database, llm: Arc<dyn LlmProvider>, limits: Limits) -> AppState {
        Arc::new(Self { db, llm, limits })
    }
}

/// Run a blocking DB call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::Database)
}

/// Resolve an optional session reference, failing when it names no session.
pub(crate) async fn require_session(state: &AppState, session_id: Option<Uuid>) -> Result<Option<String>, ApiError> {
    let Some(session_id) = session_id else {
        return Ok(None);
    };
    let id = session_id.to_string();
    let lookup = id.clone();
    match blocking(state, move |db| db.get_session(&lookup)).await? {
        Some(_) => Ok(Some(id)),
        None => Err(ApiError::SessionNotFound),
    }
}

/// Trimmed transcript, or a 400 explaining what is wrong with it.
pub(crate) fn validate_transcript(raw: &str, limits: &Limits) -> Result<String, ApiError> {
    let transcript = raw.trim();
    if transcript.is_empty() {
        return Err(ApiError::BadRequest("Transcript is required".into()));
    }
    if transcript.chars().count() > limits.max_transcript_chars {
        return Err(ApiError::BadRequest(format!(
            "Transcript is too long (limit is {} characters)",
            limits.max_transcript_chars
        )));
    }
    Ok(transcript.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_validation() {
        let limits = Limits {
            max_transcript_chars: 5,
        };
        assert_eq!(validate_transcript("  hey \n", &limits).unwrap(), "hey");
        assert!(matches!(validate_transcript(" \t\n", &limits), Err(ApiError::BadRequest(_))));
        assert!(matches!(validate_transcript("toolong", &limits), Err(ApiError::BadRequest(_))));
        // the limit counts chars, not bytes
        assert!(validate_transcript("ééééé", &limits).is_ok());
    }
}
