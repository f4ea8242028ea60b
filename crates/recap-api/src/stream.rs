use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use recap_llm::LlmError;
use recap_llm::parse::parse_digest;
use recap_llm::prompt::digest_prompt;
use recap_types::api::CreateDigestRequest;
use recap_types::events::StreamEvent;

use crate::convert::row_to_digest;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, blocking, require_session, validate_transcript};

const SAVE_FAILED: &str = "Failed to save digest";

/// POST /api/digests/stream
///
/// Validation failures are plain JSON errors. Once the stream is open every
/// outcome, failures included, is reported as an event.
pub async fn stream_digest(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateDigestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transcript = validate_transcript(&req.transcript, &state.limits)?;
    let session_id = require_session(&state, req.session_id).await?;

    let events = relay(state, transcript, session_id, Uuid::new_v4(), Uuid::new_v4())
        .map(|event| Event::default().json_data(&event));

    // nginx buffers event streams unless told otherwise
    let headers = [(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    )];
    Ok((headers, Sse::new(events).keep_alive(KeepAlive::default())))
}

/// Drive one generation: announce the ids, forward chunks, then persist.
/// Dropping the stream (client went away) abandons the generation and
/// nothing is stored.
pub fn relay(
    state: AppState,
    transcript: String,
    session_id: Option<String>,
    digest_id: Uuid,
    public_id: Uuid,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        yield StreamEvent::Start { digest_id, public_id };

        let prompt = digest_prompt(&transcript);
        let mut chunks = match state.llm.stream(&prompt).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Stream {} failed to start: {}", digest_id, e);
                yield StreamEvent::Error { message: e.user_message() };
                return;
            }
        };

        let mut output = String::new();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => {
                    output.push_str(&text);
                    yield StreamEvent::Content { text };
                }
                Err(e) => {
                    warn!("Stream {} aborted after {} bytes: {}", digest_id, output.len(), e);
                    yield StreamEvent::Error { message: e.user_message() };
                    return;
                }
            }
        }

        if output.trim().is_empty() {
            warn!("Stream {} produced no text", digest_id);
            yield StreamEvent::Error { message: LlmError::EmptyResponse.user_message() };
            return;
        }
        debug!("Stream {} finished with {} bytes", digest_id, output.len());

        let content = parse_digest(&output);
        let (id, public) = (digest_id.to_string(), public_id.to_string());
        match blocking(&state, move |db| db.insert_digest(&id, &public, session_id.as_deref(), &transcript, &content)).await {
            Ok(row) => {
                info!("Digest {} created from stream", row.id);
                yield StreamEvent::Complete { digest: row_to_digest(row) };
            }
            Err(e) => {
                error!("Failed to store streamed digest {}: {}", digest_id, e);
                yield StreamEvent::Error { message: SAVE_FAILED.to_string() };
            }
        }
    }
}
