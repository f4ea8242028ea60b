pub mod convert;
pub mod digests;
pub mod error;
pub mod extract;
pub mod health;
pub mod sessions;
pub mod state;
pub mod stream;

use axum::{
    Router,
    routing::{get, patch, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner, Limits};

/// All routes, without transport layers. The binary adds CORS and tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/digests",
            get(digests::list_digests)
                .post(digests::create_digest)
                .delete(digests::clear_digests),
        )
        .route("/api/digests/stream", post(stream::stream_digest))
        .route("/api/digests/count", get(digests::count_digests))
        .route(
            "/api/digests/{id}",
            get(digests::get_digest)
                .put(digests::regenerate_digest)
                .delete(digests::delete_digest),
        )
        .route("/api/digests/{id}/visibility", patch(digests::set_visibility))
        .route("/api/share/{public_id}", get(digests::get_shared_digest))
        .route(
            "/api/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/api/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .with_state(state)
}
