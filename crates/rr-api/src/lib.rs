//! # rr-api
//!
//! The web routing layer for reel-review: the review tool's JSON API, the
//! gateway relay's event intake, and static hosting for the review tool itself.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::path::Path;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

pub use error::ApiError;
pub use handlers::{AppState, RELAY_SECRET_HEADER};

/// Builds the full application router.
///
/// When `static_dir` is set, unmatched paths fall through to the built review
/// tool, with `index.html` served for client-side routes.
///
/// `/internal/events` is only mounted when a relay secret is configured.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut api = Router::new()
        .route("/api/videos", get(handlers::list_videos))
        .route("/api/videos/mark-as-viewed", post(handlers::mark_as_viewed))
        .route("/api/ban", post(handlers::ban_uploader))
        .route("/health", get(handlers::health));
    if state.relay_secret.is_some() {
        api = api.route("/internal/events", post(handlers::ingest_event));
    }
    let api = api.with_state(state);

    let app = match static_dir {
        Some(dir) => {
            let spa = ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html")));
            api.fallback_service(spa)
        }
        None => api,
    };

    app.layer(middleware::cors_policy())
        .layer(middleware::propagate_request_id())
        .layer(middleware::trace_layer())
        .layer(middleware::set_request_id())
}
