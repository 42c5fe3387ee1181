//! # rr-api Handlers
//!
//! This module coordinates the flow between HTTP requests, the registry and
//! the chat platform.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rr_core::{AppError, ChatPlatform, EventHandler, EventOutcome, PlatformEvent, SharedRegistry};
use rr_core::{VideoRecord, ViewSelector};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub platform: Arc<dyn ChatPlatform>,
    pub events: Arc<EventHandler>,
    pub guild_id: String,
    pub ban_enabled: bool,
    /// Secret expected in `x-relay-secret`; `None` leaves the relay route unmounted.
    pub relay_secret: Option<SecretString>,
}

pub const RELAY_SECRET_HEADER: &str = "x-relay-secret";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    pub status: String,
    pub count: usize,
    pub videos: Vec<VideoRecord>,
    /// Equal to `count` when every video has been reviewed.
    pub last_viewed_video_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkViewedResponse {
    pub status: String,
    pub message: String,
    pub next_video_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRequest {
    pub video_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub status: &'static str,
    pub outcome: EventOutcome,
}

/// GET /api/videos: full snapshot dump.
pub async fn list_videos(State(state): State<AppState>) -> Json<VideoListResponse> {
    let snapshot = state.registry.lock().await.snapshot();

    Json(VideoListResponse {
        status: "success".to_string(),
        count: snapshot.video_urls.len(),
        videos: snapshot.video_urls,
        last_viewed_video_index: snapshot.last_viewed_video_index,
    })
}

/// POST /api/videos/mark-as-viewed
pub async fn mark_as_viewed(
    State(state): State<AppState>,
    payload: Result<Json<ViewSelector>, JsonRejection>,
) -> Result<Json<MarkViewedResponse>, ApiError> {
    let Json(selector) = payload?;
    let next = state.registry.lock().await.advance_cursor(&selector).await?;

    Ok(Json(MarkViewedResponse {
        status: "success".to_string(),
        message: "Video marked as viewed. Next video available.".to_string(),
        next_video_index: next,
    }))
}

/// POST /api/ban: bans the uploader of `videoId` from the configured guild.
pub async fn ban_uploader(
    State(state): State<AppState>,
    payload: Result<Json<BanRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !state.ban_enabled {
        return Ok(Json(StatusResponse::new(
            "disabled",
            "Banning is disabled; no action taken.",
        )));
    }

    let Json(request) = payload?;

    if !state.platform.guild_exists(&state.guild_id).await? {
        return Err(AppError::NotFound("Guild".to_string(), state.guild_id.clone()).into());
    }

    let video_id = request.video_id.unwrap_or_default();
    let user_id = state
        .registry
        .lock()
        .await
        .uploader_of(&video_id)
        .map(str::to_string)
        .ok_or_else(|| AppError::NotFound("Video".to_string(), video_id.clone()))?;

    state.platform.fetch_member(&state.guild_id, &user_id).await?;
    state.platform.ban_member(&state.guild_id, &user_id).await?;

    info!(%video_id, %user_id, "uploader banned");
    Ok(Json(StatusResponse::new("success", "User banned successfully.")))
}

/// POST /internal/events: one platform event forwarded by the gateway relay.
///
/// The relay secret is checked before the body is parsed.
pub async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PlatformEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<EventAccepted>), ApiError> {
    authorize_relay(state.relay_secret.as_ref(), &headers)?;
    let Json(event) = payload?;
    let outcome = state.events.handle(event).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            status: "accepted",
            outcome,
        }),
    ))
}

fn authorize_relay(expected: Option<&SecretString>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Err(AppError::Unauthorized("event relay is disabled".to_string()));
    };
    let presented = headers
        .get(RELAY_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if constant_time_eq(presented.as_bytes(), expected.expose_secret().as_bytes()) {
        Ok(())
    } else {
        warn!("rejected relay event with missing or wrong secret");
        Err(AppError::Unauthorized("missing or invalid relay secret".to_string()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn health() -> &'static str {
    "ok"
}
