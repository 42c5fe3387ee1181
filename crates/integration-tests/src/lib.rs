//! Shared fixtures for the end-to-end router tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use rr_api::{AppState, RELAY_SECRET_HEADER};
use rr_core::{EventHandler, MockChatPlatform, NewVideo, SharedRegistry, VideoRegistry};
use rr_store_json::JsonFileStore;
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const CHANNEL_ID: &str = "chan-1";
pub const GUILD_ID: &str = "guild-1";
pub const RELAY_SECRET: &str = "relay-s3cret";

pub struct TestApp {
    pub router: Router,
    pub registry: SharedRegistry,
    pub state_dir: TempDir,
}

impl TestApp {
    pub fn new(platform: MockChatPlatform) -> Self {
        Self::with_ban(platform, true)
    }

    pub fn with_ban(platform: MockChatPlatform, ban_enabled: bool) -> Self {
        Self::build(platform, ban_enabled, Some(RELAY_SECRET))
    }

    /// Same as `new`, but with no relay secret configured.
    pub fn without_relay(platform: MockChatPlatform) -> Self {
        Self::build(platform, true, None)
    }

    /// Wires the real router and JSON store around a mocked platform.
    fn build(platform: MockChatPlatform, ban_enabled: bool, relay_secret: Option<&str>) -> Self {
        let state_dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(state_dir.path().join("state.json"));
        let registry = VideoRegistry::new(Box::new(store)).into_shared();
        let platform = Arc::new(platform);

        let state = AppState {
            registry: registry.clone(),
            platform: platform.clone(),
            events: Arc::new(EventHandler::new(registry.clone(), platform, CHANNEL_ID)),
            guild_id: GUILD_ID.to_string(),
            ban_enabled,
            relay_secret: relay_secret.map(|s| SecretString::from(s.to_string())),
        };

        Self {
            router: rr_api::router(state, None),
            registry,
            state_dir,
        }
    }

    pub async fn seed(&self, ids: &[&str]) {
        let mut registry = self.registry.lock().await;
        for id in ids {
            registry.register(new_video(id)).await;
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
        self.post_with_secret(uri, body.into(), None).await
    }

    /// Posts a platform event the way an authorized relay does.
    pub async fn post_event(&self, body: Value) -> (StatusCode, Value) {
        self.post_with_secret("/internal/events", body.to_string(), Some(RELAY_SECRET))
            .await
    }

    pub async fn post_with_secret(
        &self,
        uri: &str,
        body: String,
        secret: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = secret {
            builder = builder.header(RELAY_SECRET_HEADER, secret);
        }
        let request = builder.body(Body::from(body)).expect("request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Raw persisted state, as a fresh process would read it.
    pub fn persisted(&self) -> Value {
        let raw = std::fs::read_to_string(self.state_dir.path().join("state.json"))
            .expect("state file");
        serde_json::from_str(&raw).expect("state json")
    }
}

pub fn new_video(id: &str) -> NewVideo {
    NewVideo {
        id: id.to_string(),
        url: format!("https://cdn.example/{id}.mp4"),
        filename: format!("{id}.mp4"),
        uploaded_by: format!("uploader-{id}#0001"),
        user_id: format!("user-{id}"),
        timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
    }
}
