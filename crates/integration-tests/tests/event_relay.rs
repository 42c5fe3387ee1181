use axum::http::StatusCode;
use integration_tests::{TestApp, CHANNEL_ID, RELAY_SECRET};
use rr_core::MockChatPlatform;
use serde_json::{json, Value};

fn upload(message_id: &str) -> Value {
    json!({
        "type": "upload_observed",
        "channel_id": CHANNEL_ID,
        "message_id": message_id,
        "author": { "id": "u-42", "tag": "carol#4242", "bot": false },
        "attachments": [
            { "content_type": "video/mp4", "url": "https://cdn.example/a.mp4", "filename": "a.mp4" }
        ],
        "created_at": 1_712_000_000_000i64
    })
}

fn reaction(kind: &str, message_id: &str, emoji: &str) -> Value {
    json!({
        "type": kind,
        "channel_id": CHANNEL_ID,
        "message_id": message_id,
        "emoji": emoji,
        "actor_is_bot": false
    })
}

#[tokio::test]
async fn relay_events_drive_the_registry() {
    let mut platform = MockChatPlatform::new();
    platform.expect_react().times(2).returning(|_, _, _| Ok(()));
    platform
        .expect_reaction_count()
        .times(1)
        .returning(|_, _, _| Ok(Some(1)));
    let app = TestApp::new(platform);

    let (status, body) = app.post_event(upload("m1")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"]["result"], "registered");

    for _ in 0..2 {
        let (_, body) = app
            .post_event(reaction("reaction_added", "m1", "👍"))
            .await;
        assert_eq!(body["outcome"]["result"], "vote_applied");
    }

    let (_, body) = app
        .post_event(reaction("reaction_removed", "m1", "👍"))
        .await;
    assert_eq!(body["outcome"]["result"], "vote_resynced");

    let (_, listing) = app.get("/api/videos").await;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["videos"][0]["likes"], 1);
    assert_eq!(listing["videos"][0]["uploadedBy"], "carol#4242");
    assert_eq!(listing["videos"][0]["userId"], "u-42");

    let persisted = app.persisted();
    assert_eq!(persisted["videoUrls"][0]["likes"], 1);
    assert_eq!(persisted["videoUrls"][0]["timestamp"], 1_712_000_000_000i64);
}

#[tokio::test]
async fn duplicate_upload_is_reported_not_appended() {
    let mut platform = MockChatPlatform::new();
    platform.expect_react().times(2).returning(|_, _, _| Ok(()));
    let app = TestApp::new(platform);

    app.post_event(upload("m1")).await;
    let (status, body) = app.post_event(upload("m1")).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"]["result"], "duplicate");
    assert_eq!(app.registry.lock().await.len(), 1);
}

#[tokio::test]
async fn ignored_events_report_a_reason() {
    let app = TestApp::new(MockChatPlatform::new());

    let (status, body) = app
        .post_event(reaction("reaction_added", "unknown", "👍"))
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"]["result"], "ignored");
    assert_eq!(body["outcome"]["reason"], "unknown message");
}

#[tokio::test]
async fn malformed_events_are_rejected() {
    let app = TestApp::new(MockChatPlatform::new());

    let (status, body) = app
        .post_event(json!({ "type": "message_deleted", "id": "m1" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn forged_upload_without_secret_cannot_set_up_a_ban() {
    let mut platform = MockChatPlatform::new();
    platform.expect_react().never();
    platform.expect_guild_exists().returning(|_| Ok(true));
    platform.expect_fetch_member().never();
    platform.expect_ban_member().never();
    let app = TestApp::new(platform);

    let forged = upload("m-forged").to_string();
    let (status, body) = app
        .post_with_secret("/internal/events", forged.clone(), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let (status, _) = app
        .post_with_secret("/internal/events", forged, Some("not-the-secret"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.registry.lock().await.is_empty());

    let (status, _) = app
        .post_json("/api/ban", json!({ "videoId": "m-forged" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn secret_is_checked_before_the_body() {
    let app = TestApp::new(MockChatPlatform::new());

    let (status, _) = app
        .post_with_secret("/internal/events", "not json".to_string(), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn relay_route_is_absent_without_a_secret() {
    let app = TestApp::without_relay(MockChatPlatform::new());

    let (status, _) = app
        .post_with_secret("/internal/events", upload("m1").to_string(), Some(RELAY_SECRET))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.registry.lock().await.is_empty());
}
