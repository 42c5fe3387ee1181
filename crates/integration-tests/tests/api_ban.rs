use axum::http::StatusCode;
use integration_tests::{TestApp, GUILD_ID};
use rr_core::{AppError, MockChatPlatform};
use serde_json::json;

fn guild_present(platform: &mut MockChatPlatform) {
    platform
        .expect_guild_exists()
        .withf(|g| g == GUILD_ID)
        .returning(|_| Ok(true));
}

#[tokio::test]
async fn bans_the_uploader_of_a_video() {
    let mut platform = MockChatPlatform::new();
    guild_present(&mut platform);
    platform
        .expect_fetch_member()
        .withf(|g, u| g == GUILD_ID && u == "user-m2")
        .times(1)
        .returning(|_, _| Ok(()));
    platform
        .expect_ban_member()
        .withf(|g, u| g == GUILD_ID && u == "user-m2")
        .times(1)
        .returning(|_, _| Ok(()));
    let app = TestApp::new(platform);
    app.seed(&["m1", "m2"]).await;

    let (status, body) = app.post_json("/api/ban", json!({ "videoId": "m2" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn disabled_ban_makes_no_platform_calls() {
    let mut platform = MockChatPlatform::new();
    platform.expect_guild_exists().never();
    platform.expect_ban_member().never();
    let app = TestApp::with_ban(platform, false);
    app.seed(&["m1"]).await;

    let (status, body) = app.post_json("/api/ban", json!({ "videoId": "m1" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disabled");
}

#[tokio::test]
async fn missing_guild_is_404_and_stops() {
    let mut platform = MockChatPlatform::new();
    platform.expect_guild_exists().returning(|_| Ok(false));
    platform.expect_fetch_member().never();
    platform.expect_ban_member().never();
    let app = TestApp::new(platform);
    app.seed(&["m1"]).await;

    let (status, body) = app.post_json("/api/ban", json!({ "videoId": "m1" })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("Guild"));
}

#[tokio::test]
async fn unknown_video_fails_gracefully() {
    let mut platform = MockChatPlatform::new();
    guild_present(&mut platform);
    platform.expect_fetch_member().never();
    platform.expect_ban_member().never();
    let app = TestApp::new(platform);
    app.seed(&["m1"]).await;

    let (status, body) = app.post_json("/api/ban", json!({ "videoId": "m404" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let (status, _) = app.post_json("/api/ban", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The handler keeps serving after the failures.
    let (status, _) = app.get("/api/videos").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upstream_ban_failure_is_500_with_message() {
    let mut platform = MockChatPlatform::new();
    guild_present(&mut platform);
    platform.expect_fetch_member().returning(|_, _| Ok(()));
    platform
        .expect_ban_member()
        .returning(|_, _| Err(AppError::Platform("403: Missing Permissions".into())));
    let app = TestApp::new(platform);
    app.seed(&["m1"]).await;

    let (status, body) = app.post_json("/api/ban", json!({ "videoId": "m1" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Missing Permissions"));
}

#[tokio::test]
async fn member_lookup_failure_skips_ban() {
    let mut platform = MockChatPlatform::new();
    guild_present(&mut platform);
    platform
        .expect_fetch_member()
        .returning(|_, _| Err(AppError::Platform("404: Unknown Member".into())));
    platform.expect_ban_member().never();
    let app = TestApp::new(platform);
    app.seed(&["m1"]).await;

    let (status, body) = app.post_json("/api/ban", json!({ "videoId": "m1" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("Unknown Member"));
}
