//! # rr-discord
//!
//! Discord REST (v10) implementation of `ChatPlatform`.
//! Only the handful of endpoints the review tool needs: seeding vote
//! reactions, reading live reaction aggregates, and member bans.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use rr_core::error::{AppError, Result};
use rr_core::traits::ChatPlatform;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/reel-review/reel-review, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

pub struct DiscordPlatform {
    http: Client,
    /// API root without trailing slash (e.g., "https://discord.com/api/v10")
    api_base: String,
    token: SecretString,
}

/// Error body Discord attaches to non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    reactions: Vec<Reaction>,
}

#[derive(Deserialize)]
struct Reaction {
    count: u64,
    emoji: Emoji,
}

#[derive(Deserialize)]
struct Emoji {
    id: Option<String>,
    name: Option<String>,
}

impl Emoji {
    /// Unicode emoji match on name, custom emoji on `name:id` or id.
    fn matches(&self, wanted: &str) -> bool {
        match (&self.id, &self.name) {
            (None, Some(name)) => name == wanted,
            (Some(id), name) => {
                id == wanted || name.as_ref().is_some_and(|n| format!("{n}:{id}") == wanted)
            }
            (None, None) => false,
        }
    }
}

impl DiscordPlatform {
    pub fn new(api_base: impl Into<String>, token: SecretString) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            header::AUTHORIZATION,
            format!("Bot {}", self.token.expose_secret()),
        )
    }

    async fn get(&self, path: &str) -> Result<Response> {
        self.authorized(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(transport)
    }

    async fn put(&self, path: &str) -> Result<Response> {
        self.authorized(self.http.put(self.url(path)))
            .header(header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(transport)
    }
}

fn transport(e: reqwest::Error) -> AppError {
    AppError::Platform(e.to_string())
}

/// Passes 2xx responses through and turns everything else into
/// `AppError::Platform` carrying Discord's own message when it sent one.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(AppError::Platform(format!("{}: {message}", status.as_u16())))
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        let path = format!(
            "/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
            urlencoding::encode(emoji)
        );
        ensure_success(self.put(&path).await?).await?;
        debug!(%message_id, emoji, "reaction added");
        Ok(())
    }

    async fn reaction_count(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<Option<u64>> {
        let response = self
            .get(&format!("/channels/{channel_id}/messages/{message_id}"))
            .await?;
        let message: Message = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport)?;

        Ok(message
            .reactions
            .into_iter()
            .find(|r| r.emoji.matches(emoji))
            .map(|r| r.count)
            .filter(|&count| count > 0))
    }

    async fn guild_exists(&self, guild_id: &str) -> Result<bool> {
        let response = self.get(&format!("/guilds/{guild_id}")).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<()> {
        let response = self
            .get(&format!("/guilds/{guild_id}/members/{user_id}"))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn ban_member(&self, guild_id: &str, user_id: &str) -> Result<()> {
        let response = self.put(&format!("/guilds/{guild_id}/bans/{user_id}")).await?;
        ensure_success(response).await?;
        debug!(%guild_id, %user_id, "member banned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn platform(server: &MockServer) -> DiscordPlatform {
        DiscordPlatform::new(server.uri(), SecretString::from("t0ken".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_react_puts_own_reaction() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/channels/c1/messages/m1/reactions/[^/]+/@me$"))
            .and(header("authorization", "Bot t0ken"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        platform(&server).react("c1", "m1", "👍").await.unwrap();
    }

    #[tokio::test]
    async fn test_reaction_count_picks_matching_emoji() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/c1/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m1",
                "reactions": [
                    { "count": 3, "me": true, "emoji": { "id": null, "name": "👍" } },
                    { "count": 1, "me": true, "emoji": { "id": null, "name": "👎" } }
                ]
            })))
            .mount(&server)
            .await;

        let discord = platform(&server);
        assert_eq!(discord.reaction_count("c1", "m1", "👍").await.unwrap(), Some(3));
        assert_eq!(discord.reaction_count("c1", "m1", "👎").await.unwrap(), Some(1));
        assert_eq!(discord.reaction_count("c1", "m1", "🔥").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reaction_count_without_reactions_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/c1/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "m1" })))
            .mount(&server)
            .await;

        assert_eq!(platform(&server).reaction_count("c1", "m1", "👍").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_guild_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/g1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "g1" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/g2"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "message": "Unknown Guild", "code": 10004 })),
            )
            .mount(&server)
            .await;

        let discord = platform(&server);
        assert!(discord.guild_exists("g1").await.unwrap());
        assert!(!discord.guild_exists("g2").await.unwrap());
    }

    #[tokio::test]
    async fn test_ban_failure_carries_discord_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/guilds/g1/bans/u1"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({ "message": "Missing Permissions", "code": 50013 })),
            )
            .mount(&server)
            .await;

        let err = platform(&server).ban_member("g1", "u1").await.unwrap_err();
        assert_eq!(err.to_string(), "platform error: 403: Missing Permissions");
    }

    #[tokio::test]
    async fn test_unknown_member_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/g1/members/u9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = platform(&server).fetch_member("g1", "u9").await.unwrap_err();
        assert!(matches!(err, AppError::Platform(m) if m.starts_with("404")));
    }

    #[test]
    fn test_custom_emoji_matching() {
        let custom = Emoji {
            id: Some("42".to_string()),
            name: Some("pog".to_string()),
        };
        assert!(custom.matches("pog:42"));
        assert!(custom.matches("42"));
        assert!(!custom.matches("pog"));
    }
}
