//! Discord REST v10 client used as the announcement channel.
//!
//! Only the endpoints the watcher needs are covered: channel lookup, message
//! creation and guild slash-command registration. The gateway is not used.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::announcer::{Channel, ChannelResolver, Message};
use crate::commands::Command;
use crate::error::AnnounceError;

pub const DEFAULT_DISCORD_API: &str = "https://discord.com/api/v10";

#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for DiscordRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRest")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl DiscordRest {
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_DISCORD_API.to_owned(),
            token: token.into(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Replaces the guild's slash commands with `checkupdates` and `version`.
    pub async fn register_guild_commands(
        &self,
        application_id: &str,
        guild_id: &str,
    ) -> Result<(), AnnounceError> {
        let body: Vec<Value> = Command::ALL
            .iter()
            .map(|command| {
                json!({
                    "name": command.name(),
                    "description": command.description(),
                })
            })
            .collect();

        let path = format!("/applications/{application_id}/guilds/{guild_id}/commands");
        let response = self.request(Method::PUT, &path).json(&body).send().await?;
        ensure_success(response).await?;
        info!(guild_id, count = body.len(), "registered guild slash commands");
        Ok(())
    }
}

#[async_trait]
impl ChannelResolver for DiscordRest {
    async fn resolve(&self, channel_id: &str) -> Result<Box<dyn Channel>, AnnounceError> {
        let response = self
            .request(Method::GET, &format!("/channels/{channel_id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AnnounceError::ChannelNotFound(channel_id.to_owned()));
        }
        ensure_success(response).await?;
        debug!(channel_id, "resolved discord channel");
        Ok(Box::new(DiscordChannel {
            rest: self.clone(),
            id: channel_id.to_owned(),
        }))
    }
}

struct DiscordChannel {
    rest: DiscordRest,
    id: String,
}

#[async_trait]
impl Channel for DiscordChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn post(&self, message: &Message) -> Result<(), AnnounceError> {
        let response = self
            .rest
            .request(Method::POST, &format!("/channels/{}/messages", self.id))
            .json(&message_payload(message))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

pub fn message_payload(message: &Message) -> Value {
    match message {
        Message::Text(content) => json!({ "content": content }),
        Message::Embed(embed) => json!({ "embeds": [embed] }),
    }
}

async fn ensure_success(response: Response) -> Result<Response, AnnounceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(body);
    Err(AnnounceError::Api { status, message })
}
