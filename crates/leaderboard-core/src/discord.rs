//! Discord REST implementation of [`ChatPlatform`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::chat::{ChatPlatform, Post};
use crate::emoji::EmojiSet;
use crate::error::ChatError;

/// Thin bot-token client over the Discord v10 REST API.
#[derive(Debug, Clone)]
pub struct DiscordChat {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    #[serde(default)]
    retry_after: f64,
}

#[derive(Debug, Deserialize)]
struct EmojiList {
    #[serde(default)]
    items: Vec<ApplicationEmoji>,
}

#[derive(Debug, Deserialize)]
struct ApplicationEmoji {
    id: String,
    name: String,
    #[serde(default)]
    animated: bool,
}

impl DiscordChat {
    pub const DEFAULT_API_BASE: &'static str = "https://discord.com/api/v10";

    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ChatError::NotConfigured(
                "bot token is empty (set DISCORD_BOT_TOKEN)".into(),
            ));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Load the application's uploaded emojis as an [`EmojiSet`].
    pub async fn application_emojis(&self, application_id: &str) -> Result<EmojiSet, ChatError> {
        let url = format!("{}/applications/{application_id}/emojis", self.api_base);
        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;
        let response = check(response).await?;
        let list: EmojiList = response.json().await?;
        Ok(list
            .items
            .into_iter()
            .map(|e| {
                let prefix = if e.animated { "a" } else { "" };
                let tag = format!("<{prefix}:{}:{}>", e.name, e.id);
                (e.name, tag)
            })
            .collect())
    }
}

#[async_trait]
impl ChatPlatform for DiscordChat {
    async fn create_message(&self, channel_id: &str, post: &Post) -> Result<String, ChatError> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let fields: Vec<serde_json::Value> = post
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect();
        let body = json!({ "embeds": [{ "title": post.title, "fields": fields }] });

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await?;
        let created: CreatedMessage = check(response).await?.json().await?;
        tracing::debug!(channel_id, message_id = %created.id, "discord message created");
        Ok(created.id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let url = format!(
            "{}/channels/{channel_id}/messages/{message_id}",
            self.api_base
        );
        let response = self
            .http
            .delete(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;
        check(response).await?;
        tracing::debug!(channel_id, message_id, "discord message deleted");
        Ok(())
    }
}

/// Map non-success statuses onto [`ChatError`] variants.
async fn check(response: Response) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::NOT_FOUND => Err(ChatError::NotFound),
        StatusCode::FORBIDDEN => Err(ChatError::Forbidden),
        StatusCode::TOO_MANY_REQUESTS => {
            let body: RateLimitBody = response
                .json()
                .await
                .unwrap_or(RateLimitBody { retry_after: 0.0 });
            Err(ChatError::RateLimited {
                retry_after_secs: body.retry_after,
            })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ChatError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
