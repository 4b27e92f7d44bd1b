use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::reply::OutboundReply;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("could not build slack http client: {0}")]
    Client(String),
    #[error("slack request failed: {0}")]
    Transport(String),
    #[error("slack responded with http {status}")]
    Http { status: u16 },
    #[error("could not decode slack response: {0}")]
    Decode(String),
    #[error("slack `{method}` returned error `{error}`")]
    Api { method: &'static str, error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(&self, reply: &OutboundReply) -> Result<PostedMessage, SlackApiError>;
}

/// `chat.postMessage` over the Slack Web API with a bot token.
pub struct WebApiClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl WebApiClient {
    pub fn new(base_url: impl Into<String>, bot_token: SecretString) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|error| SlackApiError::Client(error.to_string()))?;
        Ok(Self::with_http_client(http, base_url, bot_token))
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        bot_token: SecretString,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url, bot_token }
    }
}

#[async_trait]
impl SlackApi for WebApiClient {
    async fn post_message(&self, reply: &OutboundReply) -> Result<PostedMessage, SlackApiError> {
        const METHOD: &str = "chat.postMessage";

        let response = self
            .http
            .post(format!("{}/{METHOD}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(reply)
            .send()
            .await
            .map_err(|error| SlackApiError::Transport(error.to_string()))?;

        let status = response.status();
        let body = match response.json::<PostMessageResponse>().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(SlackApiError::Http { status: status.as_u16() })
            }
            Err(error) => return Err(SlackApiError::Decode(error.to_string())),
        };

        if !body.ok {
            return Err(SlackApiError::Api {
                method: METHOD,
                error: body.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }

        let posted = PostedMessage {
            channel: body.channel.unwrap_or_else(|| reply.channel.clone()),
            ts: body.ts.unwrap_or_default(),
        };
        debug!(
            event_name = "egress.slack.message_posted",
            channel = %posted.channel,
            ts = %posted.ts,
            threaded = reply.is_threaded(),
            "posted slack message"
        );
        Ok(posted)
    }
}
