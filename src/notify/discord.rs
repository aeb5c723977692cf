use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::{DispatchMessage, DispatchSink};
use crate::error::RelayError;

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
/// Upper bound for `with_retries`; the longest backoff is then 8 s.
pub const MAX_SEND_ATTEMPTS: u8 = 6;
const BACKOFF_BASE_MS: u64 = 500;

/// Delay before attempt `attempt + 1`: 500 ms, 1 s, 2 s, ...
fn backoff(attempt: u8) -> Duration {
    let factor = 1u64
        .checked_shl(u32::from(attempt.saturating_sub(1)))
        .unwrap_or(u64::MAX);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(factor))
}

/// Posts into a guild channel through the bot REST API.
#[derive(Clone)]
pub struct DiscordSink {
    token: String,
    api_base: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordSink {
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 1,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Total attempts for transport errors and 5xx/429 answers. 1 means no retry.
    /// Clamped to `1..=MAX_SEND_ATTEMPTS`.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_SEND_ATTEMPTS);
        self
    }

    /// Verifies the token resolves to a bot user. Returns the bot's username.
    pub async fn probe(&self) -> Result<String, RelayError> {
        #[derive(serde::Deserialize)]
        struct Me {
            username: String,
        }

        let me: Me = self
            .client
            .get(format!("{}/users/@me", self.api_base))
            .header("Authorization", format!("Bot {}", self.token))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::SinkUnavailable(format!("discord probe request: {e}")))?
            .error_for_status()
            .map_err(|e| RelayError::SinkUnavailable(format!("discord probe: {e}")))?
            .json()
            .await
            .map_err(|e| RelayError::SinkUnavailable(format!("discord probe body: {e}")))?;
        Ok(me.username)
    }
}

#[async_trait::async_trait]
impl DispatchSink for DiscordSink {
    async fn send(&self, destination_id: &str, msg: &DispatchMessage) -> Result<(), RelayError> {
        let url = format!("{}/channels/{}/messages", self.api_base, destination_id);
        let payload = DiscordMessagePayload::from_message(msg);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .header("Authorization", format!("Bot {}", self.token))
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let last_err = match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
                        return Err(RelayError::SinkUnavailable(format!(
                            "channel {destination_id} could not be resolved ({status})"
                        )));
                    }
                    if !(status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS) {
                        return Err(RelayError::SinkUnavailable(format!(
                            "discord rejected message: {status}"
                        )));
                    }
                    format!("discord HTTP error: {status}")
                }
                Err(e) => format!("discord request failed: {e}"),
            };

            if attempt < self.max_retries {
                tokio::time::sleep(backoff(attempt)).await;
                continue;
            }
            return Err(RelayError::SinkUnavailable(last_err));
        }
    }

    fn name(&self) -> &'static str {
        "Discord"
    }
}

#[derive(Serialize)]
struct EmbedImage {
    url: String,
}

#[derive(Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage>,
    footer: EmbedFooter,
}

#[derive(Serialize)]
struct DiscordMessagePayload {
    content: String,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordMessagePayload {
    fn from_message(msg: &DispatchMessage) -> Self {
        Self {
            content: msg.content(),
            embeds: vec![DiscordEmbed {
                title: msg.title.clone(),
                url: msg.url.clone(),
                image: msg.image_url.clone().map(|url| EmbedImage { url }),
                footer: EmbedFooter {
                    text: msg.footer.clone(),
                },
            }],
        }
    }
}
