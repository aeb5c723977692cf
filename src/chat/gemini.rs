use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ChatModel;
use crate::error::RelayError;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client. Requires an API key.
pub struct GeminiModel {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiModel {
    pub fn new(api_key: String, model: &str) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .user_agent("relay-bot/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| RelayError::ModelUnavailable(format!("gemini http client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    #[serde(default)]
    text: String,
}

fn first_text(resp: Resp) -> Option<String> {
    resp.candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()
        .map(|p| p.text)
}

#[async_trait::async_trait]
impl ChatModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String, RelayError> {
        if self.api_key.is_empty() {
            return Err(RelayError::ModelUnavailable("no API key configured".into()));
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp: Resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(|e| RelayError::ModelUnavailable(format!("gemini request: {}", e.without_url())))?
            .error_for_status()
            .map_err(|e| RelayError::ModelUnavailable(format!("gemini: {}", e.without_url())))?
            .json()
            .await
            .map_err(|e| RelayError::ModelUnavailable(format!("gemini body: {e}")))?;

        first_text(resp).ok_or_else(|| RelayError::ModelUnavailable("no candidates".into()))
    }

    fn name(&self) -> &'static str {
        "Gemini"
    }
}
