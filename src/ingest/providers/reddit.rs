use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::RelayError;
use crate::ingest::types::{FeedSource, PostRecord};

const DEFAULT_WWW_BASE: &str = "https://www.reddit.com";
const DEFAULT_OAUTH_BASE: &str = "https://oauth.reddit.com";
const USER_AGENT: &str = "relay-bot/0.1 (subreddit to discord relay)";
/// Reddit rejects listings larger than this.
const MAX_LIMIT: usize = 100;
/// Refresh the bearer token this long before Reddit says it expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

// --- listing wire format (only the fields we read) ---

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}
#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}
#[derive(Debug, Deserialize)]
struct Child {
    data: RawPost,
}
#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    permalink: String,
    preview: Option<Preview>,
}
#[derive(Debug, Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}
#[derive(Debug, Deserialize)]
struct PreviewImage {
    source: ImageSource,
}
#[derive(Debug, Deserialize)]
struct ImageSource {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    error: Option<String>,
}

/// Script-app credentials for the OAuth password grant.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditCredentials {
    /// All four of `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, `REDDIT_USERNAME`,
    /// `REDDIT_PASSWORD` must be set, otherwise `None`.
    pub fn from_env() -> Option<Self> {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            client_id: var("REDDIT_CLIENT_ID")?,
            client_secret: var("REDDIT_CLIENT_SECRET")?,
            username: var("REDDIT_USERNAME")?,
            password: var("REDDIT_PASSWORD")?,
        })
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Subreddit "new" listing. Uses OAuth when credentials are present,
/// the public JSON listing otherwise.
pub struct RedditFeed {
    http: Client,
    credentials: Option<RedditCredentials>,
    www_base: String,
    oauth_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditFeed {
    pub fn new(credentials: Option<RedditCredentials>) -> Result<Self, RelayError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit http client: {e}")))?;
        Ok(Self {
            http,
            credentials,
            www_base: DEFAULT_WWW_BASE.to_string(),
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn from_env() -> Result<Self, RelayError> {
        Self::new(RedditCredentials::from_env())
    }

    /// Point both endpoints somewhere else (tests, proxies).
    pub fn with_base_urls(mut self, www_base: &str, oauth_base: &str) -> Self {
        self.www_base = www_base.trim_end_matches('/').to_string();
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    async fn bearer(&self, creds: &RedditCredentials) -> Result<String, RelayError> {
        let mut slot = self.token.lock().await;
        if let Some(tok) = slot.as_ref() {
            if Instant::now() < tok.refresh_at {
                return Ok(tok.value.clone());
            }
        }

        let url = format!("{}/api/v1/access_token", self.www_base);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit auth request: {e}")))?
            .error_for_status()
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit auth: {e}")))?;

        let body: TokenResp = resp
            .json()
            .await
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit auth body: {e}")))?;

        // Reddit answers bad credentials with 200 + {"error": "..."}
        let Some(value) = body.access_token else {
            let why = body.error.unwrap_or_else(|| "no access_token".to_string());
            return Err(RelayError::SourceUnavailable(format!("reddit auth rejected: {why}")));
        };

        let ttl = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_SLACK);
        *slot = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + ttl,
        });
        tracing::debug!(expires_in = body.expires_in, "reddit token refreshed");
        Ok(value)
    }

    async fn fetch_listing(&self, subreddit: &str, limit: usize) -> Result<Listing, RelayError> {
        let req = match &self.credentials {
            Some(creds) => {
                let token = self.bearer(creds).await?;
                self.http
                    .get(format!("{}/r/{subreddit}/new", self.oauth_base))
                    .bearer_auth(token)
            }
            None => self
                .http
                .get(format!("{}/r/{subreddit}/new.json", self.www_base)),
        };

        let resp = req
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit listing request: {e}")))?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            // Token revoked early; force a fresh grant next time.
            *self.token.lock().await = None;
        }

        let resp = resp
            .error_for_status()
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit listing: {e}")))?;

        resp.json::<Listing>()
            .await
            .map_err(|e| RelayError::SourceUnavailable(format!("reddit listing body: {e}")))
    }
}

fn into_record(raw: RawPost) -> PostRecord {
    let preview_image_url = raw
        .preview
        .and_then(|p| p.images.into_iter().next())
        .map(|img| html_escape::decode_html_entities(&img.source.url).into_owned());

    PostRecord {
        id: raw.id,
        title: raw.title,
        permalink: raw.permalink,
        preview_image_url,
    }
}

#[async_trait]
impl FeedSource for RedditFeed {
    async fn fetch_recent(
        &self,
        source_id: &str,
        limit: usize,
    ) -> Result<Vec<PostRecord>, RelayError> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let t0 = Instant::now();

        let listing = match self.fetch_listing(source_id, limit).await {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, provider = "Reddit", subreddit = source_id, "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                return Err(e);
            }
        };

        let out: Vec<PostRecord> = listing
            .data
            .children
            .into_iter()
            .take(limit)
            .map(|c| into_record(c.data))
            .collect();

        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_posts_fetched_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}
