pub mod discord;

use crate::error::RelayError;
use crate::ingest::PostRecord;

pub use discord::DiscordSink;

/// Footer used when the config does not override it.
pub const DEFAULT_FOOTER: &str = "Posted on Reddit";

/// What gets posted for one feed item. Built fresh per dispatch, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMessage {
    pub title: String,
    pub url: String, // absolute
    pub image_url: Option<String>,
    pub footer: String,
}

impl DispatchMessage {
    /// `permalink_base` is prefixed verbatim, e.g. "https://reddit.com" + "/r/x/comments/..".
    pub fn from_post(post: &PostRecord, permalink_base: &str, footer: &str) -> Self {
        let base = permalink_base.trim_end_matches('/');
        let url = if post.permalink.starts_with('/') {
            format!("{base}{}", post.permalink)
        } else {
            format!("{base}/{}", post.permalink)
        };
        Self {
            title: post.title.clone(),
            url,
            image_url: post.preview_image_url.clone(),
            footer: footer.to_string(),
        }
    }

    /// Plain-text line shown above the embed.
    pub fn content(&self) -> String {
        format!("**{}**\n{}", self.title, self.url)
    }
}

#[async_trait::async_trait]
pub trait DispatchSink: Send + Sync {
    async fn send(&self, destination_id: &str, message: &DispatchMessage)
        -> Result<(), RelayError>;
    fn name(&self) -> &'static str;
}

/// Stands in for a sink that could not be built (e.g. no bot token).
/// Every send fails with `SinkUnavailable`, so cycles report and log it.
#[derive(Debug, Clone)]
pub struct UnavailableSink {
    reason: String,
}

impl UnavailableSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl DispatchSink for UnavailableSink {
    async fn send(&self, _destination_id: &str, _message: &DispatchMessage) -> Result<(), RelayError> {
        Err(RelayError::SinkUnavailable(self.reason.clone()))
    }

    fn name(&self) -> &'static str {
        "Unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(permalink: &str) -> PostRecord {
        PostRecord {
            id: "p1".into(),
            title: "Hello".into(),
            permalink: permalink.into(),
            preview_image_url: Some("https://i.redd.it/x.png".into()),
        }
    }

    #[test]
    fn url_is_base_plus_permalink() {
        let m = DispatchMessage::from_post(&post("/r/a/comments/p1/hello/"), "https://reddit.com", DEFAULT_FOOTER);
        assert_eq!(m.url, "https://reddit.com/r/a/comments/p1/hello/");
        assert_eq!(m.image_url.as_deref(), Some("https://i.redd.it/x.png"));
        assert_eq!(m.footer, "Posted on Reddit");
    }

    #[test]
    fn trailing_and_missing_slashes_join_cleanly() {
        let m = DispatchMessage::from_post(&post("r/a/comments/p1/"), "https://reddit.com/", "f");
        assert_eq!(m.url, "https://reddit.com/r/a/comments/p1/");
    }

    #[test]
    fn content_is_bold_title_then_url() {
        let m = DispatchMessage::from_post(&post("/x"), "https://reddit.com", "f");
        assert_eq!(m.content(), "**Hello**\nhttps://reddit.com/x");
    }

    #[tokio::test]
    async fn unavailable_sink_reports_its_reason() {
        let sink = UnavailableSink::new("DISCORD_TOKEN not set");
        let m = DispatchMessage::from_post(&post("/x"), "https://reddit.com", "f");
        let err = sink.send("42", &m).await.unwrap_err();
        assert_eq!(err.kind(), "sink_unavailable");
        assert!(err.to_string().contains("DISCORD_TOKEN not set"));
    }
}
