// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// One item of the upstream feed, as returned by the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub id: String,        // stable per source item, e.g. Reddit "t3" id
    pub title: String,
    pub permalink: String, // relative, e.g. "/r/rust/comments/abc/..."
    pub preview_image_url: Option<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Most recent items of `source_id`, newest first, at most `limit` of them.
    async fn fetch_recent(&self, source_id: &str, limit: usize)
        -> Result<Vec<PostRecord>, RelayError>;
    fn name(&self) -> &'static str;
}
