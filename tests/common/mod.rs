// tests/common/mod.rs
//
// In-process doubles for the relay's collaborators.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use relay_bot::ingest::{FeedSource, PostRecord};
use relay_bot::notify::{DispatchMessage, DispatchSink};
use relay_bot::store::SeenStore;
use relay_bot::{RelayError, RelaySettings};

pub fn post(id: &str) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        title: format!("Title {id}"),
        permalink: format!("/r/test/comments/{id}/title_{id}/"),
        preview_image_url: None,
    }
}

pub fn settings() -> RelaySettings {
    RelaySettings {
        source_id: "test".into(),
        destination_id: "chan-1".into(),
        fetch_limit: 5,
        permalink_base: "https://reddit.com".into(),
        footer: "Posted on Reddit".into(),
    }
}

/// Returns a fixed snapshot, newest first.
#[derive(Default)]
pub struct StaticFeed {
    pub posts: Mutex<Vec<PostRecord>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(posts: Vec<PostRecord>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_recent(
        &self,
        _source_id: &str,
        limit: usize,
    ) -> Result<Vec<PostRecord>, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::SourceUnavailable("feed down".into()));
        }
        Ok(self.posts.lock().unwrap().iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Records every accepted message; can be told to fail the next N sends.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(String, DispatchMessage)>>,
    pub attempts: AtomicUsize,
    pub fail_next: AtomicUsize,
}

impl RecordingSink {
    pub fn sent_titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.title.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DispatchSink for RecordingSink {
    async fn send(&self, destination_id: &str, message: &DispatchMessage) -> Result<(), RelayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(RelayError::SinkUnavailable("send failed".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination_id.to_string(), message.clone()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// A store whose backend is never reachable.
#[derive(Default)]
pub struct DownStore {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SeenStore for DownStore {
    async fn has(&self, _id: &str) -> Result<bool, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::StoreUnavailable("not connected".into()))
    }

    async fn mark_seen(&self, _id: &str) -> Result<(), RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::StoreUnavailable("not connected".into()))
    }
}
