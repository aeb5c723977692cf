//! # Relay Cycle
//! Poll the feed, pick the first post that was never relayed, send it,
//! record it. At most one post leaves per cycle, whatever the backlog.
//!
//! Ordering inside a cycle is fixed: `has` → `send` → `mark_seen`. A post is
//! recorded only after the sink accepted it, so a failed send is retried by
//! the next cycle. Cycles never overlap: a second caller gets `Busy`.

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::ingest::{self, FeedSource, PostRecord};
use crate::notify::{DispatchMessage, DispatchSink};
use crate::store::SeenStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_cycles_total", "Relay cycles that ran to completion or failure.");
        describe_counter!("relay_dispatched_total", "Posts handed to the dispatch sink.");
        describe_counter!(
            "relay_cycle_errors_total",
            "Cycles that ended early, labelled by error kind."
        );
        describe_counter!("relay_busy_total", "Cycle requests rejected because one was in flight.");
        describe_counter!(
            "relay_store_degraded_total",
            "Seen-set lookups that failed open."
        );
        describe_gauge!("relay_last_cycle_ts", "Unix ts when a relay cycle last started.");
    });
}

/// Static routing for one source → one destination.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub source_id: String,      // subreddit
    pub destination_id: String, // channel id
    pub fetch_limit: usize,
    pub permalink_base: String,
    pub footer: String,
}

impl RelaySettings {
    pub fn from_config(cfg: &RelayConfig) -> Self {
        Self {
            source_id: cfg.subreddit.clone(),
            destination_id: cfg.channel_id.clone(),
            fetch_limit: cfg.fetch_limit,
            permalink_base: cfg.permalink_base.clone(),
            footer: cfg.footer.clone(),
        }
    }
}

/// Outcome of one `run_cycle` call.
#[derive(Debug)]
pub enum CycleReport {
    Dispatched { id: String },
    NothingNew { fetched: usize },
    /// Another cycle held the guard; nothing was read or written.
    Busy,
    Failed(RelayError),
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CycleReport::Dispatched { .. } | CycleReport::NothingNew { .. }
        )
    }

    pub fn dispatched_id(&self) -> Option<&str> {
        match self {
            CycleReport::Dispatched { id } => Some(id),
            _ => None,
        }
    }
}

pub struct Relay {
    feed: Arc<dyn FeedSource>,
    sink: Arc<dyn DispatchSink>,
    store: Arc<dyn SeenStore>,
    settings: RelaySettings,
    in_flight: Mutex<()>,
}

impl Relay {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        sink: Arc<dyn DispatchSink>,
        store: Arc<dyn SeenStore>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            feed,
            sink,
            store,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// One poll → check → dispatch → mark pass. Never panics on collaborator
    /// errors; they come back as `CycleReport::Failed`.
    pub async fn run_cycle(&self) -> CycleReport {
        ensure_metrics_described();
        ingest::ensure_metrics_described();

        let Ok(_guard) = self.in_flight.try_lock() else {
            info!(source = %self.settings.source_id, "relay cycle already in progress; skipping");
            counter!("relay_busy_total").increment(1);
            return CycleReport::Busy;
        };

        counter!("relay_cycles_total").increment(1);
        gauge!("relay_last_cycle_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        let report = self.cycle_locked().await;
        match &report {
            CycleReport::Dispatched { id } => {
                counter!("relay_dispatched_total").increment(1);
                info!(target: "relay", post_id = %id, "cycle dispatched one post");
            }
            CycleReport::NothingNew { fetched } => {
                debug!(target: "relay", fetched, "cycle found nothing new");
            }
            CycleReport::Failed(e) => {
                counter!("relay_cycle_errors_total", "kind" => e.kind()).increment(1);
            }
            CycleReport::Busy => {}
        }
        report
    }

    async fn cycle_locked(&self) -> CycleReport {
        let s = &self.settings;

        let posts = match self.feed.fetch_recent(&s.source_id, s.fetch_limit).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, source = %s.source_id, feed = self.feed.name(), "error checking for new posts");
                return CycleReport::Failed(e);
            }
        };

        for post in &posts {
            if self.is_seen(&post.id).await {
                continue;
            }

            info!(post_id = %post.id, title = %post.title, "relaying new post");
            let msg = DispatchMessage::from_post(post, &s.permalink_base, &s.footer);

            if let Err(e) = self.sink.send(&s.destination_id, &msg).await {
                warn!(
                    post_id = %post.id,
                    error = %e,
                    sink = self.sink.name(),
                    "dispatch failed; post left unmarked for the next cycle"
                );
                return CycleReport::Failed(e);
            }

            if let Err(e) = self.store.mark_seen(&post.id).await {
                error!(
                    post_id = %post.id,
                    error = %e,
                    "post relayed but not recorded; it may be relayed again"
                );
            }
            return CycleReport::Dispatched {
                id: post.id.clone(),
            };
        }

        CycleReport::NothingNew {
            fetched: posts.len(),
        }
    }

    /// Store outages fail open: the post counts as unseen.
    async fn is_seen(&self, id: &str) -> bool {
        match self.store.has(id).await {
            Ok(seen) => seen,
            Err(e) => {
                warn!(post_id = id, error = %e, "seen store unavailable; treating post as unseen");
                counter!("relay_store_degraded_total").increment(1);
                false
            }
        }
    }

    /// Current feed window, no store access.
    pub async fn list_recent(&self) -> Result<Vec<PostRecord>, RelayError> {
        self.feed
            .fetch_recent(&self.settings.source_id, self.settings.fetch_limit)
            .await
    }
}
