// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub use types::{FeedSource, PostRecord};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_posts_fetched_total",
            "Posts returned by the feed source."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed source fetch/parse errors."
        );
        describe_histogram!("ingest_fetch_ms", "Feed fetch time in milliseconds.");
    });
}
