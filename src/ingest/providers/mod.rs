// src/ingest/providers/mod.rs
pub mod reddit;

pub use reddit::{RedditCredentials, RedditFeed};
