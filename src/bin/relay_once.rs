//! Runs a single relay cycle against the configured feed/channel and exits.
//! Useful from cron or for checking credentials without starting the server.

use std::sync::Arc;

use anyhow::Context;
use relay_bot::config::RelayConfig;
use relay_bot::ingest::providers::RedditFeed;
use relay_bot::notify::DiscordSink;
use relay_bot::store::SqliteSeenStore;
use relay_bot::{CycleReport, Relay, RelaySettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = RelayConfig::load_default().context("loading relay config")?;
    let store = SqliteSeenStore::connect(&cfg.seen_db_path).await;
    // Unlike the server, a missing token is fatal here: there is nothing else to do.
    let sink = DiscordSink::from_env()
        .context("DISCORD_TOKEN is not set")?
        .with_timeout(cfg.discord.timeout_secs)
        .with_retries(cfg.discord.send_attempts);

    let relay = Relay::new(
        Arc::new(RedditFeed::from_env()?),
        Arc::new(sink),
        Arc::new(store.clone()),
        RelaySettings::from_config(&cfg),
    );

    let report = relay.run_cycle().await;
    store.close();

    match report {
        CycleReport::Dispatched { id } => println!("relayed post {id}"),
        CycleReport::NothingNew { fetched } => println!("nothing new among {fetched} posts"),
        CycleReport::Busy => println!("another cycle is running"),
        CycleReport::Failed(e) => anyhow::bail!("relay cycle failed: {e}"),
    }
    Ok(())
}
