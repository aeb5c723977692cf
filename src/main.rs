//! Relay Bot: binary entrypoint
//! Connects the seen store, builds the Reddit/Discord/Gemini clients, spawns
//! the poll scheduler and serves the Axum HTTP surface until Ctrl-C/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relay_bot::api::{self, AppState};
use relay_bot::chat::{ChatService, GeminiModel};
use relay_bot::config::RelayConfig;
use relay_bot::ingest::providers::RedditFeed;
use relay_bot::ingest::scheduler::{spawn_relay_scheduler, RelaySchedulerCfg};
use relay_bot::metrics::Metrics;
use relay_bot::notify::{DiscordSink, DispatchSink, UnavailableSink};
use relay_bot::store::SqliteSeenStore;
use relay_bot::{Relay, RelaySettings};

/// Compact logs by default, JSON lines when LOG_FORMAT=json.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay_bot=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = RelayConfig::load_default().context("loading relay config")?;
    if cfg.channel_id.is_empty() {
        warn!("DISCORD_CHANNEL_ID not set; every dispatch will fail until it is configured");
    }

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = %e, "prometheus recorder not installed; /metrics disabled");
            None
        }
    };

    // --- collaborators ---
    let store = SqliteSeenStore::connect(&cfg.seen_db_path).await;

    let feed = RedditFeed::from_env()?;
    info!(
        subreddit = %cfg.subreddit,
        authenticated = feed.is_authenticated(),
        "reddit feed ready"
    );

    let sink: Arc<dyn DispatchSink> = match DiscordSink::from_env() {
        Some(discord) => {
            let discord = discord
                .with_timeout(cfg.discord.timeout_secs)
                .with_retries(cfg.discord.send_attempts);
            match discord.probe().await {
                Ok(name) => info!(bot = %name, "discord bot logged in"),
                Err(e) => warn!(error = %e, "discord token check failed; dispatches may fail"),
            }
            Arc::new(discord)
        }
        None => {
            warn!("DISCORD_TOKEN not set; relay cycles will fail until it is configured");
            Arc::new(UnavailableSink::new("DISCORD_TOKEN not set"))
        }
    };

    let relay = Arc::new(Relay::new(
        Arc::new(feed),
        sink,
        Arc::new(store.clone()),
        RelaySettings::from_config(&cfg),
    ));

    let chat = if cfg.chat.enabled {
        let model = GeminiModel::new(cfg.chat.api_key.clone(), &cfg.chat.model)?;
        let svc = ChatService::from_config(&cfg.chat, Arc::new(model)).context("building chat")?;
        Some(Arc::new(svc))
    } else {
        None
    };

    let scheduler = spawn_relay_scheduler(
        relay.clone(),
        RelaySchedulerCfg {
            interval_secs: cfg.poll_interval_secs,
        },
    );

    // --- HTTP ---
    let mut app = api::router(AppState { relay, chat });
    if let Some(m) = &metrics {
        app = app.merge(m.router());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    // --- teardown ---
    if let Err(e) = scheduler.stop().await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    store.close();
    info!("shutdown complete");
    Ok(())
}
