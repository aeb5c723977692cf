// src/config/mod.rs
pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use ai::ChatConfig;

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

fn default_subreddit() -> String {
    "IndianDankMemes".to_string()
}
fn default_fetch_limit() -> usize {
    5
}
fn default_poll_interval_secs() -> u64 {
    60
}
/// Longest accepted poll period (one day).
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;
fn default_permalink_base() -> String {
    "https://reddit.com".to_string()
}
fn default_footer() -> String {
    crate::notify::DEFAULT_FOOTER.to_string()
}
fn default_seen_db_path() -> PathBuf {
    PathBuf::from("posts.db")
}
fn default_port() -> u16 {
    3000
}
fn default_send_attempts() -> u8 {
    1
}
fn default_discord_timeout_secs() -> u64 {
    5
}

/// `[discord]` table: delivery knobs for the bot REST sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Total POST attempts per message. More than one can double-post when
    /// a request landed but its answer was lost.
    #[serde(default = "default_send_attempts")]
    pub send_attempts: u8,
    #[serde(default = "default_discord_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            send_attempts: default_send_attempts(),
            timeout_secs: default_discord_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    /// Discord channel id. Empty means "not configured".
    #[serde(default)]
    pub channel_id: String,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_permalink_base")]
    pub permalink_base: String,
    #[serde(default = "default_footer")]
    pub footer: String,
    #[serde(default = "default_seen_db_path")]
    pub seen_db_path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            channel_id: String::new(),
            fetch_limit: default_fetch_limit(),
            poll_interval_secs: default_poll_interval_secs(),
            permalink_base: default_permalink_base(),
            footer: default_footer(),
            seen_db_path: default_seen_db_path(),
            port: default_port(),
            discord: DiscordConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        let cfg: RelayConfig = toml::from_str(&content)
            .with_context(|| format!("parsing relay config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $RELAY_CONFIG_PATH
    /// 2) config/relay.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };

        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.chat = cfg.chat.resolve();
        Ok(cfg.sanitized())
    }

    /// Env names mirror the field names: SUBREDDIT, DISCORD_CHANNEL_ID, PORT,
    /// SEEN_DB_PATH, POLL_INTERVAL_SECS, FETCH_LIMIT.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SUBREDDIT") {
            self.subreddit = v;
        }
        if let Some(v) = get("DISCORD_CHANNEL_ID") {
            self.channel_id = v;
        }
        if let Some(v) = get("SEEN_DB_PATH") {
            self.seen_db_path = PathBuf::from(v);
        }
        if let Some(v) = get("PORT") {
            self.port = v.parse().with_context(|| format!("PORT={v} is not a port"))?;
        }
        if let Some(v) = get("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = v
                .parse()
                .with_context(|| format!("POLL_INTERVAL_SECS={v} is not a number"))?;
        }
        if let Some(v) = get("FETCH_LIMIT") {
            self.fetch_limit = v
                .parse()
                .with_context(|| format!("FETCH_LIMIT={v} is not a number"))?;
        }
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.fetch_limit == 0 {
            self.fetch_limit = default_fetch_limit();
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = default_poll_interval_secs();
        }
        self.poll_interval_secs = self.poll_interval_secs.min(MAX_POLL_INTERVAL_SECS);
        self.discord.send_attempts = self
            .discord
            .send_attempts
            .clamp(1, crate::notify::discord::MAX_SEND_ATTEMPTS);
        if self.discord.timeout_secs == 0 {
            self.discord.timeout_secs = default_discord_timeout_secs();
        }
        self.subreddit = self
            .subreddit
            .trim()
            .trim_start_matches("r/")
            .trim_start_matches("/r/")
            .to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let cfg: RelayConfig = toml::from_str(
            r#"
            subreddit = "rust"
            channel_id = "123"
            [chat]
            bot_name = "Nova"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.subreddit, "rust");
        assert_eq!(cfg.fetch_limit, 5);
        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.footer, "Posted on Reddit");
        assert_eq!(cfg.chat.bot_name, "Nova");
        assert_eq!(cfg.chat.history_cap, 100);
    }

    #[test]
    fn overrides_win_and_bad_numbers_fail() {
        let vars: HashMap<&str, &str> =
            [("SUBREDDIT", "memes"), ("PORT", "8080"), ("FETCH_LIMIT", " ")]
                .into_iter()
                .collect();
        let mut cfg = RelayConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.subreddit, "memes");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.fetch_limit, 5, "blank values are ignored");

        let mut cfg = RelayConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "POLL_INTERVAL_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_SECS"));
    }

    #[test]
    fn sanitize_clamps_zeroes_and_strips_prefix() {
        let cfg = RelayConfig {
            subreddit: " r/rust ".into(),
            fetch_limit: 0,
            poll_interval_secs: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.subreddit, "rust");
        assert_eq!(cfg.fetch_limit, 5);
        assert_eq!(cfg.poll_interval_secs, 60);
    }

    #[test]
    fn discord_table_is_read_and_bounded() {
        let cfg: RelayConfig = toml::from_str(
            r#"
            [discord]
            send_attempts = 200
            timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.discord.send_attempts, 200);
        let cfg = cfg.sanitized();
        assert_eq!(cfg.discord.send_attempts, 6);
        assert_eq!(cfg.discord.timeout_secs, 5);
        assert_eq!(RelayConfig::default().discord.send_attempts, 1);
    }

    #[test]
    fn poll_interval_is_capped_at_one_day() {
        let cfg = RelayConfig {
            poll_interval_secs: u64::MAX,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.poll_interval_secs, MAX_POLL_INTERVAL_SECS);

        let mut cfg = RelayConfig::default();
        cfg.apply_overrides(|k| (k == "POLL_INTERVAL_SECS").then(|| "18446744073709551615".to_string()))
            .unwrap();
        assert_eq!(cfg.sanitized().poll_interval_secs, 86_400);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_path_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // No file in CWD → defaults
        let cfg = RelayConfig::load_default().unwrap();
        assert_eq!(cfg.subreddit, "IndianDankMemes");

        // Env path takes precedence
        let p = tmp.path().join("custom.toml");
        fs::write(&p, r#"subreddit = "rust""#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let cfg = RelayConfig::load_default().unwrap();
        assert_eq!(cfg.subreddit, "rust");

        // Missing env path is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(RelayConfig::load_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
