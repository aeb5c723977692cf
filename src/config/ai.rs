// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

fn default_enabled() -> bool {
    true
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_bot_name() -> String {
    "Luna".to_string()
}
fn default_history_cap() -> usize {
    100
}
fn default_reply_max_chars() -> usize {
    200
}
fn default_api_key() -> String {
    "ENV".to_string()
}

/// `[chat]` table of the relay config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    /// Plain-text persona prompt. Built-in neutral persona when absent.
    #[serde(default)]
    pub persona_path: Option<PathBuf>,
    /// Turns kept for prompt context (persona not counted).
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_reply_max_chars")]
    pub reply_max_chars: usize,
    /// "ENV" means: read from API_KEY, then GEMINI_API_KEY
    #[serde(default = "default_api_key", skip_serializing)]
    pub api_key: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: default_model(),
            bot_name: default_bot_name(),
            persona_path: None,
            history_cap: default_history_cap(),
            reply_max_chars: default_reply_max_chars(),
            api_key: default_api_key(),
        }
    }
}

impl ChatConfig {
    /// Resolves the "ENV" key placeholder and clamps the numeric bounds.
    /// A missing key is not an error; the model client reports it per request.
    pub fn resolve(mut self) -> Self {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("API_KEY")
                .or_else(|_| env::var("GEMINI_API_KEY"))
                .unwrap_or_default();
            if self.api_key.is_empty() && self.enabled {
                tracing::warn!("chat enabled but neither API_KEY nor GEMINI_API_KEY is set");
            }
        }

        if self.history_cap == 0 {
            self.history_cap = default_history_cap();
        }
        if self.reply_max_chars == 0 {
            self.reply_max_chars = default_reply_max_chars();
        }
        self
    }

    pub fn persona(&self) -> anyhow::Result<String> {
        match &self.persona_path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("reading persona from {}: {e}", p.display()))?;
                Ok(text.trim().to_string())
            }
            None => Ok(default_persona(&self.bot_name)),
        }
    }
}

fn default_persona(bot_name: &str) -> String {
    format!(
        "You are {bot_name}, a friendly chat bot for a streaming community. \
Keep the mood light and joke often, but stay away from politics and religion. \
Answer in the language you are addressed in, in under 200 characters. \
Never start a reply with \"!\" or \"/\". \
Decline requests for personal information or anything illegal."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bounds_fall_back_to_defaults() {
        let cfg = ChatConfig {
            history_cap: 0,
            reply_max_chars: 0,
            api_key: "literal".into(),
            ..Default::default()
        }
        .resolve();
        assert_eq!(cfg.history_cap, 100);
        assert_eq!(cfg.reply_max_chars, 200);
        assert_eq!(cfg.api_key, "literal");
    }

    #[test]
    fn default_persona_mentions_bot_name() {
        let cfg = ChatConfig {
            bot_name: "Nova".into(),
            ..Default::default()
        };
        assert!(cfg.persona().unwrap().starts_with("You are Nova"));
    }
}
