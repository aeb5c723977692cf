//! Chat reply path: persona + bounded transcript → hosted model → short reply.

pub mod gemini;

use std::sync::Arc;

use metrics::counter;

use crate::config::ChatConfig;
use crate::error::RelayError;
use crate::history::{ChatHistory, Role};

pub use gemini::GeminiModel;

#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, RelayError>;
    fn name(&self) -> &'static str;
}

pub type DynChatModel = Arc<dyn ChatModel>;

pub struct ChatService {
    model: DynChatModel,
    persona: String,
    bot_name: String,
    history: ChatHistory,
    reply_max_chars: usize,
}

impl ChatService {
    pub fn new(
        model: DynChatModel,
        persona: String,
        bot_name: String,
        history_cap: usize,
        reply_max_chars: usize,
    ) -> Self {
        Self {
            model,
            persona,
            bot_name,
            history: ChatHistory::with_capacity(history_cap),
            reply_max_chars: reply_max_chars.max(1),
        }
    }

    pub fn from_config(cfg: &ChatConfig, model: DynChatModel) -> anyhow::Result<Self> {
        Ok(Self::new(
            model,
            cfg.persona()?,
            cfg.bot_name.clone(),
            cfg.history_cap,
            cfg.reply_max_chars,
        ))
    }

    pub fn greeting(&self) -> String {
        format!(
            "Hello! I'm {}, the community chat bot, here to make your experience fun. Ask me anything!",
            self.bot_name
        )
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Persona, then the retained transcript, then the new line for the bot to complete.
    pub fn build_prompt(&self, user_text: &str) -> String {
        let mut prompt = self.persona.clone();
        prompt.push_str("\n\n");
        for turn in self.history.snapshot() {
            let who = match turn.role {
                Role::User => "User",
                Role::Assistant => self.bot_name.as_str(),
            };
            prompt.push_str(&format!("{who}: {}\n", turn.content));
        }
        prompt.push_str(&format!("User: {user_text}\n{}: ", self.bot_name));
        prompt
    }

    /// The exchange is recorded only when the model answered.
    pub async fn reply(&self, user_text: &str) -> Result<String, RelayError> {
        counter!("chat_requests_total").increment(1);
        let prompt = self.build_prompt(user_text);

        let raw = self.model.generate(&prompt).await.map_err(|e| {
            tracing::warn!(error = %e, model = self.model.name(), "chat generation failed");
            counter!("chat_errors_total").increment(1);
            e
        })?;

        let reply = truncate_reply(raw.trim(), self.reply_max_chars);
        self.history.push(Role::User, user_text);
        self.history.push(Role::Assistant, reply.clone());
        Ok(reply)
    }
}

/// Cuts at `max` chars and appends "..." when anything was cut.
pub fn truncate_reply(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}
