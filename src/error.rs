// src/error.rs
use thiserror::Error;

/// Failures of the external collaborators the relay talks to.
///
/// None of these is fatal: the cycle catches them, logs them and the next
/// scheduled run starts from scratch.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("feed source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("dispatch sink unavailable: {0}")]
    SinkUnavailable(String),
    #[error("seen store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("chat model unavailable: {0}")]
    ModelUnavailable(String),
}

impl RelayError {
    /// Short static label, safe to expose to untrusted callers and to use as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::SourceUnavailable(_) => "source_unavailable",
            RelayError::SinkUnavailable(_) => "sink_unavailable",
            RelayError::StoreUnavailable(_) => "store_unavailable",
            RelayError::ModelUnavailable(_) => "model_unavailable",
        }
    }
}
