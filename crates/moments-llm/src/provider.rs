use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{ChatCompletionResponse, ChatMessage};

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (HTTP {status}): {body}")]
    Api {
        status: u16,
        /// Message extracted from the error body, when the upstream sent one.
        message: Option<String>,
        body: String,
    },
}

impl LLMError {
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// A multimodal chat-completion backend.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<ChatCompletionResponse>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
