use async_trait::async_trait;
use reqwest::Client;

use crate::protocol::{
    extract_error_message, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use crate::provider::{LLMError, Result, VisionProvider};

pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_MODEL: &str = "doubao-seed-2-0-pro-260215";

/// Volcengine Ark chat-completions provider (OpenAI-compatible).
///
/// The HTTP client carries no timeout; the upstream's own limits decide how long
/// an analysis may take.
pub struct ArkProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    reasoning_effort: Option<String>,
}

impl ArkProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            reasoning_effort: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort.filter(|effort| !effort.trim().is_empty());
        self
    }

    fn build_request(&self, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            reasoning_effort: self.reasoning_effort.clone(),
            messages,
        }
    }
}

#[async_trait]
impl VisionProvider for ArkProvider {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<ChatCompletionResponse> {
        let body = self.build_request(messages);
        log::debug!(
            "Sending chat completion to {} (model: {}, messages: {})",
            self.base_url,
            self.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str(&text)
                .ok()
                .and_then(|value| extract_error_message(&value));
            return Err(LLMError::Api {
                status: status.as_u16(),
                message,
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
