use moments_core::AnalysisEnvelope;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::compress::CompressError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";

/// Shown when nothing more specific can be extracted from a failure.
pub const GENERIC_FAILURE: &str = "分析失败，请稍后重试";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("请至少上传{0}张图片")]
    TooFewImages(usize),

    /// Readable message extracted from a gateway error response.
    #[error("{0}")]
    Gateway(String),

    #[error("分析结果格式异常，请稍后重试")]
    MalformedResult,

    #[error("{}", describe_transport_error(.0))]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Compress(#[from] CompressError),
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        message
    }
}

/// HTTP client for the analysis gateway. No timeout is applied to the
/// analysis call since model latency is unbounded.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Gateway(error_message_from_body(&body)));
        }
        serde_json::from_str(&body).map_err(|_| ClientError::MalformedResult)
    }

    pub async fn analyze(&self, images: &[String]) -> Result<AnalysisEnvelope, ClientError> {
        let url = format!("{}/api/analyze", self.base_url);
        log::debug!("Posting {} image(s) to {}", images.len(), url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "images": images }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::debug!("Gateway returned {}: {}", status, body);
            return Err(ClientError::Gateway(error_message_from_body(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::debug!("Unparseable gateway response: {}", e);
            ClientError::MalformedResult
        })
    }
}

/// Picks the most readable message out of an error response body.
///
/// The `error` field is tried first, then the whole body, then the raw text.
pub fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("error")
            .and_then(describe_error)
            .or_else(|| describe_error(&value))
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => GENERIC_FAILURE.to_string(),
    }
}

/// Renders an arbitrary error value as text.
///
/// Strings are used as-is. Objects yield their `message`, `error` or `detail`
/// string, then a nested `error` object, and otherwise their JSON text.
pub fn describe_error(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Object(map) => {
            let direct = ["message", "error", "detail"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|s| !s.trim().is_empty())
                .map(str::to_string);
            match direct {
                Some(message) => message,
                None => match map.get("error") {
                    Some(nested @ Value::Object(_)) => return describe_error(nested),
                    _ => value.to_string(),
                },
            }
        }
        Value::Array(_) => value.to_string(),
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
