use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use moments_llm::LLMError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

pub const UPSTREAM_FAILED: &str = "调用模型接口失败";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("请至少上传{0}张图片进行分析")]
    TooFewImages(usize),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("请求体过大")]
    PayloadTooLarge,

    #[error("服务端未配置 ARK_API_KEY")]
    MissingCredential,

    #[error("{0}")]
    Upstream(String),
}

impl From<LLMError> for AppError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Api {
                message: Some(message),
                ..
            } => AppError::Upstream(message),
            LLMError::Api { message: None, .. } => AppError::Upstream(UPSTREAM_FAILED.to_string()),
            other => AppError::Upstream(format!("分析失败：{}", other)),
        }
    }
}

#[derive(Serialize)]
struct JsonError {
    error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::TooFewImages(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(JsonError {
            error: self.to_string(),
        })
    }
}
