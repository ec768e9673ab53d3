use actix_web::{web, Error, HttpResponse};
use moments_core::normalize_content;
use moments_llm::build_analysis_messages;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::logging::Timer;
use crate::state::AppState;

const SLOW_UPSTREAM_MS: u128 = 60_000;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Data-URL encoded images. Kept untyped so a wrong shape maps to the
    /// same client error as too few images.
    #[serde(default)]
    pub images: Option<Value>,
}

/// The body is extracted as a `Result` so a missing credential is reported
/// before anything about the request itself.
pub async fn handler(
    state: web::Data<AppState>,
    req: Result<web::Json<AnalyzeRequest>, Error>,
) -> Result<HttpResponse, Error> {
    let provider = state.provider.clone().ok_or_else(|| {
        log::error!("Rejecting analysis: upstream credential is not configured");
        AppError::MissingCredential
    })?;

    let received = req?.into_inner().images;
    let images = select_images(received, state.config.min_images, state.config.max_images)?;
    log::info!(
        "Forwarding {} image(s) to {}",
        images.len(),
        provider.model()
    );

    let timer = Timer::new("upstream analysis", SLOW_UPSTREAM_MS);
    let response = provider
        .complete(build_analysis_messages(&images))
        .await
        .map_err(|e| {
            log::error!("Upstream analysis failed: {}", e);
            AppError::from(e)
        })?;
    log::info!("Upstream analysis finished in {}ms", timer.elapsed_ms());

    let normalized = normalize_content(response.first_content());
    if normalized.structured.is_none() {
        log::warn!("Model reply had no parseable JSON; returning narrative only");
    }

    Ok(HttpResponse::Ok().json(normalized.into_envelope()))
}

/// Checks the minimum count, then keeps the first `max` images.
fn select_images(images: Option<Value>, min: usize, max: usize) -> Result<Vec<String>> {
    let Some(Value::Array(items)) = images else {
        return Err(AppError::TooFewImages(min));
    };
    if items.len() < min {
        return Err(AppError::TooFewImages(min));
    }
    if items.len() > max {
        log::info!("Received {} images; keeping the first {}", items.len(), max);
    }

    items
        .into_iter()
        .take(max)
        .map(|item| match item {
            Value::String(image) => Ok(image),
            _ => Err(AppError::InvalidRequest("图片数据格式错误".to_string())),
        })
        .collect()
}
