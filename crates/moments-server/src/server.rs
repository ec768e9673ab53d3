use actix_cors::Cors;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{middleware::Logger, web, App, HttpServer, ResponseError};
use std::io;

use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::handlers;
use crate::state::AppState;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health::handler))
        .route("/api/analyze", web::post().to(handlers::analyze::handler));
}

/// JSON extractor settings: body limit, and body errors rendered as `{ error }`.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let app_error = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    AppError::PayloadTooLarge
                }
                other => AppError::InvalidRequest(format!("请求体格式错误：{}", other)),
            };
            log::warn!("Rejected request body: {}", err);
            InternalError::from_response(err, app_error.error_response()).into()
        })
}

pub async fn run_server(config: GatewayConfig) -> io::Result<()> {
    let port = config.port;
    let body_limit = config.body_limit_bytes;
    log::info!(
        "Initializing gateway with base URL: {}, model: {}, credential configured: {}",
        config.base_url,
        config.model,
        config.has_credential()
    );
    let state = web::Data::new(AppState::new(config));

    log::info!("Backend server listening on http://0.0.0.0:{}", port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config(body_limit))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
