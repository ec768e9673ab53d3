use clap::Parser;
use std::io;

use moments_server::logging::init_logging;
use moments_server::{run_server, Cli, GatewayConfig};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.log_level.is_some() {
        env_logger::init();
    } else {
        init_logging(cli.debug);
    }

    let config = GatewayConfig::from(&cli);

    log::info!("Starting Moments gateway on port {}", config.port);
    log::info!("Upstream configuration:");
    log::info!("  Base URL: {}", config.base_url);
    log::info!("  Model: {}", config.model);
    log::info!(
        "  Images per request: {}..={}",
        config.min_images,
        config.max_images
    );

    if cli.debug {
        log::debug!("Debug mode enabled");
        log::debug!("Server configuration: {:?}", config);
    }

    run_server(config).await
}
