pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod state;

pub use config::{Cli, GatewayConfig};
pub use error::AppError;
pub use server::{app_config, json_config, run_server};
pub use state::AppState;
