use clap::Parser;
use moments_core::limits::{BODY_LIMIT_MB, GATEWAY_MIN_IMAGES, MAX_IMAGES, MB};
use moments_llm::ark::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Parser, Debug, Clone)]
#[command(name = "moments-server")]
#[command(about = "Moments screenshot analysis gateway")]
#[command(version)]
pub struct Cli {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Upstream API key; analysis requests fail with 500 while unset
    #[arg(long, env = "ARK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Upstream chat-completions base URL
    #[arg(long, env = "ARK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Upstream model name
    #[arg(long, env = "ARK_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Reasoning effort hint sent upstream (empty to omit)
    #[arg(long, env = "ARK_REASONING_EFFORT", default_value = "medium")]
    pub reasoning_effort: String,

    /// Fewest images accepted per analysis
    #[arg(long, env = "MIN_IMAGES", default_value_t = GATEWAY_MIN_IMAGES)]
    pub min_images: usize,

    /// Images beyond this count are not forwarded
    #[arg(long, env = "MAX_IMAGES", default_value_t = MAX_IMAGES)]
    pub max_images: usize,

    /// Request body limit in megabytes
    #[arg(long, env = "BODY_LIMIT_MB", default_value_t = BODY_LIMIT_MB)]
    pub body_limit_mb: usize,

    /// Log level (overrides debug flag)
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,
}

/// Gateway settings, resolved once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Trimmed; `None` when unset or blank.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub reasoning_effort: Option<String>,
    pub min_images: usize,
    pub max_images: usize,
    pub body_limit_bytes: usize,
}

impl GatewayConfig {
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = normalize_key(Some(api_key.into()));
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            reasoning_effort: Some("medium".to_string()),
            min_images: GATEWAY_MIN_IMAGES,
            max_images: MAX_IMAGES,
            body_limit_bytes: BODY_LIMIT_MB * MB as usize,
        }
    }
}

impl From<&Cli> for GatewayConfig {
    fn from(cli: &Cli) -> Self {
        let reasoning_effort = Some(cli.reasoning_effort.trim().to_string())
            .filter(|effort| !effort.is_empty());

        Self {
            port: cli.port,
            api_key: normalize_key(cli.api_key.clone()),
            base_url: cli.base_url.trim().to_string(),
            model: cli.model.clone(),
            reasoning_effort,
            min_images: cli.min_images,
            max_images: cli.max_images.max(1),
            body_limit_bytes: cli.body_limit_mb.max(1) * MB as usize,
        }
    }
}

// Never print the key.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("min_images", &self.min_images)
            .field("max_images", &self.max_images)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish()
    }
}

fn normalize_key(key: Option<String>) -> Option<String> {
    key.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["moments-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cli = parse(&["--api-key", "   "]);
        let config = GatewayConfig::from(&cli);
        assert!(!config.has_credential());
    }

    #[test]
    fn api_key_is_trimmed() {
        let cli = parse(&["--api-key", "  abc \n"]);
        let config = GatewayConfig::from(&cli);
        assert_eq!(config.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn limits_come_from_arguments() {
        let cli = parse(&[
            "--api-key",
            "k",
            "--min-images",
            "2",
            "--max-images",
            "4",
            "--body-limit-mb",
            "10",
            "--reasoning-effort",
            "",
        ]);
        let config = GatewayConfig::from(&cli);

        assert_eq!(config.min_images, 2);
        assert_eq!(config.max_images, 4);
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
        assert!(config.reasoning_effort.is_none());
    }

    #[test]
    fn debug_output_hides_key() {
        let config = GatewayConfig::default().with_api_key("super-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("***"));
    }
}
