use agrolens_understanding::vision::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Gateway service configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Chat-completions endpoint of the upstream AI gateway
    pub ai_gateway_url: String,
    /// Bearer key for the upstream AI gateway
    pub ai_gateway_api_key: Option<String>,
    /// Model identifier sent upstream
    pub ai_model: String,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Log level
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            ai_gateway_url: DEFAULT_ENDPOINT.to_string(),
            ai_gateway_api_key: None,
            ai_model: DEFAULT_MODEL.to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("AGROLENS_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("AGROLENS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            ai_gateway_url: std::env::var("AI_GATEWAY_URL").unwrap_or(defaults.ai_gateway_url),
            ai_gateway_api_key: std::env::var("AI_GATEWAY_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            ai_model: std::env::var("AI_GATEWAY_MODEL").unwrap_or(defaults.ai_model),
            max_upload_bytes: std::env::var("AGROLENS_MAX_UPLOAD_MB")
                .ok()
                .and_then(|mb| upload_limit_bytes(&mb))
                .unwrap_or(defaults.max_upload_bytes),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Megabytes to bytes. `None` if unparsable or too large for `usize`.
fn upload_limit_bytes(mb: &str) -> Option<usize> {
    mb.trim().parse::<usize>().ok()?.checked_mul(1024 * 1024)
}
