use std::path::PathBuf;

/// AgroLens client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the farm assistant API (chat, weather, market)
    pub api_url: String,
    /// Base URL of the crop-detect gateway
    pub gateway_url: String,
    /// Signed-in session token, preferred for gateway calls
    pub session_token: Option<String>,
    /// Public key used when no session token is available
    pub public_key: String,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON
    pub log_json: bool,
    /// Directory for rolling log files
    pub log_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            gateway_url: "http://127.0.0.1:8080".to_string(),
            session_token: None,
            public_key: String::new(),
            log_level: "warn".to_string(),
            log_json: false,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("AGROLENS_API_URL").unwrap_or(defaults.api_url),
            gateway_url: std::env::var("AGROLENS_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            session_token: std::env::var("AGROLENS_SESSION_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            public_key: std::env::var("AGROLENS_PUBLIC_KEY").unwrap_or(defaults.public_key),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: std::env::var("AGROLENS_LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
            log_dir: std::env::var("AGROLENS_LOG_DIR").ok().map(PathBuf::from),
        }
    }

    pub fn detect_endpoint(&self) -> String {
        format!("{}/crop-detect", self.gateway_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_endpoint_joins_without_double_slash() {
        let config = ClientConfig {
            gateway_url: "https://gw.example/functions/v1/".into(),
            ..Default::default()
        };
        assert_eq!(config.detect_endpoint(), "https://gw.example/functions/v1/crop-detect");
    }
}
