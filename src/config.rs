//! Configuration, loaded from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Default poll interval in seconds (default: 5)
    pub poll_interval_secs: u64,
    /// Per-attempt probe timeout in milliseconds (default: 3000)
    pub probe_timeout_ms: u64,
    /// API key for the troubleshooting assistant; AI features are disabled
    /// without it.
    pub gemini_api_key: Option<String>,
    /// Model name for the assistant (default: "gemini-2.5-flash")
    pub gemini_model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            poll_interval_secs: 5,
            probe_timeout_ms: 3000,
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `NETWATCH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `NETWATCH_POLL_INTERVAL`: poll interval in seconds, minimum 1 (default: 5)
    /// - `NETWATCH_PROBE_TIMEOUT_MS`: probe timeout in milliseconds (default: 3000)
    /// - `GEMINI_API_KEY`: assistant API key (optional)
    /// - `NETWATCH_GEMINI_MODEL`: assistant model (default: "gemini-2.5-flash")
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("NETWATCH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(interval_str) = env::var("NETWATCH_POLL_INTERVAL") {
            if let Ok(interval) = interval_str.parse::<u64>() {
                cfg.poll_interval_secs = interval.max(1);
            }
        }

        if let Ok(timeout_str) = env::var("NETWATCH_PROBE_TIMEOUT_MS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                if timeout > 0 {
                    cfg.probe_timeout_ms = timeout;
                }
            }
        }

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                cfg.gemini_api_key = Some(key);
            }
        }

        if let Ok(model) = env::var("NETWATCH_GEMINI_MODEL") {
            if !model.is_empty() {
                cfg.gemini_model = model;
            }
        }

        cfg
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
