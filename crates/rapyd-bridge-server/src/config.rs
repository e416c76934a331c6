use std::env;

use rapyd::{ConfigError, GatewayConfig};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_LIMIT_RPM: u64 = 60;
const DEFAULT_ALLOWED_ORIGIN: &str = "https://rapydtoolkit.com";

#[derive(Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u64,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
    /// Sandbox and live credentials, base URLs, upstream timeout
    pub gateway: GatewayConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl ServerConfig {
    pub fn new(gateway: GatewayConfig) -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            metrics_token: None,
            gateway,
        }
    }

    pub fn from_env() -> Result<Self, ServerConfigError> {
        let gateway = GatewayConfig::from_env()?;

        // Optional: port
        let port = match env::var("PORT").ok().filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse().map_err(|_| ServerConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        // Optional: allowed origins
        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);

        // Optional: rate limit
        let rate_limit_rpm = env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|rpm| *rpm > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        // Optional: metrics token
        let metrics_token = env::var("METRICS_TOKEN").ok().filter(|s| !s.is_empty());

        if allowed_origins.iter().any(|o| o == "*") {
            tracing::warn!("ALLOWED_ORIGINS contains '*' — any site can call the payment endpoints");
        }
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set — /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
            gateway,
        })
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error(transparent)]
    Gateway(#[from] ConfigError),

    #[error("invalid port: {0}")]
    InvalidPort(String),
}
