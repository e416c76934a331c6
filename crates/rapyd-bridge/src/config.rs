use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::constants::{DEFAULT_TIMEOUT_SECS, LIVE_BASE_URL, SANDBOX_BASE_URL};

/// Gateway environment. Credentials and base URL always come from the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Live,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Live => "live",
        }
    }

    /// Selector used by the front door: only `"live"` picks live, anything
    /// else (absent, empty, another type) falls to sandbox.
    pub fn from_selector(value: Option<&serde_json::Value>) -> Self {
        match value.and_then(|v| v.as_str()) {
            Some("live") => Environment::Live,
            _ => Environment::Sandbox,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(Environment::Sandbox),
            "live" => Ok(Environment::Live),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Access key / secret key pair for one environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// `None` when either key is unset; dispatch then fails before any network call.
    pub credentials: Option<Credentials>,
    pub base_url: String,
}

impl EnvironmentConfig {
    pub fn new(credentials: Option<Credentials>, base_url: impl Into<String>) -> Self {
        Self {
            credentials,
            base_url: base_url.into(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Process-wide gateway configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub sandbox: EnvironmentConfig,
    pub live: EnvironmentConfig,
    /// Upper bound for a single upstream call.
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(sandbox: EnvironmentConfig, live: EnvironmentConfig) -> Self {
        Self {
            sandbox,
            live,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn environment(&self, env: Environment) -> &EnvironmentConfig {
        match env {
            Environment::Sandbox => &self.sandbox,
            Environment::Live => &self.live,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        // Sandbox falls back to the legacy single-key variables; live never does.
        let sandbox_credentials =
            match key_pair_from_env("RAPYD_SANDBOX_ACCESS_KEY", "RAPYD_SANDBOX_SECRET_KEY") {
                KeyPair::Complete(credentials) => Some(credentials),
                KeyPair::Partial => {
                    tracing::warn!(
                        "sandbox key pair is only half set; ignoring it and falling back to RAPYD_ACCESS_KEY"
                    );
                    key_pair_from_env("RAPYD_ACCESS_KEY", "RAPYD_SECRET_KEY").complete()
                }
                KeyPair::Unset => key_pair_from_env("RAPYD_ACCESS_KEY", "RAPYD_SECRET_KEY").complete(),
            };
        let live_credentials =
            match key_pair_from_env("RAPYD_LIVE_ACCESS_KEY", "RAPYD_LIVE_SECRET_KEY") {
                KeyPair::Complete(credentials) => Some(credentials),
                KeyPair::Partial => {
                    tracing::warn!("live key pair is only half set; ignoring it");
                    None
                }
                KeyPair::Unset => None,
            };

        let sandbox_base_url = base_url_from_env("RAPYD_SANDBOX_BASE_URL", SANDBOX_BASE_URL)?;
        let live_base_url = base_url_from_env("RAPYD_LIVE_BASE_URL", LIVE_BASE_URL)?;

        let timeout_secs = match non_empty_var("RAPYD_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        if sandbox_credentials.is_none() {
            tracing::warn!("sandbox credentials not set; sandbox calls will fail with a configuration error");
        }
        if live_credentials.is_none() {
            tracing::warn!("live credentials not set; live calls will fail with a configuration error");
        }

        Ok(Self {
            sandbox: EnvironmentConfig::new(sandbox_credentials, sandbox_base_url),
            live: EnvironmentConfig::new(live_credentials, live_base_url),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// How much of one access/secret variable pair is present.
#[derive(Debug)]
enum KeyPair {
    Complete(Credentials),
    Partial,
    Unset,
}

impl KeyPair {
    fn from_values(access_key: Option<String>, secret_key: Option<String>) -> Self {
        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => {
                KeyPair::Complete(Credentials::new(access_key, secret_key))
            }
            (None, None) => KeyPair::Unset,
            _ => KeyPair::Partial,
        }
    }

    fn complete(self) -> Option<Credentials> {
        match self {
            KeyPair::Complete(credentials) => Some(credentials),
            KeyPair::Partial | KeyPair::Unset => None,
        }
    }
}

fn key_pair_from_env(access_var: &str, secret_var: &str) -> KeyPair {
    KeyPair::from_values(non_empty_var(access_var), non_empty_var(secret_var))
}

fn base_url_from_env(var: &'static str, default: &str) -> Result<String, ConfigError> {
    let url = non_empty_var(var).unwrap_or_else(|| default.to_string());
    validate_base_url(&url)?;
    Ok(url.trim_end_matches('/').to_string())
}

/// Base URLs must be absolute http(s) URLs without a path of their own.
pub fn validate_base_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "https" | "http") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }
    if parsed.path().trim_end_matches('/') != "" {
        return Err(ConfigError::InvalidUrl(format!(
            "{url} (base URL must not include a path)"
        )));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
}
