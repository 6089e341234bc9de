//! Resource backend client configuration.
//!
//! Loaded from environment variables or a YAML file. The token is held in
//! [`Zeroizing`] and never printed.

use std::path::Path;

use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for reaching the resource backend.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the backend API.
    pub base_url: Url,
    /// Bearer token for API authentication.
    pub api_token: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// On-disk form of [`BackendConfig`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: String,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `BROKER_BACKEND_URL` (required)
    /// - `BROKER_BACKEND_TOKEN` (required)
    /// - `BROKER_BACKEND_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("BROKER_BACKEND_URL").ok_or(ConfigError::MissingUrl)?;
        let api_token = lookup("BROKER_BACKEND_TOKEN").ok_or(ConfigError::MissingToken)?;
        let timeout_secs = match lookup("BROKER_BACKEND_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: parse_base_url("BROKER_BACKEND_URL", &raw_url)?,
            api_token: Zeroizing::new(api_token),
            timeout_secs,
        })
    }

    /// Load configuration from a YAML file.
    ///
    /// ```yaml
    /// base_url: https://backend.internal
    /// api_token: s3cret        # optional, falls back to BROKER_BACKEND_TOKEN
    /// timeout_secs: 10         # optional
    /// ```
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text, |var| std::env::var(var).ok())
    }

    fn from_yaml_str(
        text: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_yaml::from_str(text)?;
        let api_token = file
            .api_token
            .or_else(|| lookup("BROKER_BACKEND_TOKEN"))
            .ok_or(ConfigError::MissingToken)?;
        if file.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidTimeout("0".into()));
        }

        Ok(Self {
            base_url: parse_base_url("base_url", &file.base_url)?,
            api_token: Zeroizing::new(api_token),
            timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Create a configuration pointing to a local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the localhost URL cannot be parsed.
    pub fn local_mock(port: u16, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("localhost", &format!("http://127.0.0.1:{port}"))?,
            api_token: Zeroizing::new(token.to_string()),
            timeout_secs: 5,
        })
    }
}

fn parse_base_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(field.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            field.to_string(),
            "URL cannot carry a path".to_string(),
        ));
    }
    Ok(url)
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BROKER_BACKEND_URL environment variable is required")]
    MissingUrl,
    #[error("BROKER_BACKEND_TOKEN is required")]
    MissingToken,
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid timeout {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
