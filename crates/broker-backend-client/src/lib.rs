//! # broker-backend-client -- HTTP access to the resource backend
//!
//! Implements [`broker_core::ResourceBackend`] over the backend's REST API.
//! The broker only ever reads credential status, so this crate exposes a
//! single endpoint.
//!
//! ## Behavior
//!
//! - Bearer token on every request, per-request timeout from config.
//! - One request per lookup. Retry cadence belongs to whoever polls.
//! - 404 becomes [`BackendError::NotFound`](broker_core::BackendError::NotFound);
//!   every other failure keeps its own variant so the state machine can
//!   report it as backend unavailability.

pub mod config;
pub mod credentials;

pub use config::{BackendConfig, ConfigError};
pub use credentials::CredentialClient;

use std::time::Duration;

use async_trait::async_trait;
use broker_core::{BackendError, BackendStatus, Correlation, ResourceBackend, ResourceRef};

/// Errors building the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialise HTTP client: {0}")]
    Http(#[source] reqwest::Error),
}

/// Resource backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpResourceBackend {
    credentials: CredentialClient,
}

impl HttpResourceBackend {
    /// Create a new backend client from configuration.
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth = reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    config.api_token.as_str()
                ))
                .map_err(|_| ClientError::Config(ConfigError::InvalidToken))?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers
            })
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            credentials: CredentialClient::new(http, config.base_url, timeout),
        })
    }

    /// Access the credential status client.
    pub fn credentials(&self) -> &CredentialClient {
        &self.credentials
    }
}

#[async_trait]
impl ResourceBackend for HttpResourceBackend {
    async fn get_credential_status(
        &self,
        resource: &ResourceRef,
        correlation: &Correlation,
    ) -> Result<BackendStatus, BackendError> {
        self.credentials.get_status(resource, correlation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_unfit_for_header_is_invalid_not_missing() {
        let config = BackendConfig::local_mock(9000, "line\nbreak").unwrap();
        let err = HttpResourceBackend::new(config).unwrap_err();
        assert!(matches!(err, ClientError::Config(ConfigError::InvalidToken)));
        assert!(!err.to_string().contains("required"));
    }

    #[test]
    fn valid_token_builds_client() {
        let config = BackendConfig::local_mock(9000, "test-token").unwrap();
        assert!(HttpResourceBackend::new(config).is_ok());
    }
}
