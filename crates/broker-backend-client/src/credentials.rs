//! Typed client for the backend's credential status endpoint.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/v1/credentials/{record_id}/status` | Current status of a credential record |
//!
//! Optional query parameters `application_id` and `bundle_id` narrow the
//! lookup. Correlation ids travel as headers and do not affect which record
//! is returned.

use std::time::Duration;

use broker_core::{BackendError, BackendStatus, Correlation, ResourceRef};
use url::Url;
use uuid::Uuid;

/// API version path segment.
const API_PREFIX: &str = "v1";

pub const INSTANCE_ID_HEADER: &str = "X-Broker-Instance-Id";
pub const BINDING_ID_HEADER: &str = "X-Broker-Binding-Id";
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Client for the credential status endpoint.
#[derive(Debug, Clone)]
pub struct CredentialClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl CredentialClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// URL of the status resource for `resource`.
    pub fn status_url(&self, resource: &ResourceRef) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::Transport {
                reason: format!("base URL {} cannot carry a path", self.base_url),
                source: None,
            })?
            .pop_if_empty()
            .extend([API_PREFIX, "credentials", resource.record_id(), "status"]);

        if resource.application_id().is_some() || resource.bundle_id().is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(app) = resource.application_id() {
                query.append_pair("application_id", app.as_str());
            }
            if let Some(bundle) = resource.bundle_id() {
                query.append_pair("bundle_id", bundle.as_str());
            }
        }
        Ok(url)
    }

    /// Fetch the credential's current status.
    ///
    /// Calls `GET {base_url}/v1/credentials/{record_id}/status` once. A 404
    /// is reported as [`BackendError::NotFound`].
    pub async fn get_status(
        &self,
        resource: &ResourceRef,
        correlation: &Correlation,
    ) -> Result<BackendStatus, BackendError> {
        let url = self.status_url(resource)?;
        let request_id = Uuid::new_v4();

        let mut request = self
            .http
            .get(url)
            .header(INSTANCE_ID_HEADER, correlation.instance_id.as_str())
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(binding) = &correlation.binding_id {
            request = request.header(BINDING_ID_HEADER, binding.as_str());
        }

        tracing::debug!(%request_id, record_id = resource.record_id(), "GET credential status");

        let resp = request.send().await.map_err(|e| self.transport_error(e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound {
                record_id: resource.record_id().to_string(),
            });
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api { status, body });
        }

        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Deserialization {
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                elapsed_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            BackendError::Transport {
                reason: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}
