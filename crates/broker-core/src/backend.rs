//! # Resource Backend Contract
//!
//! The single capability the broker needs from the system of record: fetch
//! the current status of a credential. How the backend is reached (query
//! language, transport) is the implementation's business.
//!
//! Implementations must be `Send + Sync` so they can be shared across async
//! tasks behind an `Arc`. The trait is object-safe.

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{Correlation, ResourceRef};
use crate::status::BackendStatus;

/// Errors from a backend status lookup.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend holds no record for the reference.
    #[error("no credential record found for {record_id}")]
    NotFound {
        /// The record that was looked up.
        record_id: String,
    },

    /// The backend could not be reached.
    #[error("backend transport failure: {reason}")]
    Transport {
        /// Human-readable reason.
        reason: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend did not answer in time.
    #[error("backend timed out after {elapsed_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        elapsed_ms: u64,
    },

    /// The backend answered with an error status.
    #[error("backend returned {status}: {body}")]
    Api {
        /// HTTP (or equivalent) status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// The backend answered with a body that is not a status record.
    #[error("malformed backend response: {reason}")]
    Deserialization {
        /// Human-readable reason.
        reason: String,
    },
}

impl BackendError {
    /// Whether the backend reported that the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read access to credential status on the resource backend.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Fetch the current status of the credential identified by `resource`.
    ///
    /// `correlation` is passed through for the backend's diagnostics and must
    /// not influence which record is returned.
    async fn get_credential_status(
        &self,
        resource: &ResourceRef,
        correlation: &Correlation,
    ) -> Result<BackendStatus, BackendError>;
}

#[async_trait]
impl<T: ResourceBackend + ?Sized> ResourceBackend for std::sync::Arc<T> {
    async fn get_credential_status(
        &self,
        resource: &ResourceRef,
        correlation: &Correlation,
    ) -> Result<BackendStatus, BackendError> {
        (**self).get_credential_status(resource, correlation).await
    }
}
