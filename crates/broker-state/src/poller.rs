//! # Status Poller
//!
//! One last-operation polling round: look the credential up on the backend,
//! classify what comes back, and report an outcome or a classified error.
//!
//! The poller holds nothing between calls. The backend is the authority on
//! operation state, so repeated polls simply re-read it; retry cadence
//! belongs to the platform's polling client.

use broker_core::{
    BackendError, ContextError, ErrorKind, LifecycleOutcome, LifecycleState, OperationContext,
    OperationType, ParseOperationError, ResourceBackend,
};
use thiserror::Error;

use crate::classifier::{classify, classify_absent, ClassifyError};
use crate::execution::{ExecutionContext, Interrupted};

/// Failure of one polling round.
#[derive(Error, Debug)]
pub enum PollError {
    /// No record exists and the operation is not a deletion.
    #[error("no backend record {record_id} for {operation}")]
    NotFound {
        /// The operation being polled.
        operation: OperationType,
        /// The record that was looked up.
        record_id: String,
    },

    /// The lookup failed for a reason unrelated to operation state.
    #[error("while getting credential status from backend: {source}")]
    BackendUnavailable {
        /// The backend failure.
        #[source]
        source: BackendError,
    },

    /// The backend condition has no lifecycle meaning for the operation.
    #[error(transparent)]
    UnexpectedState(#[from] ClassifyError),

    /// The backend moved an operation out of a terminal state.
    #[error("{operation} regressed from {previous} to {observed}")]
    Regressed {
        /// The operation being polled.
        operation: OperationType,
        /// Terminal state previously reported to the platform.
        previous: LifecycleState,
        /// State derived from the backend now.
        observed: LifecycleState,
    },

    /// The execution context ended before the backend answered.
    #[error("poll {0}")]
    Interrupted(Interrupted),

    /// The operation token named no known operation.
    #[error(transparent)]
    UnknownOperation(#[from] ParseOperationError),

    /// The request could not form an operation context.
    #[error(transparent)]
    InvalidContext(#[from] ContextError),
}

impl PollError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            Self::UnexpectedState(_) | Self::Regressed { .. } => ErrorKind::UnexpectedBackendState,
            Self::Interrupted(_) => ErrorKind::Cancelled,
            Self::UnknownOperation(_) | Self::InvalidContext(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Runs polling rounds against a resource backend.
#[derive(Debug, Clone)]
pub struct StatusPoller<B> {
    backend: B,
}

impl<B: ResourceBackend> StatusPoller<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Poll the backend once for `ctx`.
    ///
    /// Exactly one backend lookup is issued unless `exec` has already ended.
    pub async fn poll(
        &self,
        exec: &ExecutionContext,
        ctx: &OperationContext,
    ) -> Result<LifecycleOutcome, PollError> {
        let operation = ctx.operation();
        let resource = ctx.resource();
        let correlation = ctx.correlation();

        tracing::info!(
            verb = %operation,
            instance_id = %ctx.instance_id(),
            binding_id = ctx.binding_id().map(|b| b.as_str()).unwrap_or_default(),
            record_id = resource.record_id(),
            application_id = resource.application_id().map(|a| a.as_str()).unwrap_or_default(),
            bundle_id = resource.bundle_id().map(|b| b.as_str()).unwrap_or_default(),
            "Fetching credential status"
        );

        let lookup = self.backend.get_credential_status(resource, &correlation);
        let result = exec.run(lookup).await.map_err(|reason| {
            tracing::warn!(verb = %operation, record_id = resource.record_id(), "Poll {reason}");
            PollError::Interrupted(reason)
        })?;

        let status = match result {
            Ok(status) => status,
            Err(err) if err.is_not_found() => {
                if let Some(outcome) = classify_absent(operation) {
                    tracing::info!(verb = %operation, record_id = resource.record_id(), "Credential record gone");
                    return Ok(outcome);
                }
                tracing::error!(verb = %operation, record_id = resource.record_id(), "Credential record not found");
                return Err(PollError::NotFound {
                    operation,
                    record_id: resource.record_id().to_string(),
                });
            }
            Err(source) => {
                tracing::warn!(verb = %operation, record_id = resource.record_id(), error = %source, "Backend lookup failed");
                return Err(PollError::BackendUnavailable { source });
            }
        };

        tracing::info!(verb = %operation, status = %status, "Found credential status");

        classify(operation, &status).map_err(|err| {
            tracing::warn!(verb = %operation, status = %err.status, "Unexpected backend state, platform should keep polling");
            PollError::from(err)
        })
    }
}
