//! # Operation Classifier
//!
//! Maps an operation and the backend's view of its credential record to the
//! outcome reported to the platform. Pure: no I/O, no state.
//!
//! ## Creation verbs (PROVISION, UPDATE, BIND)
//!
//! ```text
//! SUCCEEDED ──▶ succeeded   (backend message)
//! PENDING   ──▶ in progress (backend message)
//! FAILED    ──▶ failed      (backend message; bind failures trigger orphan mitigation)
//! UNUSED, INITIAL, unknown ──▶ ClassifyError (keep polling)
//! ```
//!
//! UNUSED marks a record that is not populated yet. Reporting it as failed
//! would send the platform into orphan mitigation for a credential that is
//! merely early, so it is surfaced as an error the caller polls through.
//!
//! ## Deletion verbs (UNBIND, DEPROVISION)
//!
//! Completion is confirmed only by the record disappearing. While any record
//! exists the deletion is in progress, whatever its condition.

use broker_core::{BackendStatus, LifecycleOutcome, OperationType, StatusCondition};
use thiserror::Error;

/// Description reported once a binding's credentials are gone.
pub const CREDENTIALS_DELETED: &str = "credentials were successfully deleted";

/// Description reported while a binding's credentials still exist.
pub const CREDENTIALS_DELETING: &str = "credentials deletion is in progress";

/// Description reported once a service instance is gone.
pub const INSTANCE_DELETED: &str = "service instance was successfully deleted";

/// Description reported while a service instance still exists.
pub const INSTANCE_DELETING: &str = "service instance deletion is in progress";

/// The backend condition has no lifecycle meaning for the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operation reached unexpected state: op {operation}, status {status}")]
pub struct ClassifyError {
    /// The operation being polled.
    pub operation: OperationType,
    /// The status the backend reported.
    pub status: BackendStatus,
}

/// Classify an existing backend record.
pub fn classify(
    operation: OperationType,
    status: &BackendStatus,
) -> Result<LifecycleOutcome, ClassifyError> {
    match operation {
        OperationType::Provision | OperationType::Update | OperationType::Bind => {
            let description = status.message_or_empty();
            match status.condition {
                StatusCondition::Succeeded => Ok(LifecycleOutcome::succeeded(description)),
                StatusCondition::Pending => Ok(LifecycleOutcome::in_progress(description)),
                StatusCondition::Failed => Ok(LifecycleOutcome::failed(description)),
                StatusCondition::Unused | StatusCondition::Initial | StatusCondition::Unknown => {
                    Err(ClassifyError {
                        operation,
                        status: status.clone(),
                    })
                }
            }
        }
        OperationType::Unbind => Ok(LifecycleOutcome::in_progress(CREDENTIALS_DELETING)),
        OperationType::Deprovision => Ok(LifecycleOutcome::in_progress(INSTANCE_DELETING)),
    }
}

/// Classify a record the backend no longer has.
///
/// Returns the terminal success for deletion verbs and `None` otherwise;
/// a missing record for a creation verb is the caller's not-found case.
pub fn classify_absent(operation: OperationType) -> Option<LifecycleOutcome> {
    match operation {
        OperationType::Unbind => Some(LifecycleOutcome::succeeded(CREDENTIALS_DELETED)),
        OperationType::Deprovision => Some(LifecycleOutcome::succeeded(INSTANCE_DELETED)),
        OperationType::Provision | OperationType::Update | OperationType::Bind => None,
    }
}
