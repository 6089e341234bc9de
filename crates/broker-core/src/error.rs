//! # Error Kinds
//!
//! The closed taxonomy every last-operation failure falls into. Concrete
//! error types live next to the code that raises them; each exposes a
//! `kind()` so the broker-protocol layer can decide what to tell the
//! platform without matching on error internals.

use serde::{Deserialize, Serialize};

/// Classification of a last-operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No backend record exists and the operation is not a deletion.
    NotFound,
    /// Transport or backend failure unrelated to operation state.
    BackendUnavailable,
    /// The backend reported a condition with no lifecycle meaning for this
    /// operation, or one that would regress a terminal state.
    UnexpectedBackendState,
    /// The execution context was cancelled or hit its deadline.
    Cancelled,
    /// The request could not be turned into an operation context.
    InvalidRequest,
}

impl ErrorKind {
    /// Whether the platform should poll again after this error.
    ///
    /// Neither kind here may be read as success or as failure; in particular
    /// they never trigger orphan mitigation.
    pub fn keep_polling(&self) -> bool {
        matches!(self, Self::UnexpectedBackendState | Self::BackendUnavailable)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::BackendUnavailable => "backend_unavailable",
            Self::UnexpectedBackendState => "unexpected_backend_state",
            Self::Cancelled => "cancelled",
            Self::InvalidRequest => "invalid_request",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_polling_kinds() {
        assert!(ErrorKind::UnexpectedBackendState.keep_polling());
        assert!(ErrorKind::BackendUnavailable.keep_polling());
        assert!(!ErrorKind::NotFound.keep_polling());
        assert!(!ErrorKind::Cancelled.keep_polling());
        assert!(!ErrorKind::InvalidRequest.keep_polling());
    }
}
