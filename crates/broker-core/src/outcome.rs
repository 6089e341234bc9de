//! # Lifecycle Outcome
//!
//! What a last-operation poll reports back to the platform. Built fresh on
//! every poll; never stored by the broker.

use serde::{Deserialize, Serialize};

use crate::operation::OperationType;

/// State of an asynchronous operation as reported to the platform.
///
/// Serializes with the broker protocol's wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Still running; the platform keeps polling.
    #[serde(rename = "in progress")]
    InProgress,
    /// Completed successfully (terminal).
    #[serde(rename = "succeeded")]
    Succeeded,
    /// Failed (terminal).
    #[serde(rename = "failed")]
    Failed,
}

impl LifecycleState {
    /// Whether the platform should stop polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of one last-operation poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    /// Reported state.
    pub state: LifecycleState,
    /// Human-readable description.
    pub description: String,
}

impl LifecycleOutcome {
    /// Operation still running.
    pub fn in_progress(description: impl Into<String>) -> Self {
        Self {
            state: LifecycleState::InProgress,
            description: description.into(),
        }
    }

    /// Operation completed.
    pub fn succeeded(description: impl Into<String>) -> Self {
        Self {
            state: LifecycleState::Succeeded,
            description: description.into(),
        }
    }

    /// Operation failed.
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            state: LifecycleState::Failed,
            description: description.into(),
        }
    }

    /// Whether the platform must run orphan mitigation for this outcome.
    ///
    /// Only a failed bind qualifies. Errors never do.
    pub fn requires_orphan_mitigation(&self, operation: OperationType) -> bool {
        self.state == LifecycleState::Failed && operation == OperationType::Bind
    }
}

impl std::fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.state, self.description)
    }
}
