//! # Broker Operation Types
//!
//! The closed set of asynchronous operations a platform can poll. The broker
//! protocol hands the operation back to us as an opaque token (whatever we
//! returned when the operation was accepted); [`OperationType::from_str`]
//! turns that token into a variant so every consumer matches exhaustively.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A broker-facing lifecycle verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Create a service instance.
    Provision,
    /// Change the plan or parameters of a service instance.
    Update,
    /// Create a credential (service binding) for an instance.
    Bind,
    /// Delete a credential.
    Unbind,
    /// Delete a service instance.
    Deprovision,
}

impl OperationType {
    /// All operation types, in lifecycle order.
    pub const ALL: [OperationType; 5] = [
        Self::Provision,
        Self::Update,
        Self::Bind,
        Self::Unbind,
        Self::Deprovision,
    ];

    /// Whether this operation removes a backend record. For these verbs the
    /// record disappearing is the success signal.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::Unbind | Self::Deprovision)
    }

    /// Whether this operation acts on a service binding rather than an instance.
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Bind | Self::Unbind)
    }

    /// Lowercase verb name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Update => "update",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::Deprovision => "deprovision",
        }
    }

    /// The token handed to the platform when the operation is accepted, and
    /// echoed back on every last-operation poll.
    pub fn operation_token(&self) -> String {
        format!("{}_operation", self.as_str())
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operation token did not name a known operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown operation token: {token:?}")]
pub struct ParseOperationError {
    /// The rejected token.
    pub token: String,
}

impl FromStr for OperationType {
    type Err = ParseOperationError;

    /// Accepts `bind` and `bind_operation` forms, case-insensitively.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let normalized = token.trim().to_ascii_lowercase();
        let verb = normalized
            .strip_suffix("_operation")
            .unwrap_or(&normalized);
        match verb {
            "provision" => Ok(Self::Provision),
            "update" => Ok(Self::Update),
            "bind" => Ok(Self::Bind),
            "unbind" => Ok(Self::Unbind),
            "deprovision" => Ok(Self::Deprovision),
            _ => Err(ParseOperationError {
                token: token.to_string(),
            }),
        }
    }
}
