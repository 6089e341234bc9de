//! # Backend Credential Status
//!
//! The status record the resource backend keeps for a credential. The
//! broker only reads it. A missing record is reported through
//! [`BackendError::NotFound`](crate::BackendError::NotFound), never as a
//! status value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition of a credential record as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCondition {
    /// Record created, nothing requested yet.
    Initial,
    /// The backend is still working on the request.
    Pending,
    /// The request completed.
    Succeeded,
    /// The request failed.
    Failed,
    /// Record exists but has not been populated.
    Unused,
    /// Forward-compatible catch-all for conditions this broker does not know.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for StatusCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initial => "INITIAL",
            Self::Pending => "PENDING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Unused => "UNUSED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Status record for one credential.
///
/// Fields other than `condition` use `#[serde(default)]` so that backends
/// omitting them still parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Current condition.
    pub condition: StatusCondition,
    /// Human-readable message; surfaced to the platform as the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable reason code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the backend last changed the condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl BackendStatus {
    /// Status with a condition and message, no reason or timestamp.
    pub fn new(condition: StatusCondition, message: impl Into<String>) -> Self {
        Self {
            condition,
            message: Some(message.into()),
            reason: None,
            timestamp: None,
        }
    }

    /// The message, or an empty string when the backend sent none.
    pub fn message_or_empty(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "condition={}", self.condition)?;
        if let Some(reason) = &self.reason {
            write!(f, " reason={reason}")?;
        }
        if let Some(message) = &self.message {
            write!(f, " message={message:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_condition_parses_as_unknown() {
        let status: BackendStatus =
            serde_json::from_str(r#"{"condition":"ARCHIVED","message":"x"}"#).unwrap();
        assert_eq!(status.condition, StatusCondition::Unknown);
    }

    #[test]
    fn optional_fields_default() {
        let status: BackendStatus = serde_json::from_str(r#"{"condition":"PENDING"}"#).unwrap();
        assert_eq!(status.condition, StatusCondition::Pending);
        assert_eq!(status.message, None);
        assert_eq!(status.message_or_empty(), "");
    }

    #[test]
    fn display_includes_reason_and_message() {
        let mut status = BackendStatus::new(StatusCondition::Failed, "quota exceeded");
        status.reason = Some("QuotaExceeded".into());
        assert_eq!(
            status.to_string(),
            "condition=FAILED reason=QuotaExceeded message=\"quota exceeded\""
        );
    }
}
