//! # Broker Identifier Newtypes
//!
//! Newtype wrappers for the identifiers the broker protocol hands us.
//! Platforms choose these values, so they are opaque strings; the only
//! rule enforced here is that they are not blank. You cannot pass a
//! `BindingId` where an `InstanceId` is expected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The identifier was empty or whitespace only.
    #[error("{kind} must not be blank")]
    Blank {
        /// Which identifier was rejected.
        kind: &'static str,
    },
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create the identifier, rejecting blank values.
            pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(IdentifierError::Blank { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Access the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Service instance identifier assigned by the platform.
    InstanceId,
    "instance id"
);

string_id!(
    /// Service binding identifier assigned by the platform. Doubles as the
    /// credential record id on the backend for binding verbs.
    BindingId,
    "binding id"
);

string_id!(
    /// Backend application identifier (the broker protocol's service id).
    ApplicationId,
    "application id"
);

string_id!(
    /// Backend bundle identifier (the broker protocol's plan id).
    BundleId,
    "bundle id"
);
