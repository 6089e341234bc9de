#![deny(missing_docs)]

//! # broker-core — Foundational Types for the System Broker
//!
//! The vocabulary shared by every crate in the workspace: what is being
//! polled ([`OperationContext`]), what the backend says ([`BackendStatus`]),
//! what the platform is told ([`LifecycleOutcome`]), and how failures are
//! classified ([`ErrorKind`]). Also defines the [`ResourceBackend`] contract
//! the state machine consumes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `broker-*` crates.
//! - No broker-protocol library types; only instance id, binding id and
//!   operation type cross the boundary.
//! - No `unwrap()` outside tests.

pub mod backend;
pub mod context;
pub mod error;
pub mod identity;
pub mod operation;
pub mod outcome;
pub mod status;

pub use backend::{BackendError, ResourceBackend};
pub use context::{ContextError, Correlation, OperationContext, ResourceRef};
pub use error::ErrorKind;
pub use identity::{ApplicationId, BindingId, BundleId, IdentifierError, InstanceId};
pub use operation::{OperationType, ParseOperationError};
pub use outcome::{LifecycleOutcome, LifecycleState};
pub use status::{BackendStatus, StatusCondition};
