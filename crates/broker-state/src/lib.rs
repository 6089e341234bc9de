//! # broker-state — Last-Operation State Machine
//!
//! Answers the broker protocol's "last operation" poll for every lifecycle
//! verb by asking the resource backend about the credential record and
//! mapping what it says to `in progress`, `succeeded`, or `failed`.
//!
//! ## Layers
//!
//! - [`classifier`]: pure mapping from operation and backend status to an
//!   outcome.
//! - [`poller`]: one backend lookup plus classification.
//! - [`coordinator`]: per-verb entry points, regression check, error context.
//! - [`driver`]: the caller-side loop that polls until terminal and runs
//!   orphan mitigation.
//! - [`execution`]: cancellation and deadline scope for every call.
//!
//! Nothing here keeps state between polls. The backend is the only source
//! of truth, so any number of polls may run concurrently.

pub mod classifier;
pub mod coordinator;
pub mod driver;
pub mod execution;
pub mod poller;

pub use classifier::{classify, classify_absent, ClassifyError};
pub use coordinator::{LastOperationError, LifecycleCoordinator};
pub use driver::{
    DriveReport, DriveResult, NoMitigation, OrphanMitigation, PollDriver, PollSchedule,
};
pub use execution::{CancelHandle, ExecutionContext, Interrupted};
pub use poller::{PollError, StatusPoller};
