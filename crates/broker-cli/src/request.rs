//! Arguments shared by every subcommand that names an operation, and the
//! JSON shapes the CLI prints.

use anyhow::{Context, Result};
use broker_core::{
    ApplicationId, BindingId, BundleId, ErrorKind, InstanceId, LifecycleOutcome, LifecycleState,
    OperationContext, OperationType, ResourceRef,
};
use broker_state::LastOperationError;
use clap::{Args, ValueEnum};
use serde::Serialize;

/// Identifies the operation being polled.
#[derive(Args, Debug, Clone)]
pub struct OperationArgs {
    /// Service instance id.
    #[arg(long)]
    pub instance_id: String,

    /// Service binding id (required for bind and unbind).
    #[arg(long)]
    pub binding_id: Option<String>,

    /// Operation token as returned to the platform (`bind`, `bind_operation`, ...).
    #[arg(long, value_name = "TOKEN")]
    pub operation: String,

    /// Backend record id. Defaults to the binding id for binding verbs and
    /// the instance id otherwise.
    #[arg(long)]
    pub record_id: Option<String>,

    /// Narrow the lookup to an application.
    #[arg(long)]
    pub application_id: Option<String>,

    /// Narrow the lookup to a bundle.
    #[arg(long)]
    pub bundle_id: Option<String>,
}

impl OperationArgs {
    /// Build the operation context these arguments describe.
    pub fn to_context(&self) -> Result<OperationContext> {
        let operation: OperationType = self.operation.parse()?;
        let instance_id = InstanceId::new(self.instance_id.as_str())?;
        let binding_id = self
            .binding_id
            .as_deref()
            .map(BindingId::new)
            .transpose()?;

        let mut resource = match &self.record_id {
            Some(record) => ResourceRef::new(record.as_str())?,
            None => ResourceRef::for_operation(operation, &instance_id, binding_id.as_ref())?,
        };
        if let Some(app) = &self.application_id {
            resource = resource.with_application(ApplicationId::new(app.as_str())?);
        }
        if let Some(bundle) = &self.bundle_id {
            resource = resource.with_bundle(BundleId::new(bundle.as_str())?);
        }

        OperationContext::new(instance_id, binding_id, operation, resource)
            .with_context(|| format!("invalid {operation} request"))
    }
}

/// Lifecycle state as given on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateArg {
    InProgress,
    Succeeded,
    Failed,
}

impl From<StateArg> for LifecycleState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::InProgress => LifecycleState::InProgress,
            StateArg::Succeeded => LifecycleState::Succeeded,
            StateArg::Failed => LifecycleState::Failed,
        }
    }
}

/// A failure as printed on stdout.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub keep_polling: bool,
    pub message: String,
}

impl From<&LastOperationError> for ErrorReport {
    fn from(err: &LastOperationError) -> Self {
        Self {
            kind: err.kind(),
            keep_polling: err.kind().keep_polling(),
            message: err.to_string(),
        }
    }
}

/// Result of a one-shot poll as printed on stdout.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PollReport {
    Outcome(LifecycleOutcome),
    Error { error: ErrorReport },
}
