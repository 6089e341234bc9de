//! # Operation Context
//!
//! The immutable value describing one last-operation poll: which instance
//! and binding, which operation, and where the backend keeps the record.
//! Created per poll and never persisted by the broker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{ApplicationId, BindingId, BundleId, IdentifierError, InstanceId};
use crate::operation::OperationType;
use crate::outcome::LifecycleState;

/// Rejected operation context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A binding verb was polled without a binding id.
    #[error("{operation} requires a binding id")]
    MissingBinding {
        /// The binding verb.
        operation: OperationType,
    },

    /// An identifier was invalid.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Locator for a credential record on the resource backend.
///
/// `record_id` is the backend's id for the record. Application and bundle
/// ids narrow the lookup when the platform supplied them; the broker
/// protocol allows them to be absent on polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawResourceRef")]
pub struct ResourceRef {
    record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application_id: Option<ApplicationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bundle_id: Option<BundleId>,
}

impl ResourceRef {
    /// Reference a record by id.
    pub fn new(record_id: impl Into<String>) -> Result<Self, IdentifierError> {
        let record_id = record_id.into();
        if record_id.trim().is_empty() {
            return Err(IdentifierError::Blank { kind: "record id" });
        }
        Ok(Self {
            record_id,
            application_id: None,
            bundle_id: None,
        })
    }

    /// Default locator for an operation: binding verbs address the
    /// credential by binding id, instance verbs by instance id.
    pub fn for_operation(
        operation: OperationType,
        instance_id: &InstanceId,
        binding_id: Option<&BindingId>,
    ) -> Result<Self, ContextError> {
        if operation.is_binding() {
            let binding = binding_id.ok_or(ContextError::MissingBinding { operation })?;
            Ok(Self::new(binding.as_str())?)
        } else {
            Ok(Self::new(instance_id.as_str())?)
        }
    }

    /// Narrow the lookup to an application.
    pub fn with_application(mut self, application_id: ApplicationId) -> Self {
        self.application_id = Some(application_id);
        self
    }

    /// Narrow the lookup to a bundle.
    pub fn with_bundle(mut self, bundle_id: BundleId) -> Self {
        self.bundle_id = Some(bundle_id);
        self
    }

    /// Backend id of the credential record.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Application scope of the lookup, if any.
    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    /// Bundle scope of the lookup, if any.
    pub fn bundle_id(&self) -> Option<&BundleId> {
        self.bundle_id.as_ref()
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record:{}", self.record_id)?;
        if let Some(app) = &self.application_id {
            write!(f, " app:{app}")?;
        }
        if let Some(bundle) = &self.bundle_id {
            write!(f, " bundle:{bundle}")?;
        }
        Ok(())
    }
}

/// Correlation data passed through to the backend with every lookup.
/// Not used for routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Correlation {
    /// Instance the poll concerns.
    pub instance_id: InstanceId,
    /// Binding the poll concerns, for binding verbs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_id: Option<BindingId>,
}

/// Everything one poll needs.
///
/// Deserialization applies the same checks as [`OperationContext::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawOperationContext")]
pub struct OperationContext {
    instance_id: InstanceId,
    binding_id: Option<BindingId>,
    operation: OperationType,
    resource: ResourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_observed: Option<LifecycleState>,
}

impl OperationContext {
    /// Build a context. Binding verbs must carry a binding id.
    pub fn new(
        instance_id: InstanceId,
        binding_id: Option<BindingId>,
        operation: OperationType,
        resource: ResourceRef,
    ) -> Result<Self, ContextError> {
        if operation.is_binding() && binding_id.is_none() {
            return Err(ContextError::MissingBinding { operation });
        }
        Ok(Self {
            instance_id,
            binding_id,
            operation,
            resource,
            last_observed: None,
        })
    }

    /// Record the state the platform was last told for this operation.
    pub fn with_last_observed(mut self, state: LifecycleState) -> Self {
        self.last_observed = Some(state);
        self
    }

    /// Instance being polled.
    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// Binding being polled; always present for binding verbs.
    pub fn binding_id(&self) -> Option<&BindingId> {
        self.binding_id.as_ref()
    }

    /// Operation being polled.
    pub fn operation(&self) -> OperationType {
        self.operation
    }

    /// Where the backend keeps the record.
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// State last reported to the platform, if the caller supplied it.
    pub fn last_observed(&self) -> Option<LifecycleState> {
        self.last_observed
    }

    /// Correlation data for the backend lookup.
    pub fn correlation(&self) -> Correlation {
        Correlation {
            instance_id: self.instance_id.clone(),
            binding_id: self.binding_id.clone(),
        }
    }
}

// ─── Wire forms ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawResourceRef {
    record_id: String,
    #[serde(default)]
    application_id: Option<ApplicationId>,
    #[serde(default)]
    bundle_id: Option<BundleId>,
}

impl TryFrom<RawResourceRef> for ResourceRef {
    type Error = IdentifierError;

    fn try_from(raw: RawResourceRef) -> Result<Self, Self::Error> {
        let mut resource = Self::new(raw.record_id)?;
        resource.application_id = raw.application_id;
        resource.bundle_id = raw.bundle_id;
        Ok(resource)
    }
}

#[derive(Deserialize)]
struct RawOperationContext {
    instance_id: InstanceId,
    #[serde(default)]
    binding_id: Option<BindingId>,
    operation: OperationType,
    resource: ResourceRef,
    #[serde(default)]
    last_observed: Option<LifecycleState>,
}

impl TryFrom<RawOperationContext> for OperationContext {
    type Error = ContextError;

    fn try_from(raw: RawOperationContext) -> Result<Self, Self::Error> {
        let ctx = Self::new(raw.instance_id, raw.binding_id, raw.operation, raw.resource)?;
        Ok(match raw.last_observed {
            Some(state) => ctx.with_last_observed(state),
            None => ctx,
        })
    }
}
