//! # Lifecycle Coordinator
//!
//! The broker-facing entry point: one method per broker verb, each building
//! an [`OperationContext`] and delegating to the [`StatusPoller`].
//!
//! The coordinator keeps no state of its own. It adds two things on top of
//! the poller: the terminal-state regression check against the caller's
//! `last_observed`, and wrapping every failure with the verb, instance and
//! binding it concerned.
//!
//! A failed bind is returned as an outcome like any other. Orphan
//! mitigation is the platform's job; the coordinator never deletes anything.

use broker_core::{
    BindingId, ErrorKind, InstanceId, LifecycleOutcome, OperationContext, OperationType,
    ResourceBackend, ResourceRef,
};

use thiserror::Error;

use crate::execution::ExecutionContext;
use crate::poller::{PollError, StatusPoller};

/// A last-operation failure, with the request it belonged to.
#[derive(Error, Debug)]
#[error("{} (instance {instance_id}{}): {source}", verb_label(.verb), binding_label(.binding_id))]
pub struct LastOperationError {
    /// The verb, when the request named a valid one.
    pub verb: Option<OperationType>,
    /// Instance the poll concerned.
    pub instance_id: InstanceId,
    /// Binding the poll concerned, if any.
    pub binding_id: Option<BindingId>,
    /// The underlying failure.
    #[source]
    pub source: PollError,
}

fn verb_label(verb: &Option<OperationType>) -> String {
    match verb {
        Some(verb) => format!("{verb} last operation failed"),
        None => "last operation failed".to_string(),
    }
}

fn binding_label(binding_id: &Option<BindingId>) -> String {
    match binding_id {
        Some(binding) => format!(", binding {binding}"),
        None => String::new(),
    }
}

impl LastOperationError {
    pub(crate) fn new(
        verb: Option<OperationType>,
        instance_id: &InstanceId,
        binding_id: Option<&BindingId>,
        source: PollError,
    ) -> Self {
        Self {
            verb,
            instance_id: instance_id.clone(),
            binding_id: binding_id.cloned(),
            source,
        }
    }

    /// Kind of the underlying failure.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Answers last-operation polls for every broker verb.
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator<B> {
    poller: StatusPoller<B>,
}

impl<B: ResourceBackend> LifecycleCoordinator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            poller: StatusPoller::new(backend),
        }
    }

    pub fn poller(&self) -> &StatusPoller<B> {
        &self.poller
    }

    /// Poll the last operation of `verb`.
    pub async fn execute(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        binding_id: Option<&BindingId>,
        verb: OperationType,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        let ctx = OperationContext::new(instance_id.clone(), binding_id.cloned(), verb, resource)
            .map_err(|err| {
                LastOperationError::new(Some(verb), instance_id, binding_id, err.into())
            })?;
        self.execute_context(exec, &ctx).await
    }

    /// Poll a prepared context, enforcing that a terminal state previously
    /// reported for it is not contradicted.
    pub async fn execute_context(
        &self,
        exec: &ExecutionContext,
        ctx: &OperationContext,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        let wrap = |source: PollError| {
            LastOperationError::new(
                Some(ctx.operation()),
                ctx.instance_id(),
                ctx.binding_id(),
                source,
            )
        };

        let outcome = self.poller.poll(exec, ctx).await.map_err(wrap)?;

        if let Some(previous) = ctx.last_observed() {
            if previous.is_terminal() && previous != outcome.state {
                tracing::warn!(
                    verb = %ctx.operation(),
                    instance_id = %ctx.instance_id(),
                    %previous,
                    observed = %outcome.state,
                    "Backend contradicted a terminal state"
                );
                return Err(wrap(PollError::Regressed {
                    operation: ctx.operation(),
                    previous,
                    observed: outcome.state,
                }));
            }
        }

        Ok(outcome)
    }

    /// Poll using the platform's opaque operation token.
    pub async fn execute_token(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        binding_id: Option<&BindingId>,
        token: &str,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        let verb: OperationType = token
            .parse()
            .map_err(|err: broker_core::ParseOperationError| {
                LastOperationError::new(None, instance_id, binding_id, err.into())
            })?;
        self.execute(exec, instance_id, binding_id, verb, resource).await
    }

    // ─── Per-verb entry points ──────────────────────────────────────────

    pub async fn provision(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        self.execute(exec, instance_id, None, OperationType::Provision, resource)
            .await
    }

    pub async fn update(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        self.execute(exec, instance_id, None, OperationType::Update, resource)
            .await
    }

    pub async fn deprovision(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        self.execute(exec, instance_id, None, OperationType::Deprovision, resource)
            .await
    }

    /// A `Failed` outcome here obliges the platform to orphan-mitigate.
    pub async fn bind(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        self.execute(
            exec,
            instance_id,
            Some(binding_id),
            OperationType::Bind,
            resource,
        )
        .await
    }

    pub async fn unbind(
        &self,
        exec: &ExecutionContext,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        resource: ResourceRef,
    ) -> Result<LifecycleOutcome, LastOperationError> {
        self.execute(
            exec,
            instance_id,
            Some(binding_id),
            OperationType::Unbind,
            resource,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use broker_core::{
        BackendError, BackendStatus, Correlation, LifecycleState, StatusCondition,
    };

    struct Succeeded;

    #[async_trait]
    impl ResourceBackend for Succeeded {
        async fn get_credential_status(
            &self,
            _resource: &ResourceRef,
            _correlation: &Correlation,
        ) -> Result<BackendStatus, BackendError> {
            Ok(BackendStatus::new(StatusCondition::Succeeded, "ready"))
        }
    }

    struct Pending;

    #[async_trait]
    impl ResourceBackend for Pending {
        async fn get_credential_status(
            &self,
            _resource: &ResourceRef,
            _correlation: &Correlation,
        ) -> Result<BackendStatus, BackendError> {
            Ok(BackendStatus::new(StatusCondition::Pending, "working"))
        }
    }

    fn ids() -> (InstanceId, BindingId) {
        (InstanceId::new("i1").unwrap(), BindingId::new("b1").unwrap())
    }

    #[tokio::test]
    async fn bind_without_binding_id_is_invalid_request() {
        let coordinator = LifecycleCoordinator::new(Succeeded);
        let (instance, _) = ids();
        let err = coordinator
            .execute(
                &ExecutionContext::background(),
                &instance,
                None,
                OperationType::Bind,
                ResourceRef::new("b1").unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.verb, Some(OperationType::Bind));
    }

    #[tokio::test]
    async fn unknown_token_is_invalid_request() {
        let coordinator = LifecycleCoordinator::new(Succeeded);
        let (instance, binding) = ids();
        let err = coordinator
            .execute_token(
                &ExecutionContext::background(),
                &instance,
                Some(&binding),
                "rebind_operation",
                ResourceRef::new("b1").unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.verb, None);
    }

    #[tokio::test]
    async fn token_form_reaches_backend() {
        let coordinator = LifecycleCoordinator::new(Arc::new(Succeeded));
        let (instance, binding) = ids();
        let outcome = coordinator
            .execute_token(
                &ExecutionContext::background(),
                &instance,
                Some(&binding),
                "bind_operation",
                ResourceRef::new("b1").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, LifecycleOutcome::succeeded("ready"));
    }

    #[tokio::test]
    async fn terminal_state_may_not_regress() {
        let coordinator = LifecycleCoordinator::new(Pending);
        let (instance, binding) = ids();
        let ctx = OperationContext::new(
            instance,
            Some(binding),
            OperationType::Bind,
            ResourceRef::new("b1").unwrap(),
        )
        .unwrap()
        .with_last_observed(LifecycleState::Succeeded);

        let err = coordinator
            .execute_context(&ExecutionContext::background(), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedBackendState);
        assert!(matches!(err.source, PollError::Regressed { .. }));
    }

    #[tokio::test]
    async fn in_progress_may_advance() {
        let coordinator = LifecycleCoordinator::new(Succeeded);
        let (instance, binding) = ids();
        let ctx = OperationContext::new(
            instance,
            Some(binding),
            OperationType::Bind,
            ResourceRef::new("b1").unwrap(),
        )
        .unwrap()
        .with_last_observed(LifecycleState::InProgress);

        let outcome = coordinator
            .execute_context(&ExecutionContext::background(), &ctx)
            .await
            .unwrap();
        assert_eq!(outcome.state, LifecycleState::Succeeded);
    }

    #[test]
    fn error_display_carries_request() {
        let (instance, binding) = ids();
        let err = LastOperationError::new(
            Some(OperationType::Bind),
            &instance,
            Some(&binding),
            PollError::NotFound {
                operation: OperationType::Bind,
                record_id: "b1".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "bind last operation failed (instance i1, binding b1): no backend record b1 for bind"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_display_without_verb_or_binding() {
        let err = LastOperationError::new(
            None,
            &InstanceId::new("i1").unwrap(),
            None,
            PollError::UnknownOperation(broker_core::ParseOperationError {
                token: "rebind".into(),
            }),
        );
        assert_eq!(
            err.to_string(),
            "last operation failed (instance i1): unknown operation token: \"rebind\""
        );
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
