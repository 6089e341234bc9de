//! End-to-end last-operation flows against a scripted in-memory backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use broker_core::{
    BackendError, BackendStatus, BindingId, Correlation, ErrorKind, InstanceId, LifecycleOutcome,
    LifecycleState, OperationContext, OperationType, ResourceBackend, ResourceRef,
    StatusCondition,
};
use broker_state::classifier::{CREDENTIALS_DELETED, CREDENTIALS_DELETING, INSTANCE_DELETED};
use broker_state::{
    DriveResult, ExecutionContext, LifecycleCoordinator, OrphanMitigation, PollDriver,
    PollSchedule,
};

// ─── Test doubles ───────────────────────────────────────────────────────

type Answer = Result<BackendStatus, BackendError>;

/// Backend that plays back a script; the final answer repeats forever.
struct ScriptedBackend {
    script: Mutex<VecDeque<fn() -> Answer>>,
    seen: Mutex<Vec<(ResourceRef, Correlation)>>,
}

impl ScriptedBackend {
    fn new(script: &[fn() -> Answer]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            seen: Mutex::default(),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl ResourceBackend for ScriptedBackend {
    async fn get_credential_status(
        &self,
        resource: &ResourceRef,
        correlation: &Correlation,
    ) -> Result<BackendStatus, BackendError> {
        self.seen
            .lock()
            .unwrap()
            .push((resource.clone(), correlation.clone()));
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            *script.front().unwrap()
        };
        next()
    }
}

/// Backend that never answers.
struct HangingBackend;

#[async_trait]
impl ResourceBackend for HangingBackend {
    async fn get_credential_status(
        &self,
        _resource: &ResourceRef,
        _correlation: &Correlation,
    ) -> Result<BackendStatus, BackendError> {
        std::future::pending().await
    }
}

/// Mitigation double that records every call.
#[derive(Default)]
struct RecordingMitigation {
    calls: Mutex<Vec<(OperationType, LifecycleOutcome)>>,
}

#[async_trait]
impl OrphanMitigation for RecordingMitigation {
    async fn mitigate(&self, ctx: &OperationContext, outcome: &LifecycleOutcome) {
        self.calls
            .lock()
            .unwrap()
            .push((ctx.operation(), outcome.clone()));
    }
}

fn pending() -> Answer {
    Ok(BackendStatus::new(StatusCondition::Pending, "provisioning"))
}

fn succeeded() -> Answer {
    Ok(BackendStatus::new(StatusCondition::Succeeded, "credentials ready"))
}

fn failed() -> Answer {
    Ok(BackendStatus::new(StatusCondition::Failed, "quota exceeded"))
}

fn unused() -> Answer {
    Ok(BackendStatus::new(StatusCondition::Unused, ""))
}

fn not_found() -> Answer {
    Err(BackendError::NotFound {
        record_id: "b1".into(),
    })
}

fn unavailable() -> Answer {
    Err(BackendError::Timeout { elapsed_ms: 30_000 })
}

fn i1() -> InstanceId {
    InstanceId::new("i1").unwrap()
}

fn b1() -> BindingId {
    BindingId::new("b1").unwrap()
}

fn b1_ref() -> ResourceRef {
    ResourceRef::new("b1").unwrap()
}

fn fast_schedule(max_attempts: u32) -> PollSchedule {
    PollSchedule {
        interval: Duration::from_millis(1),
        max_attempts,
    }
}

// ─── Coordinator scenarios ──────────────────────────────────────────────

#[tokio::test]
async fn bind_pending_reports_in_progress() {
    let backend = ScriptedBackend::new(&[pending]);
    let coordinator = LifecycleCoordinator::new(backend.clone());

    let outcome = coordinator
        .bind(&ExecutionContext::background(), &i1(), &b1(), b1_ref())
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::in_progress("provisioning"));
    let seen = backend.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.record_id(), "b1");
    assert_eq!(seen[0].1.instance_id, i1());
    assert_eq!(seen[0].1.binding_id, Some(b1()));
}

#[tokio::test]
async fn unbind_not_found_reports_deleted() {
    let coordinator = LifecycleCoordinator::new(ScriptedBackend::new(&[not_found]));

    let outcome = coordinator
        .unbind(&ExecutionContext::background(), &i1(), &b1(), b1_ref())
        .await
        .unwrap();

    assert_eq!(outcome.state, LifecycleState::Succeeded);
    assert_eq!(outcome.description, CREDENTIALS_DELETED);
}

#[tokio::test]
async fn unbind_with_failed_record_stays_in_progress() {
    let coordinator = LifecycleCoordinator::new(ScriptedBackend::new(&[failed]));

    let outcome = coordinator
        .unbind(&ExecutionContext::background(), &i1(), &b1(), b1_ref())
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::in_progress(CREDENTIALS_DELETING));
}

#[tokio::test]
async fn deprovision_not_found_reports_deleted() {
    let coordinator = LifecycleCoordinator::new(ScriptedBackend::new(&[not_found]));

    let outcome = coordinator
        .deprovision(
            &ExecutionContext::background(),
            &i1(),
            ResourceRef::new("i1").unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::succeeded(INSTANCE_DELETED));
}

#[tokio::test]
async fn provision_not_found_is_an_error_with_context() {
    let coordinator = LifecycleCoordinator::new(ScriptedBackend::new(&[not_found]));

    let err = coordinator
        .provision(
            &ExecutionContext::background(),
            &i1(),
            ResourceRef::new("i1").unwrap(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.verb, Some(OperationType::Provision));
    assert_eq!(err.instance_id, i1());
    assert!(err.binding_id.is_none());
}

#[tokio::test]
async fn bind_failed_is_an_outcome_not_an_error() {
    let coordinator = LifecycleCoordinator::new(ScriptedBackend::new(&[failed]));

    let outcome = coordinator
        .bind(&ExecutionContext::background(), &i1(), &b1(), b1_ref())
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::failed("quota exceeded"));
    assert!(outcome.requires_orphan_mitigation(OperationType::Bind));
}

#[tokio::test]
async fn update_unused_keeps_polling() {
    let coordinator = LifecycleCoordinator::new(ScriptedBackend::new(&[unused]));

    let err = coordinator
        .update(
            &ExecutionContext::background(),
            &i1(),
            ResourceRef::new("i1").unwrap(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnexpectedBackendState);
    assert!(err.kind().keep_polling());
}

#[tokio::test]
async fn repeated_polls_are_identical() {
    let backend = ScriptedBackend::new(&[succeeded]);
    let coordinator = LifecycleCoordinator::new(backend.clone());
    let exec = ExecutionContext::background();

    let first = coordinator.bind(&exec, &i1(), &b1(), b1_ref()).await.unwrap();
    let second = coordinator.bind(&exec, &i1(), &b1(), b1_ref()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn concurrent_polls_need_no_coordination() {
    let coordinator = Arc::new(LifecycleCoordinator::new(ScriptedBackend::new(&[pending])));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .bind(&ExecutionContext::background(), &i1(), &b1(), b1_ref())
                    .await
                    .unwrap()
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), LifecycleOutcome::in_progress("provisioning"));
    }
}

#[tokio::test]
async fn cancel_aborts_hanging_lookup() {
    let coordinator = LifecycleCoordinator::new(HangingBackend);
    let (exec, handle) = ExecutionContext::cancellable();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });
    let err = coordinator
        .bind(&exec, &i1(), &b1(), b1_ref())
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn deadline_aborts_hanging_lookup() {
    let coordinator = LifecycleCoordinator::new(HangingBackend);
    let exec = ExecutionContext::background().with_timeout(Duration::from_secs(5));

    let err = coordinator
        .bind(&exec, &i1(), &b1(), b1_ref())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

// ─── Driver ─────────────────────────────────────────────────────────────

fn bind_ctx() -> OperationContext {
    OperationContext::new(i1(), Some(b1()), OperationType::Bind, b1_ref()).unwrap()
}

#[tokio::test]
async fn driver_runs_mitigation_for_failed_bind() {
    let mitigation = Arc::new(RecordingMitigation::default());
    let driver = PollDriver::new(
        LifecycleCoordinator::new(ScriptedBackend::new(&[pending, failed])),
        mitigation.clone(),
        fast_schedule(5),
    );

    let report = driver
        .drive(&ExecutionContext::background(), bind_ctx())
        .await;

    assert_eq!(report.attempts, 2);
    match report.result {
        DriveResult::Terminal { outcome, mitigated } => {
            assert_eq!(outcome, LifecycleOutcome::failed("quota exceeded"));
            assert!(mitigated);
        }
        other => panic!("expected terminal, got {other:?}"),
    }
    let calls = mitigation.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![(OperationType::Bind, LifecycleOutcome::failed("quota exceeded"))]
    );
}

#[tokio::test]
async fn driver_skips_mitigation_for_successful_bind() {
    let mitigation = Arc::new(RecordingMitigation::default());
    let driver = PollDriver::new(
        LifecycleCoordinator::new(ScriptedBackend::new(&[unused, unavailable, succeeded])),
        mitigation.clone(),
        fast_schedule(5),
    );

    let report = driver
        .drive(&ExecutionContext::background(), bind_ctx())
        .await;

    assert_eq!(report.attempts, 3);
    assert!(matches!(
        report.result,
        DriveResult::Terminal {
            mitigated: false,
            ..
        }
    ));
    assert!(mitigation.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn driver_stops_on_not_found() {
    let driver = PollDriver::new(
        LifecycleCoordinator::new(ScriptedBackend::new(&[pending, not_found])),
        Arc::new(RecordingMitigation::default()),
        fast_schedule(5),
    );

    let report = driver
        .drive(&ExecutionContext::background(), bind_ctx())
        .await;

    assert_eq!(report.attempts, 2);
    match report.result {
        DriveResult::Stopped(err) => assert_eq!(err.kind(), ErrorKind::NotFound),
        other => panic!("expected stop, got {other:?}"),
    }
}

#[tokio::test]
async fn driver_gives_up_after_max_attempts() {
    let backend = ScriptedBackend::new(&[pending]);
    let driver = PollDriver::new(
        LifecycleCoordinator::new(backend.clone()),
        Arc::new(RecordingMitigation::default()),
        fast_schedule(3),
    );

    let report = driver
        .drive(&ExecutionContext::background(), bind_ctx())
        .await;

    assert_eq!(report.attempts, 3);
    assert_eq!(backend.calls(), 3);
    match report.result {
        DriveResult::Exhausted { last } => {
            assert_eq!(last, Some(LifecycleOutcome::in_progress("provisioning")));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn driver_stops_when_cancelled_between_polls() {
    let backend = ScriptedBackend::new(&[pending]);
    let driver = PollDriver::new(
        LifecycleCoordinator::new(backend.clone()),
        Arc::new(RecordingMitigation::default()),
        PollSchedule {
            interval: Duration::from_secs(3600),
            max_attempts: 10,
        },
    );
    let (exec, handle) = ExecutionContext::cancellable();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });
    let report = driver.drive(&exec, bind_ctx()).await;
    canceller.await.unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(backend.calls(), 1);
    match report.result {
        DriveResult::Stopped(err) => assert_eq!(err.kind(), ErrorKind::Cancelled),
        other => panic!("expected stop, got {other:?}"),
    }
}
