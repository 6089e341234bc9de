//! # Polling Driver
//!
//! The caller side of the last-operation protocol: poll until the operation
//! reaches a terminal state, then run orphan mitigation when the outcome
//! demands it. Broker platforms do this themselves; the driver exists so
//! the CLI `watch` command and tests can exercise the full loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broker_core::{LifecycleOutcome, OperationContext, ResourceBackend};

use crate::coordinator::{LastOperationError, LifecycleCoordinator};
use crate::execution::ExecutionContext;
use crate::poller::PollError;

/// Interval and attempt bound for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Pause between attempts.
    pub interval: Duration,
    /// Upper bound on attempts, including the first.
    pub max_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Cleanup the platform runs after a failed bind.
#[async_trait]
pub trait OrphanMitigation: Send + Sync {
    async fn mitigate(&self, ctx: &OperationContext, outcome: &LifecycleOutcome);
}

#[async_trait]
impl<T: OrphanMitigation + ?Sized> OrphanMitigation for Arc<T> {
    async fn mitigate(&self, ctx: &OperationContext, outcome: &LifecycleOutcome) {
        (**self).mitigate(ctx, outcome).await
    }
}

/// Mitigation that only records the need for cleanup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMitigation;

#[async_trait]
impl OrphanMitigation for NoMitigation {
    async fn mitigate(&self, ctx: &OperationContext, outcome: &LifecycleOutcome) {
        tracing::warn!(
            verb = %ctx.operation(),
            instance_id = %ctx.instance_id(),
            binding_id = ctx.binding_id().map(|b| b.as_str()).unwrap_or_default(),
            description = %outcome.description,
            "Orphan mitigation required, no mitigation configured"
        );
    }
}

/// How a polling loop ended.
#[derive(Debug)]
pub enum DriveResult {
    /// The operation reached a terminal state.
    Terminal {
        outcome: LifecycleOutcome,
        /// Whether orphan mitigation ran.
        mitigated: bool,
    },
    /// Attempts ran out before a terminal state.
    Exhausted {
        /// Last outcome observed, if any poll succeeded.
        last: Option<LifecycleOutcome>,
    },
    /// A poll failed with an error that must not be retried.
    Stopped(LastOperationError),
}

/// Result of a polling loop, with the number of polls issued.
#[derive(Debug)]
pub struct DriveReport {
    pub attempts: u32,
    pub result: DriveResult,
}

/// Repeats last-operation polls on a fixed schedule.
pub struct PollDriver<B, M> {
    coordinator: LifecycleCoordinator<B>,
    mitigation: M,
    schedule: PollSchedule,
}

impl<B: ResourceBackend, M: OrphanMitigation> PollDriver<B, M> {
    pub fn new(coordinator: LifecycleCoordinator<B>, mitigation: M, schedule: PollSchedule) -> Self {
        Self {
            coordinator,
            mitigation,
            schedule,
        }
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Poll `ctx` until terminal, a non-retryable error, or the attempt
    /// bound. The last observed state is threaded into each poll.
    pub async fn drive(&self, exec: &ExecutionContext, ctx: OperationContext) -> DriveReport {
        let mut ctx = ctx;
        let mut last: Option<LifecycleOutcome> = None;
        let mut attempts = 0;

        while attempts < self.schedule.max_attempts {
            if attempts > 0 {
                if let Err(reason) = exec.run(tokio::time::sleep(self.schedule.interval)).await {
                    tracing::info!(attempts, "Polling stopped: {reason}");
                    let err = LastOperationError::new(
                        Some(ctx.operation()),
                        ctx.instance_id(),
                        ctx.binding_id(),
                        PollError::Interrupted(reason),
                    );
                    return DriveReport {
                        attempts,
                        result: DriveResult::Stopped(err),
                    };
                }
            }
            attempts += 1;

            match self.coordinator.execute_context(exec, &ctx).await {
                Ok(outcome) if outcome.state.is_terminal() => {
                    let mitigated = outcome.requires_orphan_mitigation(ctx.operation());
                    if mitigated {
                        self.mitigation.mitigate(&ctx, &outcome).await;
                    }
                    tracing::info!(attempts, state = %outcome.state, "Operation finished");
                    return DriveReport {
                        attempts,
                        result: DriveResult::Terminal { outcome, mitigated },
                    };
                }
                Ok(outcome) => {
                    tracing::debug!(attempts, description = %outcome.description, "Operation in progress");
                    ctx = ctx.with_last_observed(outcome.state);
                    last = Some(outcome);
                }
                Err(err) if err.kind().keep_polling() => {
                    tracing::warn!(attempts, kind = %err.kind(), error = %err, "Poll failed, retrying");
                }
                Err(err) => {
                    return DriveReport {
                        attempts,
                        result: DriveResult::Stopped(err),
                    };
                }
            }
        }

        DriveReport {
            attempts,
            result: DriveResult::Exhausted { last },
        }
    }
}
