//! `sbroker watch`: poll until the operation finishes.
//!
//! Exit codes: 0 succeeded, 3 failed, 4 attempts exhausted, 1 stopped by a
//! non-retryable error or cancellation.

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use broker_core::{LifecycleOutcome, LifecycleState, ResourceBackend};
use broker_state::{
    DriveResult, ExecutionContext, LifecycleCoordinator, NoMitigation, PollDriver, PollSchedule,
};
use clap::Args;
use serde::Serialize;

use crate::request::{ErrorReport, OperationArgs};

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub operation: OperationArgs,

    /// Seconds between polls.
    #[arg(long, default_value_t = 2, value_name = "SECS")]
    pub interval_secs: u64,

    /// Maximum number of polls.
    #[arg(long, default_value_t = 30)]
    pub max_attempts: u32,
}

impl WatchArgs {
    pub fn schedule(&self) -> Result<PollSchedule> {
        if self.max_attempts == 0 {
            bail!("--max-attempts must be at least 1");
        }
        Ok(PollSchedule {
            interval: Duration::from_secs(self.interval_secs),
            max_attempts: self.max_attempts,
        })
    }
}

#[derive(Debug, Serialize)]
struct WatchReport {
    attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<LifecycleOutcome>,
    exhausted: bool,
    orphan_mitigation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

/// Poll until terminal and print the final report as JSON.
///
/// `exec` carries the caller's cancellation (Ctrl-C in the binary).
pub async fn run_watch<B: ResourceBackend>(
    args: &WatchArgs,
    coordinator: LifecycleCoordinator<B>,
    exec: &ExecutionContext,
    out: &mut impl Write,
) -> Result<u8> {
    let ctx = args.operation.to_context()?;
    let driver = PollDriver::new(coordinator, NoMitigation, args.schedule()?);

    let drive = driver.drive(exec, ctx).await;
    let (report, code) = match drive.result {
        DriveResult::Terminal { outcome, mitigated } => {
            let code = match outcome.state {
                LifecycleState::Failed => 3,
                _ => 0,
            };
            let report = WatchReport {
                attempts: drive.attempts,
                outcome: Some(outcome),
                exhausted: false,
                orphan_mitigation: mitigated,
                error: None,
            };
            (report, code)
        }
        DriveResult::Exhausted { last } => {
            tracing::warn!(attempts = drive.attempts, "Operation did not finish");
            let report = WatchReport {
                attempts: drive.attempts,
                outcome: last,
                exhausted: true,
                orphan_mitigation: false,
                error: None,
            };
            (report, 4)
        }
        DriveResult::Stopped(err) => {
            tracing::error!("{err}");
            let report = WatchReport {
                attempts: drive.attempts,
                outcome: None,
                exhausted: false,
                orphan_mitigation: false,
                error: Some(ErrorReport::from(&err)),
            };
            (report, 1)
        }
    };

    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(code)
}
