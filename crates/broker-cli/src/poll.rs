//! `sbroker poll`: a single last-operation poll.
//!
//! Exit codes: 0 when the backend yields an outcome, 2 when the error says
//! to keep polling, 1 for any other error.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use broker_core::ResourceBackend;
use broker_state::{ExecutionContext, LifecycleCoordinator};
use clap::Args;

use crate::request::{ErrorReport, OperationArgs, PollReport, StateArg};

#[derive(Args, Debug)]
pub struct PollArgs {
    #[command(flatten)]
    pub operation: OperationArgs,

    /// State last reported to the platform; a contradicting terminal state
    /// is reported as an unexpected backend state.
    #[arg(long, value_enum)]
    pub last_state: Option<StateArg>,

    /// Give up on the backend after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// Run one poll and print the result as JSON.
pub async fn run_poll<B: ResourceBackend>(
    args: &PollArgs,
    coordinator: &LifecycleCoordinator<B>,
    out: &mut impl Write,
) -> Result<u8> {
    let mut ctx = args.operation.to_context()?;
    if let Some(state) = args.last_state {
        ctx = ctx.with_last_observed(state.into());
    }

    let mut exec = ExecutionContext::background();
    if let Some(secs) = args.timeout_secs {
        exec = exec.with_timeout(Duration::from_secs(secs));
    }

    let (report, code) = match coordinator.execute_context(&exec, &ctx).await {
        Ok(outcome) => (PollReport::Outcome(outcome), 0),
        Err(err) => {
            tracing::error!("{err}");
            let code = if err.kind().keep_polling() { 2 } else { 1 };
            (
                PollReport::Error {
                    error: ErrorReport::from(&err),
                },
                code,
            )
        }
    };

    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(code)
}
