//! # sbroker CLI entry point
//!
//! Parses command-line arguments, installs logging, builds the backend
//! client and dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use broker_cli::load_backend;
use broker_cli::poll::{run_poll, PollArgs};
use broker_cli::watch::{run_watch, WatchArgs};
use broker_state::{ExecutionContext, LifecycleCoordinator};

/// System broker last-operation tool.
///
/// Asks the resource backend about an asynchronous broker operation and
/// reports what the platform would be told.
#[derive(Parser, Debug)]
#[command(name = "sbroker", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Backend configuration file (YAML). Falls back to BROKER_BACKEND_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the last operation once.
    Poll(PollArgs),

    /// Poll until the operation succeeds or fails.
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!("sbroker CLI starting");

    let backend = match load_backend(cli.config.as_deref()) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };
    let coordinator = LifecycleCoordinator::new(backend);
    let mut stdout = std::io::stdout().lock();

    let result = match cli.command {
        Commands::Poll(args) => run_poll(&args, &coordinator, &mut stdout).await,
        Commands::Watch(args) => {
            let (exec, cancel) = ExecutionContext::cancellable();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, stopping");
                    cancel.cancel();
                }
            });
            run_watch(&args, coordinator, &exec, &mut stdout).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
