//! # broker-cli — `sbroker`
//!
//! Command-line access to the last-operation state machine, for operators
//! checking on a stuck operation and for scripted smoke tests.
//!
//! ## Subcommands
//!
//! - `sbroker poll` — one last-operation poll, printed as JSON.
//! - `sbroker watch` — poll until terminal, then report.
//!
//! ```bash
//! sbroker poll --instance-id i1 --binding-id b1 --operation bind_operation
//! sbroker watch --instance-id i1 --operation deprovision --interval-secs 5
//! ```

pub mod poll;
pub mod request;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use broker_backend_client::{BackendConfig, HttpResourceBackend};

/// Build the HTTP backend from `--config` or, without one, the environment.
pub fn load_backend(config: Option<&Path>) -> Result<HttpResourceBackend> {
    let config = match config {
        Some(path) => BackendConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BackendConfig::from_env().context("loading backend config from environment")?,
    };
    tracing::debug!(?config, "backend configuration");
    Ok(HttpResourceBackend::new(config)?)
}
