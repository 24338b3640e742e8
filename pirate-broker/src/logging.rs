//! Structured logging setup.
//!
//! Severity mapping follows the error handling design: dropped or malformed messages log at
//! `warn`, worker check-ins at `info`, message payload bodies at `trace`. An explicit
//! `RUST_LOG`/env-filter override always wins over `--log-level`.

use tracing_subscriber::EnvFilter;

use crate::error::{BrokerError, BrokerResult};

pub fn init(default_level: &str) -> BrokerResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| BrokerError::Configuration(format!("failed to initialize logging: {err}")))
}
