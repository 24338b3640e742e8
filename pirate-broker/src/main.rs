//! CLI entry point: parse, validate, bind, drop privileges, fork the pool, run.
//!
//! Exit codes: `0` clean shutdown, `1` configuration error, `2` any other runtime-fatal
//! condition (bind or fork failure, transport setup failure).

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use pirate_broker::{
    broker::Broker, cli::Cli, config::Config, error::BrokerError, logging, privilege,
    signals::SignalDispatcher,
};
use tracing::error;
use zmq_transport::prelude::Context;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = cli.log_level.clone();

    if let Err(err) = logging::init(&log_level) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::from(1);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "broker exited with an error");
            exit_code_for(&err)
        }
    }
}

/// `anyhow` attaches what-we-were-doing context at this boundary only; everywhere below this
/// function the crate's own [`BrokerError`] carries the real, typed cause.
fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(cli).context("validating configuration")?;

    proctitle::set_title(format!(
        "zmq broker {}-{}",
        config.frontend_port, config.backend_port
    ));

    let dispatcher = SignalDispatcher::install().context("installing signal handlers")?;

    let context = Context::new().context("creating zmq context")?;
    let broker = Broker::bind(&context, &config, dispatcher).context("binding broker sockets")?;

    // Bind first, then drop privileges, then fork: binding privileged ports needs root, but
    // the forked worker pool never should have it.
    privilege::drop_privileges(config.user.as_deref(), config.group.as_deref())
        .context("dropping privileges")?;

    broker.run().context("running broker event loop")
}

/// Configuration errors surface as `1`; everything else runtime-fatal (bind/fork/transport
/// setup failures, signal installation failures) surfaces as `2`. Nothing runtime-recoverable
/// reaches this function at all — those are logged and dropped where they occur.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<BrokerError>() {
        Some(BrokerError::Configuration(_)) => ExitCode::from(1),
        _ => ExitCode::from(2),
    }
}
