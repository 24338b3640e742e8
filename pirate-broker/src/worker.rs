//! One instance per forked child process: a single `RequestSocket` serving requests one at a
//! time for as long as the process lives.
//!
//! Everything here runs strictly after `fork()`, in the child branch — the context and both
//! sockets are created fresh, never inherited from the parent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{SigHandler, Signal, signal};
use tracing::{info, trace, warn};
use zmq_transport::prelude::*;

use crate::{READY_SENTINEL, app::AppCallback, error::BrokerResult};

/// How often an idle worker wakes from its backend recv to check the HUP flag. Bounds how
/// long a SIGHUP takes to retire a worker that has no request in flight.
const HUP_POLL_INTERVAL_MS: i32 = 500;

/// Everything a worker needs to bring itself up, computed by the supervisor before `fork()`
/// and handed across unchanged. The parent's sockets and context must never be touched from
/// the child side of the fork, so this carries plain values only.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub backend_port: u16,
    pub identity: Vec<u8>,
    pub max_requests: u64,
    pub status_endpoint: String,
}

/// Runs one worker's full lifetime: handshake, serve loop, shutdown.
///
/// Returns once `max_requests` requests have been served (when bounded), SIGHUP has been
/// observed and the worker is between requests, or the socket recv fails outright. Either way
/// the caller exits the process; the supervisor replaces the worker.
pub fn run(config: WorkerConfig, app: AppCallback) -> BrokerResult<()> {
    proctitle::set_title(format!("zmq worker {}", config.backend_port));

    // `fork()` duplicates the parent's signal disposition table; undo the broker's handlers
    // before installing our own, so a worker never silently swallows a signal meant for it.
    let hup = reset_inherited_handlers()?;

    let identity = String::from_utf8_lossy(&config.identity).into_owned();

    // A fresh context per worker process: contexts are not fork-safe, never shared.
    let context = Context::new()?;

    let socket = RequestSocket::from_context(&context)?;
    socket.set_routing_id(&identity)?;
    socket.set_linger(0)?;
    socket.set_receive_timeout(HUP_POLL_INTERVAL_MS)?;
    socket.connect(format!("tcp://localhost:{}", config.backend_port))?;
    socket.send_msg(vec![READY_SENTINEL], SendFlags::empty())?;

    let status = RequestSocket::from_context(&context)?;
    status.set_routing_id(&identity)?;
    status.set_linger(0)?;
    status.connect(&config.status_endpoint)?;
    report_status(&status, "waiting")?;

    info!(identity = %identity, backend_port = config.backend_port, "worker ready");

    let mut served = 0u64;
    loop {
        if hup.load(Ordering::Relaxed) {
            report_status(&status, "exiting")?;
            info!(identity = %identity, "SIGHUP received, exiting");
            return Ok(());
        }

        let mut request = match socket.recv_multipart(RecvFlags::empty()) {
            Ok(request) => request,
            Err(ZmqError::Again) => continue,
            Err(err) => return Err(err.into()),
        };
        if request.len() != 3 {
            warn!(frames = request.len(), "dropping malformed worker request");
            continue;
        }
        let client_id = request.pop_front().unwrap();
        let delimiter = request.pop_front().unwrap();
        let payload = request.pop_front().unwrap();
        if !delimiter.is_empty() {
            warn!("dropping worker request with non-empty delimiter frame");
            continue;
        }

        report_status(&status, "processing")?;
        trace!(bytes = payload.len(), "invoking application callback");

        let payload_bytes = payload.bytes();
        let result = catch_unwind(AssertUnwindSafe(|| app(&payload_bytes))).unwrap_or_else(|_| {
            warn!("application callback panicked; replying with an empty payload");
            Vec::new()
        });

        let reply = vec![client_id, Message::new(), Message::from(result)];
        socket.send_multipart(reply, SendFlags::empty())?;
        served += 1;

        if config.max_requests > 0 && served >= config.max_requests {
            report_status(&status, "exiting")?;
            info!(identity = %identity, served, "reached max_requests, exiting");
            return Ok(());
        }
        report_status(&status, "waiting")?;
    }
}

/// Restores default disposition for every signal the broker handles, then installs a
/// worker-local SIGHUP flag: workers retire on HUP after their current request rather than
/// dying mid-flight, which is distinct from the broker's own "restart all children" meaning
/// for the same signal.
fn reset_inherited_handlers() -> BrokerResult<Arc<AtomicBool>> {
    for sig in [
        Signal::SIGINT,
        Signal::SIGTERM,
        Signal::SIGQUIT,
        Signal::SIGCHLD,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGPIPE,
    ] {
        unsafe { signal(sig, SigHandler::SigDfl) }.map_err(|errno| {
            crate::error::BrokerError::Signal(std::io::Error::from_raw_os_error(errno as i32))
        })?;
    }

    let hup = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::signal::SIGHUP, Arc::clone(&hup))?;
    Ok(hup)
}

/// Sends one status frame and blocks for the supervisor's ack. The status socket is
/// REQ-backed, so sends and receives must strictly alternate; the ack itself carries no
/// information beyond "the report was recorded".
fn report_status(status: &RequestSocket, state: &str) -> BrokerResult<()> {
    status.send_msg(state, SendFlags::empty())?;
    status.recv_msg(RecvFlags::empty())?;
    Ok(())
}
