//! The event loop in the supervisor process: owns the frontend and backend `RouterSocket`s and
//! the idle-worker queue, and pairs each frontend request with the next idle worker.
//!
//! Single-threaded and cooperative: the only concurrency here is the one this loop body
//! imposes on itself iteration by iteration, never interleaved with anything else.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use nix::unistd::Pid;
use tracing::{debug, info, warn};
use zmq_transport::prelude::*;

use crate::{
    READY_SENTINEL, WorkerId,
    config::Config,
    error::BrokerResult,
    signals::SignalDispatcher,
    supervisor::Supervisor,
    worker_identity,
};

/// How long the loop sleeps when neither socket is readable and it isn't yet time for another
/// housekeeping pass. Keeps the loop from busy-spinning while staying responsive to signals.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Bounded grace period for graceful shutdown: if in-flight workers haven't all returned to
/// `waiting` by the time this elapses, the broker terminates them anyway rather than hanging
/// forever on a worker that will never finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct Broker {
    frontend: RouterSocket,
    backend: RouterSocket,
    idle_workers: VecDeque<WorkerId>,
    supervisor: Supervisor,
    dispatcher: SignalDispatcher,
    check_for_waiting: Duration,
    last_housekeeping: Instant,
    shutting_down: bool,
    shutdown_deadline: Option<Instant>,
}

impl Broker {
    /// Binds both ROUTER sockets and the supervisor's status socket. Must run before
    /// [`crate::privilege::drop_privileges`]: all three sockets need a privileged port only
    /// when the operator asked for one, and binding is the one operation that does.
    pub fn bind(context: &Context, config: &Config, dispatcher: SignalDispatcher) -> BrokerResult<Self> {
        let frontend = RouterSocket::from_context(context)?;
        frontend.set_linger(0)?;
        frontend
            .bind(format!("tcp://*:{}", config.frontend_port))
            .map_err(|source| crate::error::BrokerError::Bind {
                endpoint: format!("tcp://*:{}", config.frontend_port),
                source,
            })?;

        let backend = RouterSocket::from_context(context)?;
        backend.set_linger(0)?;
        backend
            .bind(format!("tcp://*:{}", config.backend_port))
            .map_err(|source| crate::error::BrokerError::Bind {
                endpoint: format!("tcp://*:{}", config.backend_port),
                source,
            })?;

        let supervisor = Supervisor::bind(context, config)?;

        Ok(Self {
            frontend,
            backend,
            idle_workers: VecDeque::new(),
            supervisor,
            dispatcher,
            check_for_waiting: Duration::from_secs(config.check_for_waiting_secs.max(1)),
            last_housekeeping: Instant::now(),
            shutting_down: false,
            shutdown_deadline: None,
        })
    }

    /// Resolved frontend address, including the OS-assigned port when bound to port `0`.
    pub fn frontend_endpoint(&self) -> BrokerResult<String> {
        Ok(self.frontend.last_endpoint()?)
    }

    /// Resolved backend address, including the OS-assigned port when bound to port `0`.
    pub fn backend_endpoint(&self) -> BrokerResult<String> {
        Ok(self.backend.last_endpoint()?)
    }

    /// Forks the initial pool, then runs the event loop until a graceful shutdown completes.
    pub fn run(mut self) -> BrokerResult<()> {
        self.supervisor.ensure_min_servers()?;
        info!("broker event loop starting");

        loop {
            self.handle_signals()?;
            self.supervisor.poll_status()?;

            if self.shutting_down {
                if self.shutdown_drained() {
                    info!("graceful shutdown complete");
                    self.supervisor.terminate_all()?;
                    return Ok(());
                }
                if self.backend.has_pollin()? {
                    self.service_backend()?;
                } else {
                    thread::sleep(IDLE_POLL_INTERVAL);
                }
                continue;
            }

            if !self.idle_workers.is_empty() && self.frontend.has_pollin()? {
                self.dispatch_frontend()?;
                continue;
            }

            if self.backend.has_pollin()? {
                self.service_backend()?;
                continue;
            }

            if self.last_housekeeping.elapsed() >= self.check_for_waiting {
                let reaped = self.supervisor.housekeeping()?;
                self.scrub_idle(&reaped);
                self.last_housekeeping = Instant::now();
            } else {
                thread::sleep(IDLE_POLL_INTERVAL);
            }
        }
    }

    fn handle_signals(&mut self) -> BrokerResult<()> {
        let actions = self.dispatcher.drain();

        if actions.shutdown {
            self.begin_shutdown(false);
        }
        if actions.quit {
            self.begin_shutdown(true);
        }
        if actions.restart {
            info!("SIGHUP received, restarting all children");
            self.supervisor.restart_all()?;
        }
        if actions.grow_by > 0 {
            for _ in 0..actions.grow_by {
                self.supervisor.grow_bounds();
            }
            info!(
                by = actions.grow_by,
                min_servers = self.supervisor.min_servers(),
                max_servers = self.supervisor.max_servers(),
                "SIGTTIN received, grew server bounds"
            );
        }
        if actions.shrink_by > 0 {
            for _ in 0..actions.shrink_by {
                self.supervisor.shrink_bounds();
            }
            info!(
                by = actions.shrink_by,
                min_servers = self.supervisor.min_servers(),
                max_servers = self.supervisor.max_servers(),
                "SIGTTOU received, shrank server bounds"
            );
        }
        if actions.child_exited {
            debug!("SIGCHLD observed, reaping on next housekeeping pass");
        }

        Ok(())
    }

    fn begin_shutdown(&mut self, quit: bool) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.shutdown_deadline = Some(Instant::now() + SHUTDOWN_GRACE);
        if quit {
            info!("SIGQUIT received, draining in-flight work before exit (kind=quit)");
        } else {
            info!("shutdown signal received, draining in-flight work before exit");
        }
    }

    /// True once every worker has returned to `waiting` or the grace period has elapsed,
    /// whichever comes first.
    fn shutdown_drained(&self) -> bool {
        self.supervisor.tally().processing == 0
            || self
                .shutdown_deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Pops the head of the idle-worker queue and forwards one frontend request to it. Only
    /// called when the queue is known non-empty.
    fn dispatch_frontend(&mut self) -> BrokerResult<()> {
        let mut message = self.frontend.recv_multipart(RecvFlags::empty())?;
        if !well_formed_envelope(&message) {
            warn!(frames = message.len(), "dropping malformed frontend message");
            return Ok(());
        }

        let client_id = message.pop_front().unwrap();
        let _delimiter = message.pop_front().unwrap();
        let payload = message.pop_front().unwrap();

        let worker_id = self
            .idle_workers
            .pop_front()
            .expect("dispatch_frontend only runs when the idle queue is non-empty");

        let envelope = vec![
            Message::from(worker_id),
            Message::new(),
            client_id,
            Message::new(),
            payload,
        ];
        if let Err(err) = self.backend.send_multipart(envelope, SendFlags::empty()) {
            warn!(%err, "failed to forward request to backend, dropping");
        }
        Ok(())
    }

    /// Receives one backend message: either a worker's READY/idle check-in or a reply to
    /// forward to the originating client. Either way the worker identity goes back onto the
    /// tail of the idle queue — a worker is idle immediately after any message it sends.
    fn service_backend(&mut self) -> BrokerResult<()> {
        let mut message = self.backend.recv_multipart(RecvFlags::empty())?;
        let Some(worker_frame) = message.pop_front() else {
            warn!("dropping empty backend message");
            return Ok(());
        };
        let worker_id = worker_frame.bytes();
        self.idle_workers.push_back(worker_id.clone());

        if message.len() < 2 {
            warn!(frames = message.len() + 1, "dropping malformed backend message");
            return Ok(());
        }

        let delimiter = message.pop_front().unwrap();
        if !delimiter.is_empty() {
            warn!("dropping backend message with non-empty delimiter frame");
            return Ok(());
        }

        let second = message.pop_front().unwrap();
        if second.bytes() == vec![READY_SENTINEL] {
            debug!(identity = %String::from_utf8_lossy(&worker_id), "worker checked in");
            return Ok(());
        }

        let client_id = second;
        if message.len() != 2 {
            warn!("dropping malformed backend reply");
            return Ok(());
        }
        let reply_delimiter = message.pop_front().unwrap();
        let result = message.pop_front().unwrap();
        if !reply_delimiter.is_empty() {
            warn!("dropping backend reply with non-empty delimiter frame");
            return Ok(());
        }

        let reply = vec![client_id, Message::new(), result];
        if let Err(err) = self.frontend.send_multipart(reply, SendFlags::empty()) {
            warn!(%err, "failed to forward reply to frontend, dropping");
        }
        Ok(())
    }

    /// Removes idle-queue identities belonging to pids the supervisor just reaped. Closes an
    /// accumulation hazard: a crashed worker's READY-era identity would otherwise linger in the
    /// queue until selected and yield an undeliverable send.
    fn scrub_idle(&mut self, reaped: &[Pid]) {
        if reaped.is_empty() {
            return;
        }
        let stale: Vec<WorkerId> = reaped.iter().map(|pid| worker_identity(pid.as_raw())).collect();
        let before = self.idle_workers.len();
        self.idle_workers.retain(|identity| !stale.contains(identity));
        let removed = before - self.idle_workers.len();
        if removed > 0 {
            debug!(removed, "scrubbed stale identities from idle-worker queue");
        }
    }
}

/// A well-formed frontend request is exactly `[client_id, empty, payload]`.
fn well_formed_envelope(message: &MultipartMessage) -> bool {
    message.len() == 3 && message.get(1).is_some_and(|frame| frame.is_empty())
}

#[cfg(test)]
mod broker_tests {
    use super::*;
    use crate::app;

    /// Binds to ephemeral loopback ports (`0`) for socket-backed tests. `Config` is built by
    /// hand rather than through `Config::from_cli`, whose validation disallows port `0` as an
    /// operator-supplied value — a restriction on the CLI surface, not on what a `RouterSocket`
    /// itself can bind to.
    fn test_config() -> Config {
        Config {
            frontend_port: 0,
            backend_port: 0,
            min_servers: 0,
            max_servers: 4,
            min_spare_servers: 0,
            max_spare_servers: 3,
            max_requests_per_worker: 0,
            check_for_waiting_secs: 5,
            user: None,
            group: None,
            log_level: "info".into(),
            app: app::echo(),
        }
    }

    #[test]
    fn well_formed_envelope_requires_three_frames_with_empty_delimiter() {
        let mut good = MultipartMessage::new();
        good.push_back("client".into());
        good.push_back(Message::new());
        good.push_back("payload".into());
        assert!(well_formed_envelope(&good));

        let mut too_short = MultipartMessage::new();
        too_short.push_back("client".into());
        too_short.push_back("payload".into());
        assert!(!well_formed_envelope(&too_short));

        let mut bad_delimiter = MultipartMessage::new();
        bad_delimiter.push_back("client".into());
        bad_delimiter.push_back("not-empty".into());
        bad_delimiter.push_back("payload".into());
        assert!(!well_formed_envelope(&bad_delimiter));
    }

    #[test]
    fn scrub_idle_removes_only_reaped_identities() {
        let context = Context::new().unwrap();
        let config = test_config();
        let mut broker = Broker::bind(
            &context,
            &config,
            SignalDispatcher::install().unwrap(),
        )
        .unwrap();

        broker.idle_workers.push_back(worker_identity(111));
        broker.idle_workers.push_back(worker_identity(222));
        broker.idle_workers.push_back(worker_identity(333));

        broker.scrub_idle(&[Pid::from_raw(222)]);

        assert_eq!(
            broker.idle_workers,
            VecDeque::from([worker_identity(111), worker_identity(333)])
        );
    }

    #[test]
    fn shutdown_is_drained_once_tally_shows_no_processing_workers() {
        let context = Context::new().unwrap();
        let config = test_config();
        let mut broker = Broker::bind(
            &context,
            &config,
            SignalDispatcher::install().unwrap(),
        )
        .unwrap();

        assert!(!broker.shutting_down);
        broker.begin_shutdown(false);
        assert!(broker.shutting_down);
        // Fresh supervisor: tally.processing is already zero.
        assert!(broker.shutdown_drained());
    }
}
