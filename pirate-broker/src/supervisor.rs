//! Fork/reap lifecycle, child table, and tally. Also owns the status channel: an independent
//! ROUTER socket workers report `waiting`/`processing`/`exiting` transitions to, kept separate
//! from frontend/backend traffic by design: a dedicated socket, not a piggybacked framing
//! convention.

use std::collections::HashMap;
use std::time::Instant;

use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use tracing::{debug, warn};
use zmq_transport::prelude::*;

use crate::{
    app::AppCallback,
    config::Config,
    error::{BrokerError, BrokerResult},
    pid_from_identity, worker, worker_identity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Starting,
    Waiting,
    Processing,
    Exiting,
}

#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub identity: Option<Vec<u8>>,
    pub status: ChildStatus,
    pub started_at: Instant,
}

impl ChildRecord {
    fn starting(identity: Vec<u8>) -> Self {
        Self {
            identity: Some(identity),
            status: ChildStatus::Starting,
            started_at: Instant::now(),
        }
    }
}

/// Per-status counts of workers, maintained alongside the child table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub starting: usize,
    pub waiting: usize,
    pub processing: usize,
    pub exiting: usize,
}

pub struct Supervisor {
    children: HashMap<Pid, ChildRecord>,
    tally: Tally,
    status_socket: RouterSocket,
    status_endpoint: String,
    backend_port: u16,
    app: AppCallback,
    min_servers: usize,
    max_servers: usize,
    min_spare_servers: usize,
    max_spare_servers: usize,
    max_requests_per_worker: u64,
}

impl Supervisor {
    /// Binds the status socket to an ephemeral loopback port. Must run before [`crate::privilege::drop_privileges`]
    /// only insofar as binding generally should; the status port itself is never privileged.
    pub fn bind(context: &Context, config: &Config) -> BrokerResult<Self> {
        let status_socket = RouterSocket::from_context(context)?;
        status_socket.set_linger(0)?;
        status_socket
            .bind("tcp://127.0.0.1:*")
            .map_err(|source| BrokerError::Bind {
                endpoint: "tcp://127.0.0.1:*".into(),
                source,
            })?;
        let status_endpoint = status_socket.last_endpoint()?;

        Ok(Self {
            children: HashMap::new(),
            tally: Tally::default(),
            status_socket,
            status_endpoint,
            backend_port: config.backend_port,
            app: config.app.clone(),
            min_servers: config.min_servers,
            max_servers: config.max_servers,
            min_spare_servers: config.min_spare_servers,
            max_spare_servers: config.max_spare_servers,
            max_requests_per_worker: config.max_requests_per_worker,
        })
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn min_servers(&self) -> usize {
        self.min_servers
    }

    pub fn max_servers(&self) -> usize {
        self.max_servers
    }

    pub fn grow_bounds(&mut self) {
        self.min_servers += 1;
        self.max_servers += 1;
    }

    pub fn shrink_bounds(&mut self) {
        self.min_servers = self.min_servers.saturating_sub(1);
        self.max_servers = self.max_servers.saturating_sub(1);
    }

    /// Forks children until `min_servers` are alive. Called once at startup, after privileges
    /// have been dropped.
    pub fn ensure_min_servers(&mut self) -> BrokerResult<()> {
        while self.children.len() < self.min_servers {
            self.fork_worker()?;
        }
        Ok(())
    }

    /// Forks one worker. The child branch never touches `self` beyond copying plain values out
    /// before forking — the parent's context, sockets and child table must never be touched from
    /// the child side of a fork.
    fn fork_worker(&mut self) -> BrokerResult<()> {
        let backend_port = self.backend_port;
        let status_endpoint = self.status_endpoint.clone();
        let max_requests = self.max_requests_per_worker;
        let app = self.app.clone();

        match unsafe { fork() }? {
            ForkResult::Parent { child } => {
                let identity = worker_identity(child.as_raw());
                self.children.insert(child, ChildRecord::starting(identity));
                self.recompute_tally();
                Ok(())
            }
            ForkResult::Child => {
                let identity = worker_identity(nix::unistd::getpid().as_raw());
                let config = worker::WorkerConfig {
                    backend_port,
                    identity,
                    max_requests,
                    status_endpoint,
                };
                let exit_code = match worker::run(config, app) {
                    Ok(()) => 0,
                    Err(err) => {
                        tracing::error!(%err, "worker exited with error");
                        1
                    }
                };
                std::process::exit(exit_code);
            }
        }
    }

    /// Non-blocking reap of every exited child, returning the pids removed from the table.
    pub fn reap(&mut self) -> Vec<Pid> {
        let mut reaped = Vec::new();
        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, _)) | Ok(WaitStatus::Signaled(pid, _, _)) => {
                    self.children.remove(&pid);
                    reaped.push(pid);
                }
                Ok(WaitStatus::StillAlive) => break,
                Err(nix::errno::Errno::ECHILD) => break,
                Ok(_other) => continue,
                Err(_err) => break,
            }
        }
        if !reaped.is_empty() {
            debug!(count = reaped.len(), "reaped exited children");
            self.recompute_tally();
        }
        reaped
    }

    /// Sends HUP to every live child; each exits after finishing its current request, and the
    /// next [`housekeeping`](Self::housekeeping) pass forks replacements.
    pub fn restart_all(&mut self) -> BrokerResult<()> {
        for pid in self.children.keys().copied().collect::<Vec<_>>() {
            if let Err(err) = kill(pid, Signal::SIGHUP) {
                warn!(%err, pid = pid.as_raw(), "failed to send SIGHUP to child");
            }
        }
        Ok(())
    }

    /// Sends TERM to every live child and blocks until each has been reaped. Only safe to call
    /// once the broker has stopped dispatching new work and every in-flight reply has drained.
    pub fn terminate_all(&mut self) -> BrokerResult<()> {
        let pids: Vec<Pid> = self.children.keys().copied().collect();
        for pid in &pids {
            let _ = kill(*pid, Signal::SIGTERM);
        }
        for pid in &pids {
            let _ = waitpid(*pid, None);
        }
        self.children.clear();
        self.recompute_tally();
        Ok(())
    }

    fn stop_one_spare(&mut self) -> BrokerResult<()> {
        let victim = self
            .children
            .iter()
            .find(|(_, record)| record.status == ChildStatus::Waiting)
            .map(|(pid, _)| *pid);
        if let Some(pid) = victim {
            if let Err(err) = kill(pid, Signal::SIGTERM) {
                warn!(%err, pid = pid.as_raw(), "failed to stop spare worker");
            }
        }
        Ok(())
    }

    /// Reaps dead children, then forks or stops workers to keep the spare count within bounds.
    /// Returns the pids reaped this pass so the caller can scrub them from the idle-worker queue.
    pub fn housekeeping(&mut self) -> BrokerResult<Vec<Pid>> {
        let reaped = self.reap();

        let spare = self.tally.waiting;
        let total = self.children.len();
        if total < self.min_servers {
            // Below the floor takes priority over spare-pool sizing: a HUP-triggered mass exit
            // must recover to `min_servers` even when `min_spare_servers` is `0`.
            self.fork_worker()?;
        } else if spare < self.min_spare_servers && total < self.max_servers {
            self.fork_worker()?;
        } else if spare > self.max_spare_servers {
            self.stop_one_spare()?;
        }

        Ok(reaped)
    }

    fn recompute_tally(&mut self) {
        let mut tally = Tally::default();
        for record in self.children.values() {
            match record.status {
                ChildStatus::Starting => tally.starting += 1,
                ChildStatus::Waiting => tally.waiting += 1,
                ChildStatus::Processing => tally.processing += 1,
                ChildStatus::Exiting => tally.exiting += 1,
            }
        }
        self.tally = tally;
    }

    pub fn status_endpoint(&self) -> &str {
        &self.status_endpoint
    }

    /// Drains one status report if the status socket is readable, updates the child table, and
    /// acks it — the worker's own status socket is REQ-backed and won't send its next report
    /// until this reply arrives. Returns whether a report was processed.
    pub fn poll_status(&mut self) -> BrokerResult<bool> {
        if !self.status_socket.has_pollin()? {
            return Ok(false);
        }

        let mut msg = self.status_socket.recv_multipart(RecvFlags::empty())?;
        if msg.len() != 3 {
            warn!(frames = msg.len(), "dropping malformed status report");
            return Ok(true);
        }
        let worker_id = msg.pop_front().unwrap();
        let empty = msg.pop_front().unwrap();
        let state = msg.pop_front().unwrap();
        if !empty.is_empty() {
            warn!("dropping status report with non-empty delimiter frame");
            return Ok(true);
        }

        let identity = worker_id.bytes();
        if let Some(pid) = pid_from_identity(&identity) {
            if let Some(record) = self.children.get_mut(&pid) {
                record.identity = Some(identity.clone());
                record.status = match state.bytes().as_slice() {
                    b"waiting" => ChildStatus::Waiting,
                    b"processing" => ChildStatus::Processing,
                    b"exiting" => ChildStatus::Exiting,
                    other => {
                        warn!(?other, "unknown worker status, ignoring");
                        record.status
                    }
                };
            }
        }
        self.recompute_tally();

        let ack = vec![worker_id, Message::new(), Message::from(vec![0u8])];
        if let Err(err) = self.status_socket.send_multipart(ack, SendFlags::empty()) {
            warn!(%err, "failed to ack worker status report");
        }

        Ok(true)
    }
}

#[cfg(test)]
mod supervisor_tests {
    use std::thread;

    use super::*;
    use crate::app;

    fn test_config(context: &Context) -> Config {
        Config {
            frontend_port: 0,
            backend_port: 0,
            min_servers: 1,
            max_servers: 4,
            min_spare_servers: 1,
            max_spare_servers: 3,
            max_requests_per_worker: 0,
            check_for_waiting_secs: 5,
            user: None,
            group: None,
            log_level: "info".into(),
            app: app::echo(),
        }
        .with_context(context)
    }

    // Config has no public constructor outside from_cli; tests build it by hand via this
    // extension so the supervisor unit tests don't need a real Cli.
    trait ConfigExt {
        fn with_context(self, _context: &Context) -> Config;
    }
    impl ConfigExt for Config {
        fn with_context(self, _context: &Context) -> Config {
            self
        }
    }

    #[test]
    fn grow_and_shrink_bounds_move_both_limits() {
        let context = Context::new().unwrap();
        let config = test_config(&context);
        let mut supervisor = Supervisor::bind(&context, &config).unwrap();

        supervisor.grow_bounds();
        assert_eq!(supervisor.min_servers(), 2);
        assert_eq!(supervisor.max_servers(), 5);

        supervisor.shrink_bounds();
        supervisor.shrink_bounds();
        assert_eq!(supervisor.min_servers(), 0);
        assert_eq!(supervisor.max_servers(), 3);
    }

    #[test]
    fn bind_resolves_a_concrete_status_endpoint() {
        let context = Context::new().unwrap();
        let config = test_config(&context);
        let supervisor = Supervisor::bind(&context, &config).unwrap();
        assert!(supervisor.status_endpoint().starts_with("tcp://127.0.0.1:"));
        assert_ne!(supervisor.status_endpoint(), "tcp://127.0.0.1:*");
    }

    #[test]
    fn poll_status_updates_tally_and_acks_the_worker() {
        let context = Context::new().unwrap();
        let config = test_config(&context);
        let mut supervisor = Supervisor::bind(&context, &config).unwrap();

        let pid = Pid::from_raw(999_001);
        let identity = worker_identity(pid.as_raw());
        supervisor
            .children
            .insert(pid, ChildRecord::starting(identity.clone()));
        supervisor.recompute_tally();
        assert_eq!(supervisor.tally().starting, 1);

        let endpoint = supervisor.status_endpoint().to_string();
        let worker_socket = RequestSocket::from_context(&context).unwrap();
        worker_socket.set_routing_id(String::from_utf8(identity).unwrap()).unwrap();
        worker_socket.connect(endpoint).unwrap();

        let handle = thread::spawn(move || {
            worker_socket.send_msg("waiting", SendFlags::empty()).unwrap();
            worker_socket.recv_msg(RecvFlags::empty()).unwrap();
        });

        for _ in 0..200 {
            if supervisor.poll_status().unwrap() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }

        handle.join().unwrap();
        assert_eq!(supervisor.tally().waiting, 1);
        assert_eq!(supervisor.tally().starting, 0);
    }
}
