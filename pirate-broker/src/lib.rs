//! Preforking ZeroMQ "simple pirate" load-balancing job broker.
//!
//! Clients see a single frontend endpoint; a pool of worker processes serves requests from a
//! second backend endpoint. The broker (this crate's [`broker`] module) holds the idle-worker
//! queue and pairs each frontend request with the next idle worker; the [`supervisor`] module
//! forks and reaps that pool under [`signals`] control.

pub mod app;
pub mod broker;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod privilege;
pub mod signals;
pub mod supervisor;
pub mod worker;

pub use error::{BrokerError, BrokerResult};

/// Single-byte handshake a worker sends on its backend socket once, immediately after connecting,
/// to announce it is ready for work.
pub const READY_SENTINEL: u8 = 0x01;

/// Opaque routing key the backend ROUTER addresses a worker by. Assigned by the worker itself
/// before it connects, never interpreted beyond equality by the broker.
pub type WorkerId = Vec<u8>;

/// Opaque routing key the frontend ROUTER addresses a client by. Never interpreted by the broker.
pub type ClientId = Vec<u8>;

/// The routing/status identity this crate assigns to the child of `pid`.
///
/// Workers and the supervisor's status channel both key off this convention, so the supervisor
/// can recover a pid from a status report and the broker can recover an identity from a reaped
/// pid without any extra bookkeeping.
pub fn worker_identity(pid: i32) -> WorkerId {
    format!("child_{pid}").into_bytes()
}

/// Inverse of [`worker_identity`].
pub fn pid_from_identity(identity: &[u8]) -> Option<nix::unistd::Pid> {
    let text = std::str::from_utf8(identity).ok()?;
    let raw = text.strip_prefix("child_")?;
    raw.parse::<i32>().ok().map(nix::unistd::Pid::from_raw)
}

#[cfg(test)]
mod identity_tests {
    use super::{pid_from_identity, worker_identity};

    #[test]
    fn identity_round_trips_through_pid() {
        let identity = worker_identity(4242);
        assert_eq!(identity, b"child_4242");
        assert_eq!(pid_from_identity(&identity).unwrap().as_raw(), 4242);
    }

    #[test]
    fn pid_from_identity_rejects_garbage() {
        assert!(pid_from_identity(b"not-a-child").is_none());
        assert!(pid_from_identity(b"child_nope").is_none());
    }
}
