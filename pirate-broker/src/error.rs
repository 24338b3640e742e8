use thiserror::Error;

/// Errors surfaced by the broker's own logic, distinct from [`zmq_transport::ZmqError`] which
/// this enum wraps rather than re-derives.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BrokerError {
    /// Rejected at startup: a missing application callback, malformed port list, or invalid
    /// user/group. Fatal; the CLI exits `1`.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A ROUTER socket could not bind its endpoint (address in use, permission denied). Fatal;
    /// the CLI exits `2`.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: zmq_transport::ZmqError,
    },

    /// `fork()` failed. The supervisor does not distinguish transient from persistent causes
    /// beyond the errno; callers may retry a bounded number of times before escalating.
    #[error("fork failed: {0}")]
    Fork(#[from] nix::errno::Errno),

    /// Dropping to the configured user/group failed.
    #[error("failed to drop privileges: {0}")]
    PrivilegeDrop(String),

    /// Registering a signal handler failed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),

    /// A messaging operation failed outside of the send/recv paths that are logged and dropped
    /// per the error handling design (e.g. socket construction, sockopt access).
    #[error("transport error: {0}")]
    Transport(#[from] zmq_transport::ZmqError),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
