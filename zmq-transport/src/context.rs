//! 0MQ context
//!
//! A context holds the I/O threads and sockets belonging to one application. It
//! is thread-safe and reference-counted: cloning a [`Context`] shares the same
//! underlying `zmq_ctx_t`, it does not create a new one.

use alloc::sync::Arc;

use crate::{ZmqResult, ffi::RawContext, zmq_sys_crate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
/// Options that can be set or retrieved on a [`Context`].
pub enum ContextOption {
    /// Maximum number of sockets allowed on this context.
    MaxSockets,
    /// Size of the 0MQ thread pool for this context.
    IoThreads,
    /// Whether IPv6 is enabled on sockets created from this context.
    Ipv6,
}

impl From<ContextOption> for i32 {
    fn from(value: ContextOption) -> Self {
        match value {
            ContextOption::MaxSockets => zmq_sys_crate::ZMQ_MAX_SOCKETS as i32,
            ContextOption::IoThreads => zmq_sys_crate::ZMQ_IO_THREADS as i32,
            ContextOption::Ipv6 => zmq_sys_crate::ZMQ_IPV6 as i32,
        }
    }
}

#[derive(Debug, Clone)]
/// # 0MQ context
///
/// A [`Context`] is the container that owns the I/O threads a socket's
/// background work runs on. Sockets created [`from_context()`] a given
/// context share its I/O threads; terminating the context blocks until every
/// socket derived from it has been closed.
///
/// [`from_context()`]: crate::socket::Socket::from_context
pub struct Context {
    pub(crate) inner: Arc<RawContext>,
}

impl Context {
    /// Creates a new 0MQ context.
    pub fn new() -> ZmqResult<Self> {
        Ok(Self {
            inner: Arc::new(RawContext::new()?),
        })
    }

    /// Sets a [`ContextOption`] on this context.
    pub fn set_option(&self, option: ContextOption, value: i32) -> ZmqResult<()> {
        self.inner.set_option(option.into(), value)
    }

    /// Retrieves a [`ContextOption`] from this context.
    pub fn option(&self, option: ContextOption) -> ZmqResult<i32> {
        self.inner.option(option.into())
    }

    /// Convenience wrapper around [`ContextOption::IoThreads`].
    pub fn set_io_threads(&self, value: i32) -> ZmqResult<()> {
        self.set_option(ContextOption::IoThreads, value)
    }

    /// Convenience wrapper around [`ContextOption::MaxSockets`].
    pub fn set_max_sockets(&self, value: i32) -> ZmqResult<()> {
        self.set_option(ContextOption::MaxSockets, value)
    }

    /// # Shutdown a 0MQ context
    ///
    /// Unblocks any blocking send/recv calls in progress across all sockets derived from this
    /// context, so that in-flight operations fail instead of hanging forever. Unlike
    /// [`terminate()`], the context itself is still usable afterwards: sockets still need to be
    /// closed and the context still needs to be dropped to release its resources.
    ///
    /// [`terminate()`]: #method.terminate
    pub fn shutdown(&self) -> ZmqResult<()> {
        self.inner.shutdown()
    }

    /// # Terminate a 0MQ context
    ///
    /// Blocks until every socket opened against this context has been closed. Any blocking calls
    /// in progress shall be unblocked and fail. Call this explicitly when an orderly, synchronous
    /// shutdown is required; otherwise the context terminates when the last clone of it is
    /// dropped.
    pub fn terminate(&self) -> ZmqResult<()> {
        self.inner.terminate()
    }
}
