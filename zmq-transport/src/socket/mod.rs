//! 0MQ sockets
//!
//! This module is trimmed to the two socket types a preforking ROUTER/REQ
//! broker needs: [`RouterSocket`] on the broker side, [`RequestSocket`] on the
//! worker side. A socket is always created [`from_context()`] a [`Context`]
//! and is generic over a marker type that seals which operations apply to it.
//!
//! [`from_context()`]: Socket::from_context

use alloc::sync::Arc;
use core::{iter, marker::PhantomData, ops::ControlFlow};

use bitflags::bitflags;
use derive_more::From;
use num_traits::PrimInt;

use crate::{
    ZmqError, ZmqResult,
    context::Context,
    ffi::RawSocket,
    message::{Message, MultipartMessage},
    sealed, zmq_sys_crate,
};

mod request;
mod router;

pub use request::RequestSocket;
pub use router::RouterSocket;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
/// The underlying `ZMQ_TYPE` of a [`Socket`].
pub enum SocketType {
    /// [`RequestSocket`]
    Request,
    /// [`RouterSocket`]
    Router,
}

impl From<SocketType> for i32 {
    fn from(value: SocketType) -> Self {
        match value {
            SocketType::Request => zmq_sys_crate::ZMQ_REQ as i32,
            SocketType::Router => zmq_sys_crate::ZMQ_ROUTER as i32,
        }
    }
}


#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[non_exhaustive]
/// Options that can be set or retrieved on a 0MQ socket
pub enum SocketOption {
    /// Socket routing id `ZMQ_ROUTING_ID`
    RoutingId,
    /// Peer id of the next outbound connection `ZMQ_CONNECT_ROUTING_ID`
    ConnectRoutingId,
    /// Linger period for socket shutdown `ZMQ_LINGER`
    Linger,
    /// Timeout for `recv` calls `ZMQ_RCVTIMEO`
    ReceiveTimeout,
    /// Timeout for `send` calls `ZMQ_SNDTIMEO`
    SendTimeout,
    /// High water mark for inbound messages `ZMQ_RCVHWM`
    ReceiveHighWaterMark,
    /// High water mark for outbound messages `ZMQ_SNDHWM`
    SendHighWaterMark,
    /// Accept only routable messages on ROUTER sockets `ZMQ_ROUTER_MANDATORY`
    RouterMandatory,
    /// Hand over duplicate routing ids instead of rejecting them `ZMQ_ROUTER_HANDOVER`
    RouterHandover,
    /// Bootstrap connections to ROUTER sockets `ZMQ_PROBE_ROUTER`
    ProbeRouter,
    /// Prefix outgoing REQ messages with a request id `ZMQ_REQ_CORRELATE`
    RequestCorrelate,
    /// Relax strict request/reply alternation on REQ sockets `ZMQ_REQ_RELAXED`
    RequestRelaxed,
    /// Last endpoint bound to this socket, useful to resolve the concrete address of a
    /// wildcard bind `ZMQ_LAST_ENDPOINT`
    LastEndpoint,
}

impl From<SocketOption> for i32 {
    fn from(value: SocketOption) -> Self {
        match value {
            SocketOption::RoutingId => zmq_sys_crate::ZMQ_ROUTING_ID as i32,
            SocketOption::ConnectRoutingId => zmq_sys_crate::ZMQ_CONNECT_ROUTING_ID as i32,
            SocketOption::Linger => zmq_sys_crate::ZMQ_LINGER as i32,
            SocketOption::ReceiveTimeout => zmq_sys_crate::ZMQ_RCVTIMEO as i32,
            SocketOption::SendTimeout => zmq_sys_crate::ZMQ_SNDTIMEO as i32,
            SocketOption::ReceiveHighWaterMark => zmq_sys_crate::ZMQ_RCVHWM as i32,
            SocketOption::SendHighWaterMark => zmq_sys_crate::ZMQ_SNDHWM as i32,
            SocketOption::RouterMandatory => zmq_sys_crate::ZMQ_ROUTER_MANDATORY as i32,
            SocketOption::RouterHandover => zmq_sys_crate::ZMQ_ROUTER_HANDOVER as i32,
            SocketOption::ProbeRouter => zmq_sys_crate::ZMQ_PROBE_ROUTER as i32,
            SocketOption::RequestCorrelate => zmq_sys_crate::ZMQ_REQ_CORRELATE as i32,
            SocketOption::RequestRelaxed => zmq_sys_crate::ZMQ_REQ_RELAXED as i32,
            SocketOption::LastEndpoint => zmq_sys_crate::ZMQ_LAST_ENDPOINT as i32,
        }
    }
}

#[cfg(test)]
mod socket_option_tests {
    use rstest::*;

    use super::SocketOption;
    use crate::zmq_sys_crate;

    #[rstest]
    #[case(SocketOption::RoutingId, zmq_sys_crate::ZMQ_ROUTING_ID as i32)]
    #[case(SocketOption::ConnectRoutingId, zmq_sys_crate::ZMQ_CONNECT_ROUTING_ID as i32)]
    #[case(SocketOption::Linger, zmq_sys_crate::ZMQ_LINGER as i32)]
    #[case(SocketOption::ReceiveTimeout, zmq_sys_crate::ZMQ_RCVTIMEO as i32)]
    #[case(SocketOption::SendTimeout, zmq_sys_crate::ZMQ_SNDTIMEO as i32)]
    #[case(SocketOption::ReceiveHighWaterMark, zmq_sys_crate::ZMQ_RCVHWM as i32)]
    #[case(SocketOption::SendHighWaterMark, zmq_sys_crate::ZMQ_SNDHWM as i32)]
    #[case(SocketOption::RouterMandatory, zmq_sys_crate::ZMQ_ROUTER_MANDATORY as i32)]
    #[case(SocketOption::RouterHandover, zmq_sys_crate::ZMQ_ROUTER_HANDOVER as i32)]
    #[case(SocketOption::ProbeRouter, zmq_sys_crate::ZMQ_PROBE_ROUTER as i32)]
    #[case(SocketOption::RequestCorrelate, zmq_sys_crate::ZMQ_REQ_CORRELATE as i32)]
    #[case(SocketOption::RequestRelaxed, zmq_sys_crate::ZMQ_REQ_RELAXED as i32)]
    #[case(SocketOption::LastEndpoint, zmq_sys_crate::ZMQ_LAST_ENDPOINT as i32)]
    fn converts_to_raw(#[case] option: SocketOption, #[case] raw: i32) {
        assert_eq!(<SocketOption as Into<i32>>::into(option), raw);
    }
}

/// # A typed 0MQ socket
///
/// `T` is a zero-sized marker (see [`router::Router`], [`request::Request`]) that, via the
/// sealed [`sealed::SocketType`]/[`sealed::SenderFlag`]/[`sealed::ReceiverFlag`] traits, decides
/// which of [`Sender`], [`Receiver`], [`MultipartSender`] and [`MultipartReceiver`] apply.
pub struct Socket<T: sealed::SocketType> {
    context: Context,
    pub(crate) socket: Arc<RawSocket>,
    marker: PhantomData<T>,
}

impl<T: sealed::SocketType> Socket<T> {
    /// General constructor
    pub fn from_context(context: &Context) -> ZmqResult<Self> {
        let socket = RawSocket::from_ctx(&context.inner, T::raw_socket_type() as i32)?;
        Ok(Self {
            context: context.clone(),
            socket: socket.into(),
            marker: PhantomData,
        })
    }

    pub fn set_sockopt_string<V>(&self, option: SocketOption, value: V) -> ZmqResult<()>
    where
        V: AsRef<str>,
    {
        self.socket
            .set_sockopt_string(option.into(), value.as_ref())
    }

    pub fn set_sockopt_int<V>(&self, option: SocketOption, value: V) -> ZmqResult<()>
    where
        V: PrimInt,
    {
        self.socket.set_sockopt_int(option.into(), value)
    }

    pub fn set_sockopt_bool(&self, option: SocketOption, value: bool) -> ZmqResult<()> {
        self.socket.set_sockopt_bool(option.into(), value)
    }

    pub fn get_sockopt_string(&self, option: SocketOption) -> ZmqResult<String> {
        self.socket.get_sockopt_string(option.into())
    }

    pub fn get_sockopt_int<V>(&self, option: SocketOption) -> ZmqResult<V>
    where
        V: PrimInt + Default,
    {
        self.socket.get_sockopt_int(option.into())
    }

    /// # Set linger period `ZMQ_LINGER`
    ///
    /// The [`Linger`] option shall set the linger period for the socket. The linger period
    /// determines how long pending outbound messages are kept after [`close()`]-ing the socket.
    /// A value of `-1` means "linger forever"; a value of `0` discards pending messages
    /// immediately.
    ///
    /// [`Linger`]: SocketOption::Linger
    /// [`close()`]: #method.close
    pub fn set_linger(&self, value: i32) -> ZmqResult<()> {
        self.set_sockopt_int(SocketOption::Linger, value)
    }

    /// # Retrieve linger period `ZMQ_LINGER`
    pub fn linger(&self) -> ZmqResult<i32> {
        self.get_sockopt_int(SocketOption::Linger)
    }

    /// # Set timeout for `recv` calls `ZMQ_RCVTIMEO`
    pub fn set_receive_timeout(&self, value: i32) -> ZmqResult<()> {
        self.set_sockopt_int(SocketOption::ReceiveTimeout, value)
    }

    /// # Retrieve timeout for `recv` calls `ZMQ_RCVTIMEO`
    pub fn receive_timeout(&self) -> ZmqResult<i32> {
        self.get_sockopt_int(SocketOption::ReceiveTimeout)
    }

    /// # Set timeout for `send` calls `ZMQ_SNDTIMEO`
    pub fn set_send_timeout(&self, value: i32) -> ZmqResult<()> {
        self.set_sockopt_int(SocketOption::SendTimeout, value)
    }

    /// # Retrieve timeout for `send` calls `ZMQ_SNDTIMEO`
    pub fn send_timeout(&self) -> ZmqResult<i32> {
        self.get_sockopt_int(SocketOption::SendTimeout)
    }

    /// # Set high water mark for inbound messages `ZMQ_RCVHWM`
    pub fn set_receive_highwater_mark(&self, value: i32) -> ZmqResult<()> {
        self.set_sockopt_int(SocketOption::ReceiveHighWaterMark, value)
    }

    /// # Set high water mark for outbound messages `ZMQ_SNDHWM`
    pub fn set_send_highwater_mark(&self, value: i32) -> ZmqResult<()> {
        self.set_sockopt_int(SocketOption::SendHighWaterMark, value)
    }

    /// # Start accepting connections on a socket
    ///
    /// Binds the socket to `endpoint`, a string consisting of a `transport://` prefix followed by
    /// a transport-specific address, e.g. `tcp://*:5555` or `ipc:///tmp/broker.sock`.
    pub fn bind<E>(&self, endpoint: E) -> ZmqResult<()>
    where
        E: AsRef<str>,
    {
        self.socket.bind(endpoint.as_ref())
    }

    /// # Stop accepting connections on a socket
    pub fn unbind<E>(&self, endpoint: E) -> ZmqResult<()>
    where
        E: AsRef<str>,
    {
        self.socket.unbind(endpoint.as_ref())
    }

    /// # Create outgoing connection from socket
    pub fn connect<E>(&self, endpoint: E) -> ZmqResult<()>
    where
        E: AsRef<str>,
    {
        self.socket.connect(endpoint.as_ref())
    }

    /// # Disconnect a socket from an endpoint
    pub fn disconnect<E>(&self, endpoint: E) -> ZmqResult<()>
    where
        E: AsRef<str>,
    {
        self.socket.disconnect(endpoint.as_ref())
    }

    /// # Retrieve the last endpoint bound to this socket `ZMQ_LAST_ENDPOINT`
    ///
    /// Resolves the concrete address a wildcard [`bind()`] (e.g. `tcp://127.0.0.1:*`) was
    /// actually bound to.
    ///
    /// [`bind()`]: #method.bind
    pub fn last_endpoint(&self) -> ZmqResult<String> {
        self.get_sockopt_string(SocketOption::LastEndpoint)
    }

    /// # input/output multiplexing
    ///
    /// Poll this socket for input/output readiness, blocking up to `timeout_ms` (`0` for a
    /// non-blocking check, `-1` to block indefinitely).
    pub fn poll<E>(&self, events: E, timeout_ms: i64) -> ZmqResult<PollEvents>
    where
        E: Into<PollEvents>,
    {
        self.socket
            .poll(events.into().bits(), timeout_ms)
            .map(PollEvents::from_bits_truncate)
            .map_err(|_err| ZmqError::InvalidArgument)
    }

    /// Convenience check equivalent to `poll(PollEvents::POLL_IN, 0).contains(POLL_IN)`.
    pub fn has_pollin(&self) -> ZmqResult<bool> {
        Ok(self.poll(PollEvents::POLL_IN, 0)?.contains(PollEvents::POLL_IN))
    }
}

impl<T: sealed::SocketType> Clone for Socket<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            socket: Arc::clone(&self.socket),
            marker: PhantomData,
        }
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, From, Default, PartialEq, Eq, PartialOrd, Ord)]
/// Flag options for receive operations
pub struct RecvFlags(i32);

bitflags! {
    impl RecvFlags: i32 {
        /// Specifies that the operation should be performed in non-blocking mode.
        const DONT_WAIT = 0b0000_0001;
    }
}

/// Trait for receiving single part messages
pub trait Receiver {
    fn recv_msg<F>(&self, flags: F) -> ZmqResult<Message>
    where
        F: Into<RecvFlags> + Copy;
}

impl<T> Receiver for Socket<T>
where
    T: sealed::SocketType + sealed::ReceiverFlag,
    Socket<T>: Sync,
{
    fn recv_msg<F>(&self, flags: F) -> ZmqResult<Message>
    where
        F: Into<RecvFlags> + Copy,
    {
        self.socket
            .recv(flags.into().bits())
            .map(Message::from_raw_msg)
    }
}

/// Trait for receiving multipart messages
pub trait MultipartReceiver: Receiver {
    fn recv_multipart<F>(&self, flags: F) -> ZmqResult<MultipartMessage>
    where
        F: Into<RecvFlags> + Copy,
    {
        iter::repeat_with(|| self.recv_msg(flags))
            .try_fold(
                MultipartMessage::new(),
                |mut parts, zmq_result| match zmq_result {
                    Err(e) => ControlFlow::Break(Err(e)),
                    Ok(zmq_msg) => {
                        let got_more = zmq_msg.get_more();
                        parts.push_back(zmq_msg);
                        if got_more {
                            ControlFlow::Continue(parts)
                        } else {
                            ControlFlow::Break(Ok(parts))
                        }
                    }
                },
            )
            .break_value()
            .unwrap()
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, From, Default, PartialEq, Eq, PartialOrd, Ord)]
/// Flag options for send operations
pub struct SendFlags(i32);

bitflags! {
    impl SendFlags: i32 {
        /// Perform the send in non-blocking mode.
        const DONT_WAIT = 0b0000_0001;
        /// Specifies that the message being sent is a multi-part message, and that further
        /// message parts are to follow.
        const SEND_MORE = 0b0000_0010;
    }
}

/// Trait for sending single part messages
pub trait Sender {
    fn send_msg<M, F>(&self, msg: M, flags: F) -> ZmqResult<()>
    where
        M: Into<Message>,
        F: Into<SendFlags> + Copy;
}

impl<T> Sender for Socket<T>
where
    T: sealed::SocketType + sealed::SenderFlag,
    Socket<T>: Sync,
{
    fn send_msg<M, F>(&self, msg: M, flags: F) -> ZmqResult<()>
    where
        M: Into<Message>,
        F: Into<SendFlags> + Copy,
    {
        msg.into().send(self, flags.into().bits())
    }
}

/// Trait for sending multipart messages
pub trait MultipartSender: Sender {
    fn send_multipart<M, F>(&self, iter: M, flags: F) -> ZmqResult<()>
    where
        M: Into<MultipartMessage>,
        F: Into<SendFlags> + Copy,
    {
        let mut last_part: Option<Message> = None;
        for part in iter.into() {
            let maybe_last = last_part.take();
            if let Some(last) = maybe_last {
                self.send_msg(last, flags.into() | SendFlags::SEND_MORE)?;
            }
            last_part = Some(part);
        }
        if let Some(last) = last_part {
            self.send_msg(last, flags)
        } else {
            Ok(())
        }
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, From, Default, PartialEq, Eq, PartialOrd, Ord)]
/// Events a socket can be [`poll`]ed for.
///
/// [`poll`]: Socket::poll
pub struct PollEvents(i16);

bitflags! {
    impl PollEvents: i16 {
        /// At least one message may be received without blocking.
        const POLL_IN  = 0b0000_0001;
        /// At least one message may be sent without blocking.
        const POLL_OUT = 0b0000_0010;
    }
}
