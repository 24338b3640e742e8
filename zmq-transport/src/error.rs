use alloc::ffi::{CString, FromVecWithNulError, IntoStringError, NulError};
use core::num::ParseIntError;
use core::str::Utf8Error;

use crate::zmq_sys_crate;

/// Errors that can occur when interacting with a zeromq context or socket.
///
/// Variants map 1:1 onto the `errno` values zeromq itself raises; `Other`
/// is the catch-all for codes this crate does not name explicitly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ZmqError {
    #[error("non-blocking call would have blocked")]
    Again,
    #[error("context was invalid")]
    ContextInvalid,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("operation not supported by this socket type")]
    Unsupported,
    #[error("protocol not supported")]
    ProtocolNotSupported,
    #[error("no buffer space available")]
    NoBufferSpaceAvailable,
    #[error("network is down")]
    NetworkDown,
    #[error("address already in use")]
    AddressInUse,
    #[error("address not available")]
    AddressNotAvailable,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("operation in progress")]
    OperationInProgress,
    #[error("socket is null")]
    SocketNull,
    #[error("message too long")]
    MessageTooLong,
    #[error("address family not supported")]
    AddressFamilyNotSupported,
    #[error("network unreachable")]
    NetworkUnreachable,
    #[error("connection aborted")]
    ConnectionAborted,
    #[error("connection reset")]
    ConnectionReset,
    #[error("not connected")]
    NotConnected,
    #[error("connection timed out")]
    ConnectionTimeout,
    #[error("host unreachable")]
    HostUnreachable,
    #[error("network dropped connection on reset")]
    NetworkReset,
    #[error("operation not possible in current socket state")]
    OperationNotPossible,
    #[error("protocol incompatible")]
    ProtocolIncompatible,
    #[error("context was terminated")]
    ContextTerminated,
    #[error("no i/o thread available")]
    IoThreadUnavailable,
    #[error("endpoint not in use")]
    EndpointNotInUse,
    #[error("call interrupted by signal")]
    Interrupted,
    #[error("too many open files")]
    TooManyOpenFiles,
    #[error("transport not supported")]
    TransportNotSupported,
    #[error("non-existent interface")]
    NonExistentInterface,
    #[error("insufficient memory")]
    InsufficientMemory,
    #[error("unknown zeromq error ({0})")]
    Other(i32),
}

impl From<i32> for ZmqError {
    fn from(errno: i32) -> Self {
        match errno {
            x if x == zmq_sys_crate::errno::EAGAIN => Self::Again,
            x if x == zmq_sys_crate::errno::EFAULT => Self::ContextInvalid,
            x if x == zmq_sys_crate::errno::EINVAL => Self::InvalidArgument,
            x if x == zmq_sys_crate::errno::ENOTSUP => Self::Unsupported,
            x if x == zmq_sys_crate::errno::EPROTONOSUPPORT => Self::ProtocolNotSupported,
            x if x == zmq_sys_crate::errno::ENOBUFS => Self::NoBufferSpaceAvailable,
            x if x == zmq_sys_crate::errno::ENETDOWN => Self::NetworkDown,
            x if x == zmq_sys_crate::errno::EADDRINUSE => Self::AddressInUse,
            x if x == zmq_sys_crate::errno::EADDRNOTAVAIL => Self::AddressNotAvailable,
            x if x == zmq_sys_crate::errno::ECONNREFUSED => Self::ConnectionRefused,
            x if x == zmq_sys_crate::errno::EINPROGRESS => Self::OperationInProgress,
            x if x == zmq_sys_crate::errno::ENOTSOCK => Self::SocketNull,
            x if x == zmq_sys_crate::errno::EMSGSIZE => Self::MessageTooLong,
            x if x == zmq_sys_crate::errno::EAFNOSUPPORT => Self::AddressFamilyNotSupported,
            x if x == zmq_sys_crate::errno::ENETUNREACH => Self::NetworkUnreachable,
            x if x == zmq_sys_crate::errno::ECONNABORTED => Self::ConnectionAborted,
            x if x == zmq_sys_crate::errno::ECONNRESET => Self::ConnectionReset,
            x if x == zmq_sys_crate::errno::ENOTCONN => Self::NotConnected,
            x if x == zmq_sys_crate::errno::ETIMEDOUT => Self::ConnectionTimeout,
            x if x == zmq_sys_crate::errno::EHOSTUNREACH => Self::HostUnreachable,
            x if x == zmq_sys_crate::errno::ENETRESET => Self::NetworkReset,
            x if x == zmq_sys_crate::errno::EFSM => Self::OperationNotPossible,
            x if x == zmq_sys_crate::errno::ENOCOMPATPROTO => Self::ProtocolIncompatible,
            x if x == zmq_sys_crate::errno::ETERM => Self::ContextTerminated,
            x if x == zmq_sys_crate::errno::EMTHREAD => Self::IoThreadUnavailable,
            x if x == zmq_sys_crate::errno::ENOENT => Self::EndpointNotInUse,
            x if x == zmq_sys_crate::errno::EINTR => Self::Interrupted,
            x if x == zmq_sys_crate::errno::EMFILE => Self::TooManyOpenFiles,
            x if x == zmq_sys_crate::errno::EPROTO => Self::TransportNotSupported,
            x if x == zmq_sys_crate::errno::ENODEV => Self::NonExistentInterface,
            x if x == zmq_sys_crate::errno::ENOMEM => Self::InsufficientMemory,
            other => Self::Other(other),
        }
    }
}

impl From<FromVecWithNulError> for ZmqError {
    fn from(_: FromVecWithNulError) -> Self {
        Self::InvalidArgument
    }
}

impl From<IntoStringError> for ZmqError {
    fn from(_: IntoStringError) -> Self {
        Self::InvalidArgument
    }
}

impl From<NulError> for ZmqError {
    fn from(_: NulError) -> Self {
        Self::InvalidArgument
    }
}

impl From<Utf8Error> for ZmqError {
    fn from(_: Utf8Error) -> Self {
        Self::InvalidArgument
    }
}

impl From<ParseIntError> for ZmqError {
    fn from(_: ParseIntError) -> Self {
        Self::InvalidArgument
    }
}

/// Convenience alias for results bounded by [`ZmqError`].
pub type ZmqResult<T, E = ZmqError> = Result<T, E>;

#[cfg(test)]
mod error_tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::again(zmq_sys_crate::errno::EAGAIN, ZmqError::Again)]
    #[case::context_invalid(zmq_sys_crate::errno::EFAULT, ZmqError::ContextInvalid)]
    #[case::invalid_argument(zmq_sys_crate::errno::EINVAL, ZmqError::InvalidArgument)]
    #[case::unsupported(zmq_sys_crate::errno::ENOTSUP, ZmqError::Unsupported)]
    #[case::protocol_not_supported(
        zmq_sys_crate::errno::EPROTONOSUPPORT,
        ZmqError::ProtocolNotSupported
    )]
    #[case::no_buffer_space(zmq_sys_crate::errno::ENOBUFS, ZmqError::NoBufferSpaceAvailable)]
    #[case::network_down(zmq_sys_crate::errno::ENETDOWN, ZmqError::NetworkDown)]
    #[case::address_in_use(zmq_sys_crate::errno::EADDRINUSE, ZmqError::AddressInUse)]
    #[case::address_not_available(
        zmq_sys_crate::errno::EADDRNOTAVAIL,
        ZmqError::AddressNotAvailable
    )]
    #[case::connection_refused(zmq_sys_crate::errno::ECONNREFUSED, ZmqError::ConnectionRefused)]
    #[case::operation_in_progress(
        zmq_sys_crate::errno::EINPROGRESS,
        ZmqError::OperationInProgress
    )]
    #[case::socket_null(zmq_sys_crate::errno::ENOTSOCK, ZmqError::SocketNull)]
    #[case::message_too_long(zmq_sys_crate::errno::EMSGSIZE, ZmqError::MessageTooLong)]
    #[case::address_family_not_supported(
        zmq_sys_crate::errno::EAFNOSUPPORT,
        ZmqError::AddressFamilyNotSupported
    )]
    #[case::network_unreachable(zmq_sys_crate::errno::ENETUNREACH, ZmqError::NetworkUnreachable)]
    #[case::connection_aborted(zmq_sys_crate::errno::ECONNABORTED, ZmqError::ConnectionAborted)]
    #[case::connection_reset(zmq_sys_crate::errno::ECONNRESET, ZmqError::ConnectionReset)]
    #[case::not_connected(zmq_sys_crate::errno::ENOTCONN, ZmqError::NotConnected)]
    #[case::connection_timeout(zmq_sys_crate::errno::ETIMEDOUT, ZmqError::ConnectionTimeout)]
    #[case::host_unreachable(zmq_sys_crate::errno::EHOSTUNREACH, ZmqError::HostUnreachable)]
    #[case::network_reset(zmq_sys_crate::errno::ENETRESET, ZmqError::NetworkReset)]
    #[case::operation_not_possible(zmq_sys_crate::errno::EFSM, ZmqError::OperationNotPossible)]
    #[case::protocol_incompatible(
        zmq_sys_crate::errno::ENOCOMPATPROTO,
        ZmqError::ProtocolIncompatible
    )]
    #[case::context_terminated(zmq_sys_crate::errno::ETERM, ZmqError::ContextTerminated)]
    #[case::io_thread_unavailable(zmq_sys_crate::errno::EMTHREAD, ZmqError::IoThreadUnavailable)]
    #[case::endpoint_not_in_use(zmq_sys_crate::errno::ENOENT, ZmqError::EndpointNotInUse)]
    #[case::interrupted(zmq_sys_crate::errno::EINTR, ZmqError::Interrupted)]
    #[case::too_many_open_files(zmq_sys_crate::errno::EMFILE, ZmqError::TooManyOpenFiles)]
    #[case::transport_not_supported(zmq_sys_crate::errno::EPROTO, ZmqError::TransportNotSupported)]
    #[case::non_existent_interface(zmq_sys_crate::errno::ENODEV, ZmqError::NonExistentInterface)]
    #[case::insufficient_memory(zmq_sys_crate::errno::ENOMEM, ZmqError::InsufficientMemory)]
    #[case::other(0xBAD, ZmqError::Other(0xBAD))]
    fn errno_conversion(#[case] errno: i32, #[case] expected: ZmqError) {
        assert_eq!(ZmqError::from(errno), expected);
    }

    #[test]
    fn nul_error_is_invalid_argument() {
        let err = CString::new(b"abc\0def".to_vec()).unwrap_err();
        assert_eq!(ZmqError::from(err), ZmqError::InvalidArgument);
    }

    #[test]
    fn into_string_error_is_invalid_argument() {
        let cstring = CString::new(vec![0xffu8]).unwrap_or_else(|_| CString::new("x").unwrap());
        if let Err(err) = cstring.into_string() {
            assert_eq!(ZmqError::from(err), ZmqError::InvalidArgument);
        }
    }

    #[test]
    fn parse_int_error_is_invalid_argument() {
        let err = "not a number".parse::<i32>().unwrap_err();
        assert_eq!(ZmqError::from(err), ZmqError::InvalidArgument);
    }

    #[test]
    fn utf8_error_is_invalid_argument() {
        let err = core::str::from_utf8(&[0xff, 0xfe]).unwrap_err();
        assert_eq!(ZmqError::from(err), ZmqError::InvalidArgument);
    }
}
