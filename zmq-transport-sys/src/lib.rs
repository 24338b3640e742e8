//! Raw FFI bindings to libzmq, generated at build time by `bindgen` against the
//! vendored `zmq.h` and linked against the vendored, statically built `pirate_zmq`.
#![allow(
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    dead_code
)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

/// `errno` values libzmq can return from `zmq_errno()`.
///
/// On unix-likes these mirror the platform's own `errno.h` values; libzmq
/// additionally defines a handful of codes (`ZMQ_HAUSNUMERO` and above) for
/// conditions POSIX has no code for.
pub mod errno {
    pub use libc::{
        EADDRINUSE, EADDRNOTAVAIL, EAFNOSUPPORT, EAGAIN, ECONNABORTED, ECONNREFUSED, ECONNRESET,
        EFAULT, EHOSTUNREACH, EINPROGRESS, EINTR, EINVAL, EMFILE, EMSGSIZE, ENETDOWN,
        ENETRESET, ENETUNREACH, ENOBUFS, ENODEV, ENOENT, ENOMEM, ENOTCONN, ENOTSOCK, ENOTSUP,
        EPROTO, EPROTONOSUPPORT, ETIMEDOUT,
    };

    const ZMQ_HAUSNUMERO: i32 = 156_384_712;

    pub const EFSM: i32 = ZMQ_HAUSNUMERO + 51;
    pub const ENOCOMPATPROTO: i32 = ZMQ_HAUSNUMERO + 52;
    pub const ETERM: i32 = ZMQ_HAUSNUMERO + 53;
    pub const EMTHREAD: i32 = ZMQ_HAUSNUMERO + 54;
}
