#![doc = include_str!("../README.md")]
#![allow(clippy::items_after_test_module)]
#![doc(test(no_crate_inject))]
#![deny(
    rustdoc::private_intra_doc_links,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::bare_urls
)]

extern crate alloc;

pub mod context;
#[doc(hidden)]
pub mod error;
mod ffi;
pub mod message;
pub mod socket;

#[doc(hidden)]
pub(crate) use zmq_transport_sys as zmq_sys_crate;

#[doc(inline)]
pub use error::{ZmqError, ZmqResult};

mod sealed {
    use crate::socket;

    pub trait ReceiverFlag {}
    pub trait SenderFlag {}
    pub trait SocketType {
        fn raw_socket_type() -> socket::SocketType;
    }
}

pub mod prelude {
    pub use crate::{
        ZmqError, ZmqResult,
        context::Context,
        message::{Message, MultipartMessage},
        socket::{
            MultipartReceiver, MultipartSender, PollEvents, Receiver, RecvFlags, RequestSocket,
            RouterSocket, SendFlags, Sender, Socket, SocketOption,
        },
    };
}

/// Return the current zeromq version, as `(major, minor, patch)`.
pub fn version() -> (i32, i32, i32) {
    let mut major = Default::default();
    let mut minor = Default::default();
    let mut patch = Default::default();

    unsafe { zmq_sys_crate::zmq_version(&mut major, &mut minor, &mut patch) };

    (major, minor, patch)
}

#[cfg(test)]
mod version_tests {
    use super::version;

    #[test]
    fn version_returns_something_sane() {
        let (major, _minor, _patch) = version();
        assert!(major >= 3);
    }
}
