//! Thin unsafe wrappers around the raw zeromq C API.
//!
//! Everything in this module is private to the crate; [`context`] and [`socket`]
//! build the safe, typed API on top of it.

use alloc::ffi::CString;
use core::ffi::c_void;
use core::{mem, ptr};

use crate::{ZmqError, ZmqResult, zmq_sys_crate};

fn check_rc(rc: i32) -> ZmqResult<()> {
    if rc == -1 {
        Err(ZmqError::from(unsafe { zmq_sys_crate::zmq_errno() }))
    } else {
        Ok(())
    }
}

pub(crate) struct RawContext {
    ctx: *mut c_void,
}

unsafe impl Send for RawContext {}
unsafe impl Sync for RawContext {}

impl RawContext {
    pub(crate) fn new() -> ZmqResult<Self> {
        let ctx = unsafe { zmq_sys_crate::zmq_ctx_new() };
        if ctx.is_null() {
            return Err(ZmqError::from(unsafe { zmq_sys_crate::zmq_errno() }));
        }
        Ok(Self { ctx })
    }

    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.ctx
    }

    pub(crate) fn set_option(&self, option: i32, value: i32) -> ZmqResult<()> {
        check_rc(unsafe { zmq_sys_crate::zmq_ctx_set(self.ctx, option, value) })
    }

    pub(crate) fn option(&self, option: i32) -> ZmqResult<i32> {
        let rc = unsafe { zmq_sys_crate::zmq_ctx_get(self.ctx, option) };
        if rc == -1 {
            Err(ZmqError::from(unsafe { zmq_sys_crate::zmq_errno() }))
        } else {
            Ok(rc)
        }
    }

    pub(crate) fn shutdown(&self) -> ZmqResult<()> {
        check_rc(unsafe { zmq_sys_crate::zmq_ctx_shutdown(self.ctx) })
    }

    pub(crate) fn terminate(&self) -> ZmqResult<()> {
        check_rc(unsafe { zmq_sys_crate::zmq_ctx_term(self.ctx) })
    }
}

#[derive(Debug)]
#[repr(transparent)]
pub(crate) struct RawMessage {
    msg: zmq_sys_crate::zmq_msg_t,
}

impl RawMessage {
    pub(crate) fn with_size(len: usize) -> Self {
        let mut msg = mem::MaybeUninit::<zmq_sys_crate::zmq_msg_t>::uninit();
        unsafe {
            zmq_sys_crate::zmq_msg_init_size(msg.as_mut_ptr(), len);
            Self {
                msg: msg.assume_init(),
            }
        }
    }

    pub(crate) fn get_more(&self) -> bool {
        unsafe { zmq_sys_crate::zmq_msg_more(self.as_ptr() as *mut _) != 0 }
    }

    pub(crate) fn len(&self) -> usize {
        unsafe { zmq_sys_crate::zmq_msg_size(self.as_ptr() as *mut _) }
    }

    pub(crate) fn as_ptr(&self) -> *const zmq_sys_crate::zmq_msg_t {
        &self.msg
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut zmq_sys_crate::zmq_msg_t {
        &mut self.msg
    }
}

impl Default for RawMessage {
    fn default() -> Self {
        let mut msg = mem::MaybeUninit::<zmq_sys_crate::zmq_msg_t>::uninit();
        unsafe {
            zmq_sys_crate::zmq_msg_init(msg.as_mut_ptr());
            Self {
                msg: msg.assume_init(),
            }
        }
    }
}

impl Clone for RawMessage {
    fn clone(&self) -> Self {
        let mut cloned = Self::default();
        unsafe {
            zmq_sys_crate::zmq_msg_copy(cloned.as_mut_ptr(), self.as_ptr() as *mut _);
        }
        cloned
    }
}

impl Drop for RawMessage {
    fn drop(&mut self) {
        unsafe {
            zmq_sys_crate::zmq_msg_close(self.as_mut_ptr());
        }
    }
}

impl AsRef<[u8]> for RawMessage {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            let data = zmq_sys_crate::zmq_msg_data(self.as_ptr() as *mut _) as *const u8;
            core::slice::from_raw_parts(data, self.len())
        }
    }
}

impl From<&[u8]> for RawMessage {
    fn from(bytes: &[u8]) -> Self {
        let mut msg = Self::with_size(bytes.len());
        unsafe {
            let data = zmq_sys_crate::zmq_msg_data(msg.as_mut_ptr()) as *mut u8;
            ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
        }
        msg
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(bytes.as_slice())
    }
}

impl From<&str> for RawMessage {
    fn from(value: &str) -> Self {
        Self::from(value.as_bytes())
    }
}

impl From<String> for RawMessage {
    fn from(value: String) -> Self {
        Self::from(value.as_bytes())
    }
}

pub(crate) struct RawSocket {
    socket: *mut c_void,
}

unsafe impl Send for RawSocket {}
unsafe impl Sync for RawSocket {}

impl RawSocket {
    pub(crate) fn from_ctx(ctx: &RawContext, socket_type: i32) -> ZmqResult<Self> {
        let socket = unsafe { zmq_sys_crate::zmq_socket(ctx.as_ptr(), socket_type) };
        if socket.is_null() {
            return Err(ZmqError::from(unsafe { zmq_sys_crate::zmq_errno() }));
        }
        Ok(Self { socket })
    }

    pub(crate) fn bind(&self, endpoint: &str) -> ZmqResult<()> {
        let endpoint = CString::new(endpoint)?;
        check_rc(unsafe { zmq_sys_crate::zmq_bind(self.socket, endpoint.as_ptr()) })
    }

    pub(crate) fn unbind(&self, endpoint: &str) -> ZmqResult<()> {
        let endpoint = CString::new(endpoint)?;
        check_rc(unsafe { zmq_sys_crate::zmq_unbind(self.socket, endpoint.as_ptr()) })
    }

    pub(crate) fn connect(&self, endpoint: &str) -> ZmqResult<()> {
        let endpoint = CString::new(endpoint)?;
        check_rc(unsafe { zmq_sys_crate::zmq_connect(self.socket, endpoint.as_ptr()) })
    }

    pub(crate) fn disconnect(&self, endpoint: &str) -> ZmqResult<()> {
        let endpoint = CString::new(endpoint)?;
        check_rc(unsafe { zmq_sys_crate::zmq_disconnect(self.socket, endpoint.as_ptr()) })
    }

    pub(crate) fn send(&self, msg: &mut RawMessage, flags: i32) -> ZmqResult<()> {
        check_rc(unsafe {
            zmq_sys_crate::zmq_msg_send(msg.as_mut_ptr(), self.socket, flags) as i32
        })
    }

    pub(crate) fn recv(&self, flags: i32) -> ZmqResult<RawMessage> {
        let mut msg = RawMessage::default();
        let rc =
            unsafe { zmq_sys_crate::zmq_msg_recv(msg.as_mut_ptr(), self.socket, flags) as i32 };
        check_rc(rc)?;
        Ok(msg)
    }

    pub(crate) fn set_sockopt_bytes(&self, option: i32, value: &[u8]) -> ZmqResult<()> {
        check_rc(unsafe {
            zmq_sys_crate::zmq_setsockopt(
                self.socket,
                option,
                value.as_ptr() as *const c_void,
                value.len(),
            )
        })
    }

    pub(crate) fn set_sockopt_string(&self, option: i32, value: &str) -> ZmqResult<()> {
        self.set_sockopt_bytes(option, value.as_bytes())
    }

    pub(crate) fn set_sockopt_int<V: num_traits::PrimInt>(
        &self,
        option: i32,
        value: V,
    ) -> ZmqResult<()> {
        let value: i64 = value.to_i64().unwrap_or_default();
        check_rc(unsafe {
            zmq_sys_crate::zmq_setsockopt(
                self.socket,
                option,
                &value as *const i64 as *const c_void,
                mem::size_of::<i64>(),
            )
        })
    }

    pub(crate) fn set_sockopt_bool(&self, option: i32, value: bool) -> ZmqResult<()> {
        self.set_sockopt_int(option, i32::from(value))
    }

    pub(crate) fn get_sockopt_bytes(&self, option: i32) -> ZmqResult<Vec<u8>> {
        let mut buf = vec![0u8; 1024];
        let mut len = buf.len();
        check_rc(unsafe {
            zmq_sys_crate::zmq_getsockopt(
                self.socket,
                option,
                buf.as_mut_ptr() as *mut c_void,
                &mut len,
            )
        })?;
        buf.truncate(len);
        Ok(buf)
    }

    pub(crate) fn get_sockopt_string(&self, option: i32) -> ZmqResult<String> {
        let bytes = self.get_sockopt_bytes(option)?;
        let bytes = match bytes.last() {
            Some(0) => &bytes[..bytes.len() - 1],
            _ => &bytes[..],
        };
        Ok(core::str::from_utf8(bytes)?.to_owned())
    }

    pub(crate) fn get_sockopt_int<V: num_traits::PrimInt + Default>(
        &self,
        option: i32,
    ) -> ZmqResult<V> {
        let mut value: i64 = 0;
        let mut len = mem::size_of::<i64>();
        check_rc(unsafe {
            zmq_sys_crate::zmq_getsockopt(
                self.socket,
                option,
                &mut value as *mut i64 as *mut c_void,
                &mut len,
            )
        })?;
        Ok(V::from(value).unwrap_or_default())
    }

    pub(crate) fn get_sockopt_bool(&self, option: i32) -> ZmqResult<bool> {
        self.get_sockopt_int::<i32>(option).map(|value| value != 0)
    }

    pub(crate) fn poll(&self, events: i16, timeout_ms: i64) -> ZmqResult<i16> {
        let mut pollitem = zmq_sys_crate::zmq_pollitem_t {
            socket: self.socket,
            fd: 0,
            events,
            revents: 0,
        };

        let rc = unsafe { zmq_sys_crate::zmq_poll(&mut pollitem, 1, timeout_ms) };
        if rc == -1 {
            return Err(ZmqError::from(unsafe { zmq_sys_crate::zmq_errno() }));
        }
        Ok(pollitem.revents)
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe {
            zmq_sys_crate::zmq_close(self.socket);
        }
    }
}
