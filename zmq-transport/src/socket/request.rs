use crate::{
    ZmqResult, sealed,
    socket::{MultipartReceiver, MultipartSender, Socket, SocketOption, SocketType},
};

/// # A Requester socket `ZMQ_REQ`
///
/// A socket of type [`Request`] is used by a worker to send a `READY` handshake and subsequent
/// job requests to, and receive replies from, a [`Router`] broker. This socket type allows only
/// an alternating sequence of send and subsequent recv calls. Each request sent is round-robined
/// among all connected peers, and each reply received is matched with the last issued request.
///
/// [`Request`]: RequestSocket
/// [`Router`]: super::RouterSocket
pub type RequestSocket = Socket<Request>;

pub struct Request {}

impl sealed::SenderFlag for Request {}
impl sealed::ReceiverFlag for Request {}

impl sealed::SocketType for Request {
    fn raw_socket_type() -> SocketType {
        SocketType::Request
    }
}

unsafe impl Sync for Socket<Request> {}
unsafe impl Send for Socket<Request> {}

impl MultipartSender for Socket<Request> {}
impl MultipartReceiver for Socket<Request> {}

impl Socket<Request> {
    /// # Match replies with requests `ZMQ_REQ_CORRELATE`
    pub fn set_correlate(&self, value: bool) -> ZmqResult<()> {
        self.set_sockopt_bool(SocketOption::RequestCorrelate, value)
    }

    /// # Relax strict alternation between request and reply `ZMQ_REQ_RELAXED`
    pub fn set_relaxed(&self, value: bool) -> ZmqResult<()> {
        self.set_sockopt_bool(SocketOption::RequestRelaxed, value)
    }

    /// # Set socket routing id `ZMQ_ROUTING_ID`
    ///
    /// Workers set this to their identity before connecting, so the broker's [`RouterSocket`]
    /// can address jobs back to the worker that claimed them.
    ///
    /// [`RouterSocket`]: super::RouterSocket
    pub fn set_routing_id<V>(&self, value: V) -> ZmqResult<()>
    where
        V: AsRef<str>,
    {
        self.set_sockopt_string(SocketOption::RoutingId, value)
    }

    /// # Retrieve socket routing id `ZMQ_ROUTING_ID`
    pub fn routing_id(&self) -> ZmqResult<String> {
        self.get_sockopt_string(SocketOption::RoutingId)
    }
}

#[cfg(test)]
mod request_tests {
    use super::RequestSocket;
    use crate::{
        ZmqResult,
        context::Context,
        socket::{
            MultipartReceiver, MultipartSender, Receiver, RecvFlags, RouterSocket, SendFlags,
            Sender,
        },
    };

    #[test]
    fn set_correlate_sets_correlate() -> ZmqResult<()> {
        let context = Context::new()?;

        let socket = RequestSocket::from_context(&context)?;
        socket.set_correlate(true)?;

        Ok(())
    }

    #[test]
    fn set_routing_id_sets_routing_id() -> ZmqResult<()> {
        let context = Context::new()?;

        let socket = RequestSocket::from_context(&context)?;
        socket.set_routing_id("asdf")?;

        assert_eq!(socket.routing_id()?, "asdf");

        Ok(())
    }

    #[test]
    fn request_router_round_trip() -> ZmqResult<()> {
        let context = Context::new()?;

        let router = RouterSocket::from_context(&context)?;
        router.bind("tcp://127.0.0.1:*")?;
        let endpoint = router.last_endpoint()?;

        let broker_handle = std::thread::spawn(move || {
            let mut multipart = router.recv_multipart(RecvFlags::empty()).unwrap();
            let worker_id = multipart.pop_front().unwrap();
            let body = multipart.pop_back().unwrap();
            assert_eq!(body.to_string(), "Hello");

            let reply = vec![worker_id, "".into(), "World".into()];
            router.send_multipart(reply, SendFlags::empty()).unwrap();
        });

        let worker = RequestSocket::from_context(&context)?;
        worker.set_routing_id("worker-1")?;
        worker.connect(endpoint)?;

        worker.send_msg("Hello", SendFlags::empty())?;
        let reply = worker.recv_msg(RecvFlags::empty())?;
        assert_eq!(reply.to_string(), "World");

        broker_handle.join().unwrap();

        Ok(())
    }
}
