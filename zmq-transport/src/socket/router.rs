use crate::{
    ZmqResult, sealed,
    socket::{MultipartReceiver, MultipartSender, Socket, SocketOption, SocketType},
};

/// # A router socket `ZMQ_ROUTER`
///
/// A socket of type [`Router`] is an advanced socket type used for extending request/reply
/// sockets. When receiving messages a [`Router`] socket shall prepend a message part containing
/// the routing id of the originating peer to the message before passing it to the application.
/// Messages received are fair-queued from among all connected peers. When sending messages a
/// [`Router`] socket shall remove the first part of the message and use it to determine the
/// [`routing_id()`] of the peer the message shall be routed to. If the peer does not exist
/// anymore, or has never existed, the message shall be silently discarded unless
/// [`RouterMandatory`] is set.
///
/// When a [`Request`] socket is connected to a [`Router`] socket, in addition to the routing id of
/// the originating peer each message received shall contain an empty delimiter message part.
/// Hence, the entire structure of each received message as seen by the application becomes: one
/// or more routing id parts, delimiter part, one or more body parts. When sending replies to a
/// [`Request`] socket the application must include the delimiter part.
///
/// [`Router`]: RouterSocket
/// [`Request`]: super::RequestSocket
/// [`routing_id()`]: #method.routing_id
/// [`RouterMandatory`]: SocketOption::RouterMandatory
pub type RouterSocket = Socket<Router>;

pub struct Router {}

impl sealed::SenderFlag for Router {}
impl sealed::ReceiverFlag for Router {}

impl sealed::SocketType for Router {
    fn raw_socket_type() -> SocketType {
        SocketType::Router
    }
}

unsafe impl Sync for Socket<Router> {}
unsafe impl Send for Socket<Router> {}

impl MultipartSender for Socket<Router> {}
impl MultipartReceiver for Socket<Router> {}

impl Socket<Router> {
    /// # Set socket routing id `ZMQ_ROUTING_ID`
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

    /// # Assign the next outbound routing id `ZMQ_CONNECT_ROUTING_ID`
    pub fn set_connect_routing_id<V>(&self, value: V) -> ZmqResult<()>
    where
        V: AsRef<str>,
    {
        self.set_sockopt_string(SocketOption::ConnectRoutingId, value)
    }

    /// # Bootstrap connections to ROUTER sockets `ZMQ_PROBE_ROUTER`
    pub fn set_probe_router(&self, value: bool) -> ZmqResult<()> {
        self.set_sockopt_bool(SocketOption::ProbeRouter, value)
    }

    /// # Hand over duplicate client routing ids on [`Router`] sockets `ZMQ_ROUTER_HANDOVER`
    ///
    /// [`Router`]: RouterSocket
    pub fn set_router_handover(&self, value: bool) -> ZmqResult<()> {
        self.set_sockopt_bool(SocketOption::RouterHandover, value)
    }

    /// # Accept only routable messages on [`Router`] sockets `ZMQ_ROUTER_MANDATORY`
    ///
    /// [`Router`]: RouterSocket
    pub fn set_router_mandatory(&self, value: bool) -> ZmqResult<()> {
        self.set_sockopt_bool(SocketOption::RouterMandatory, value)
    }
}
