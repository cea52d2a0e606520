//! Interface boundary with the underlying native transport.
//!
//! The core never creates or polls network resources itself; it drives
//! an implementation of [`NativeTransport`] through non-blocking calls
//! and is fed [`ConnectionStatusEvent`]s by the layer that owns the
//! native callback subscription.

use std::{fmt, net::SocketAddr};

use crate::types::Channel;

/// Opaque native handle for a specific connection instance. A handle is
/// only meaningful to the transport that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteHandle(u64);

impl RemoteHandle {
    pub fn new(raw: u64) -> Self {
        RemoteHandle(raw)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

/// Stable identifier of a remote party. Distinct namespace from
/// [`RemoteHandle`]: a peer may reconnect with a new handle while
/// keeping its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIdentity(u64);

impl PeerIdentity {
    pub fn new(raw: u64) -> Self {
        PeerIdentity(raw)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for an open listen socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenHandle(u64);

impl ListenHandle {
    pub fn new(raw: u64) -> Self {
        ListenHandle(raw)
    }
}

/// Where the listen socket should bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenTarget {
    /// Listen on an IP address and port.
    Ip(SocketAddr),
    /// Listen through the native layer's peer-to-peer relay.
    PeerToPeer,
}

/// Result of a native accept or send call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeResult {
    Ok,
    /// The referenced connection no longer exists.
    NoConnection,
    /// The call was malformed from the native layer's point of view.
    InvalidParameter,
    /// Any other non-success result.
    Other,
}

/// Reason passed to the native layer when closing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Admission control: the connection attempt exceeded capacity.
    CapacityExceeded,
    /// The server deliberately stopped this connection.
    StoppedByServer,
    /// The connection was detected as already gone.
    ConnectionLost,
}

/// Status reported by the native layer for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    ClosedByPeer,
    ProblemDetectedLocally,
    Other,
}

/// A connection-status callback payload, delivered to
/// [`crate::ServerSocket::handle_connection_status`] by the owning
/// layer. Delivery must happen on the same logical thread of control as
/// the tick calls, before the next iterate pass.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionStatusEvent {
    pub handle: RemoteHandle,
    pub identity: PeerIdentity,
    pub status: ConnectionStatus,
}

/// One inbound message pulled off a native connection.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub channel: Channel,
    pub payload: Box<[u8]>,
}

/// Capability set consumed from the underlying native transport. All
/// calls are non-blocking polls; none may suspend.
pub trait NativeTransport {
    /// Creates a listen socket for the given target. Failure reasons are
    /// reported as strings; the caller treats any failure as fatal for
    /// the start attempt.
    fn create_listen_socket(&mut self, target: &ListenTarget) -> Result<ListenHandle, String>;

    fn close_listen_socket(&mut self, handle: ListenHandle);

    /// Accepts a connection that reported `Connecting`.
    fn accept_connection(&mut self, handle: RemoteHandle) -> NativeResult;

    fn close_connection(&mut self, handle: RemoteHandle, reason: DisconnectReason);

    /// Sends a payload on the given connection and channel.
    fn send(&mut self, handle: RemoteHandle, payload: &[u8], channel: Channel) -> NativeResult;

    /// Pulls up to `max_count` currently available inbound messages for
    /// the given connection.
    fn receive_messages(&mut self, handle: RemoteHandle, max_count: usize) -> Vec<RawMessage>;

    /// Flushes any buffered outbound sends for the given connection.
    fn flush(&mut self, handle: RemoteHandle);
}
