use thiserror::Error;

use crate::connection::ConnectionId;

/// Errors surfaced by the server socket.
///
/// Native-layer failures are absorbed and converted into one of these
/// kinds; nothing from this crate propagates a native failure directly
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Admission-control rejection: a connection attempt would exceed
    /// the configured maximum client count. A policy decision, not a
    /// fault; the incoming attempt is closed.
    #[error("incoming connection rejected: maximum of {max} clients reached")]
    CapacityExceeded { max: u16 },

    /// An operation referenced a connection id with no live mapping.
    #[error("no live connection exists for connection id {0}")]
    UnknownConnection(ConnectionId),

    /// A native send returned a non-success result that does not
    /// indicate a lost connection. The connection stays open.
    #[error("send to connection id {id} failed; the connection remains open")]
    NativeSendFailure { id: ConnectionId },

    /// The native listen socket could not be created. The socket is
    /// forced fully stopped, never left half-started.
    #[error("listen socket could not be created: {0}")]
    StartFailure(String),
}
