use std::mem;

use crate::{
    connection::ConnectionId,
    error::TransportError,
    types::{Channel, RemoteState},
};

/// Batch of events produced by the server socket, returned from
/// [`crate::ServerSocket::iterate_incoming`] once per tick.
///
/// Within a batch, loopback traffic always precedes remote traffic, so
/// application code sees a stable ordering when both are present.
pub struct ServerEvents {
    state_changes: Vec<(ConnectionId, RemoteState)>,
    received: Vec<(ConnectionId, Channel, Box<[u8]>)>,
    errors: Vec<TransportError>,
    empty: bool,
}

impl ServerEvents {
    pub(crate) fn new() -> Self {
        Self {
            state_changes: Vec::new(),
            received: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Remote-connection state transitions, in the order they occurred.
    pub fn take_state_changes(&mut self) -> Vec<(ConnectionId, RemoteState)> {
        mem::take(&mut self.state_changes)
    }

    /// Received application data, in delivery order.
    pub fn take_received(&mut self) -> Vec<(ConnectionId, Channel, Box<[u8]>)> {
        mem::take(&mut self.received)
    }

    pub fn take_errors(&mut self) -> Vec<TransportError> {
        mem::take(&mut self.errors)
    }

    // Crate-public

    pub(crate) fn push_state_change(&mut self, id: ConnectionId, state: RemoteState) {
        self.state_changes.push((id, state));
        self.empty = false;
    }

    pub(crate) fn push_received(&mut self, id: ConnectionId, channel: Channel, payload: Box<[u8]>) {
        self.received.push((id, channel, payload));
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: TransportError) {
        self.errors.push(error);
        self.empty = false;
    }
}
