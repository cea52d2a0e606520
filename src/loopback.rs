//! Loopback channel between the server socket and the local process's
//! own client ("host"). No network stack is involved: the two endpoints
//! exchange packet snapshots through a pair of in-memory FIFO queues.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{
    server::ServerSocket,
    types::{Channel, LocalState},
};

/// An immutable snapshot of a channel id plus a byte payload, queued for
/// later delivery on the other end of the loopback channel.
#[derive(Debug, Clone)]
pub struct LocalPacket {
    channel: Channel,
    payload: Box<[u8]>,
}

impl LocalPacket {
    pub(crate) fn new(channel: Channel, bytes: &[u8]) -> Self {
        Self {
            channel,
            payload: bytes.into(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> (Channel, Box<[u8]>) {
        (self.channel, self.payload)
    }
}

/// State shared by the two loopback endpoints: one queue per direction
/// and the combined lifecycle gate. Each queue is written by exactly one
/// end and drained by the other; the endpoint types expose only the
/// operations their side is allowed to perform.
struct Shared {
    client_to_server: VecDeque<LocalPacket>,
    server_to_client: VecDeque<LocalPacket>,
    client_state: LocalState,
    server_started: bool,
    attached: bool,
}

pub(crate) fn pair() -> (ServerEnd, ClientEnd) {
    let shared = Rc::new(RefCell::new(Shared {
        client_to_server: VecDeque::new(),
        server_to_client: VecDeque::new(),
        client_state: LocalState::Stopped,
        server_started: false,
        attached: false,
    }));
    (
        ServerEnd {
            shared: shared.clone(),
        },
        ClientEnd { shared },
    )
}

/// Server-side endpoint, owned by [`ServerSocket`].
pub(crate) struct ServerEnd {
    shared: Rc<RefCell<Shared>>,
}

impl ServerEnd {
    pub(crate) fn client_end(&self) -> ClientEnd {
        ClientEnd {
            shared: self.shared.clone(),
        }
    }

    pub(crate) fn set_server_started(&self, started: bool) {
        self.shared.borrow_mut().server_started = started;
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.shared.borrow().attached
    }

    /// Queues a packet for the host client. No-op unless the client end
    /// is started.
    pub(crate) fn send(&self, channel: Channel, bytes: &[u8]) {
        let mut shared = self.shared.borrow_mut();
        if shared.client_state != LocalState::Started {
            return;
        }
        shared
            .server_to_client
            .push_back(LocalPacket::new(channel, bytes));
    }

    /// Pops every packet the host client has queued, in send order.
    pub(crate) fn drain_incoming(&self) -> Vec<LocalPacket> {
        let mut shared = self.shared.borrow_mut();
        shared.client_to_server.drain(..).collect()
    }

    pub(crate) fn clear_incoming(&self) {
        self.shared.borrow_mut().client_to_server.clear();
    }

    /// Tears the client end down from the server side: used when the
    /// server stops the host connection or stops entirely. Returns false
    /// if no attached client was running.
    pub(crate) fn force_client_stopped(&self) -> bool {
        let mut shared = self.shared.borrow_mut();
        if !shared.attached
            || matches!(
                shared.client_state,
                LocalState::Stopped | LocalState::Stopping
            )
        {
            return false;
        }
        shared.server_to_client.clear();
        shared.client_state = LocalState::Stopped;
        shared.attached = false;
        true
    }
}

/// Client-side endpoint of the loopback channel, held by the
/// application when the local process connects to its own server.
///
/// Obtained from [`ServerSocket::client_host`].
pub struct ClientEnd {
    shared: Rc<RefCell<Shared>>,
}

impl ClientEnd {
    /// Starts the host client connection. Fails unless the server side
    /// reports Started. No real handshake exists, so on success the
    /// client transitions Starting to Started synchronously and the
    /// server registers the host connection immediately.
    pub fn start(&mut self, server: &mut ServerSocket) -> bool {
        {
            let mut shared = self.shared.borrow_mut();
            shared.attached = true;
            if !shared.server_started {
                return false;
            }
            shared.client_state = LocalState::Starting;
            shared.client_state = LocalState::Started;
        }
        server.on_host_state_changed(true);
        true
    }

    /// Stops the host client connection. Returns false if already
    /// stopping or stopped. Clears the inbound queue and unbinds from
    /// the server end.
    pub fn stop(&mut self, server: &mut ServerSocket) -> bool {
        {
            let mut shared = self.shared.borrow_mut();
            if matches!(
                shared.client_state,
                LocalState::Stopped | LocalState::Stopping
            ) {
                return false;
            }
            shared.server_to_client.clear();
            shared.client_state = LocalState::Stopping;
            shared.client_state = LocalState::Stopped;
            shared.attached = false;
        }
        server.on_host_state_changed(false);
        true
    }

    /// Queues data to be delivered to the server on its next incoming
    /// pass. Dropped unless both ends report Started.
    pub fn send(&mut self, channel: Channel, bytes: &[u8]) {
        let mut shared = self.shared.borrow_mut();
        if shared.client_state != LocalState::Started || !shared.server_started {
            return;
        }
        shared
            .client_to_server
            .push_back(LocalPacket::new(channel, bytes));
    }

    /// Pops every packet the server has queued for the host client, in
    /// send order. Returns nothing unless the client end is started.
    pub fn drain(&mut self) -> Vec<LocalPacket> {
        let mut shared = self.shared.borrow_mut();
        if shared.client_state != LocalState::Started {
            return Vec::new();
        }
        shared.server_to_client.drain(..).collect()
    }

    pub fn state(&self) -> LocalState {
        self.shared.borrow().client_state
    }
}
