use std::mem;

use log::{error, info, warn};

use crate::{
    connection::{ConnectionRegistry, HOST_ID},
    error::TransportError,
    events::ServerEvents,
    loopback::{self, ClientEnd, ServerEnd},
    server::ListenConfig,
    transport::{
        ConnectionStatus, ConnectionStatusEvent, DisconnectReason, ListenHandle, NativeResult,
        NativeTransport, PeerIdentity, RemoteHandle,
    },
    types::{Channel, LocalState, RemoteState},
    ConnectionId,
};

/// Upper bound on messages pulled per connection in one incoming pass.
const MAX_RECEIVE_MESSAGES: usize = 256;

/// A server socket multiplexing remote peers and the local host client
/// over small reusable connection ids.
///
/// The socket is driven by an external tick: call
/// [`ServerSocket::iterate_outgoing`] and
/// [`ServerSocket::iterate_incoming`] once per update-loop pass. Native
/// connection-status callbacks are fed in through
/// [`ServerSocket::handle_connection_status`] by the layer owning the
/// native subscription, on the same logical thread of control as the
/// tick calls.
pub struct ServerSocket {
    /// Socket-level state, independent of individual connection states.
    state: LocalState,
    transport: Box<dyn NativeTransport>,
    /// Open listen socket, if any.
    listen: Option<ListenHandle>,
    registry: ConnectionRegistry,
    /// Server side of the loopback channel.
    server_end: ServerEnd,
    /// Contains state of the client host. True is started.
    client_host_started: bool,
    /// Identity the host client occupies in the registry while started.
    local_identity: PeerIdentity,
    events: ServerEvents,
}

impl ServerSocket {
    pub fn new(transport: Box<dyn NativeTransport>, local_identity: PeerIdentity) -> Self {
        let (server_end, _) = loopback::pair();
        Self {
            state: LocalState::Stopped,
            transport,
            listen: None,
            registry: ConnectionRegistry::new(),
            server_end,
            client_host_started: false,
            local_identity,
            events: ServerEvents::new(),
        }
    }

    /// Returns a client endpoint for the loopback channel, used by the
    /// local process to connect to its own server.
    pub fn client_host(&self) -> ClientEnd {
        self.server_end.client_end()
    }

    pub fn local_state(&self) -> LocalState {
        self.state
    }

    /// Starts listening. On native failure the socket transitions
    /// directly to Stopped and false is returned; the call is not
    /// retried automatically.
    pub fn start(&mut self, config: &ListenConfig) -> bool {
        self.registry.set_max_clients(config.max_clients);
        self.registry.reset();

        self.set_local_state(LocalState::Starting);
        match self.transport.create_listen_socket(&config.target) {
            Ok(handle) => {
                self.listen = Some(handle);
                self.set_local_state(LocalState::Started);
                true
            }
            Err(reason) => {
                warn!("listen socket could not be created: {reason}");
                self.events
                    .push_error(TransportError::StartFailure(reason));
                self.set_local_state(LocalState::Stopped);
                false
            }
        }
    }

    /// Stops the local socket. Returns false if already stopped or
    /// stopping. The host client cannot outlive the server side, so it
    /// is forced down first.
    pub fn stop(&mut self) -> bool {
        if matches!(self.state, LocalState::Stopped | LocalState::Stopping) {
            return false;
        }

        if self.server_end.force_client_stopped() {
            self.on_host_state_changed(false);
        }

        if let Some(handle) = self.listen.take() {
            self.transport.close_listen_socket(handle);
        }

        self.set_local_state(LocalState::Stopping);
        self.set_local_state(LocalState::Stopped);
        true
    }

    /// Stops a single connection, disconnecting the client. For
    /// [`HOST_ID`] this tears down the loopback client; otherwise the
    /// native connection is closed and the id released for reuse.
    pub fn stop_connection(&mut self, id: ConnectionId) -> bool {
        if id == HOST_ID {
            if !self.server_end.is_attached() {
                return false;
            }
            if !self.server_end.force_client_stopped() {
                return false;
            }
            self.on_host_state_changed(false);
            return true;
        }

        match self.registry.handle_for_id(id) {
            Some(handle) => {
                self.teardown(handle, id, DisconnectReason::StoppedByServer);
                true
            }
            None => {
                error!("no connection found for connection id {id}");
                self.events
                    .push_error(TransportError::UnknownConnection(id));
                false
            }
        }
    }

    /// Native-callback entry point for remote connection status
    /// changes. Must be invoked on the same logical thread of control
    /// as the iterate calls.
    pub fn handle_connection_status(&mut self, event: &ConnectionStatusEvent) {
        match event.status {
            ConnectionStatus::Connecting => {
                let max = self.registry.max_clients();
                if self.registry.connection_count() >= usize::from(max) {
                    info!(
                        "incoming connection {} rejected: maximum of {max} clients reached",
                        event.identity
                    );
                    self.transport
                        .close_connection(event.handle, DisconnectReason::CapacityExceeded);
                    return;
                }
                match self.transport.accept_connection(event.handle) {
                    NativeResult::Ok => info!("accepting connection {}", event.identity),
                    result => warn!(
                        "connection {} could not be accepted: {result:?}",
                        event.identity
                    ),
                }
            }
            ConnectionStatus::Connected => {
                match self.registry.allocate(event.handle, event.identity) {
                    Ok(id) => {
                        info!(
                            "peer {} connected, assigned connection id {id}",
                            event.identity
                        );
                        self.events.push_state_change(id, RemoteState::Started);
                    }
                    Err(err) => {
                        // Capacity is normally enforced at Connecting;
                        // a peer that slipped past is dropped here.
                        warn!("connection {} dropped after connect: {err}", event.identity);
                        self.transport
                            .close_connection(event.handle, DisconnectReason::CapacityExceeded);
                    }
                }
            }
            ConnectionStatus::ClosedByPeer | ConnectionStatus::ProblemDetectedLocally => {
                if let Some(id) = self.registry.id_for_handle(&event.handle) {
                    self.teardown(event.handle, id, DisconnectReason::ConnectionLost);
                }
            }
            ConnectionStatus::Other => {
                info!(
                    "connection {} status changed: {:?}",
                    event.identity, event.status
                );
            }
        }
    }

    /// Flushes buffered outbound native sends for every registered
    /// remote connection. The loopback path is unbuffered at this layer
    /// and is not touched.
    pub fn iterate_outgoing(&mut self) {
        if self.state != LocalState::Started {
            return;
        }

        let mut handles: Vec<RemoteHandle> =
            self.registry.iter_connections().map(|(handle, _)| handle).collect();
        // shuffle so no connection gets standing flush priority
        fastrand::shuffle(&mut handles);
        for handle in handles {
            self.transport.flush(handle);
        }
    }

    /// Drains all pending inbound traffic and returns the event batch
    /// accumulated since the previous call. Loopback packets are
    /// delivered before any remote packets within the same call.
    pub fn iterate_incoming(&mut self) -> ServerEvents {
        if !matches!(self.state, LocalState::Stopped | LocalState::Stopping) {
            // Local client packets first.
            for packet in self.server_end.drain_incoming() {
                let (channel, payload) = packet.into_parts();
                self.events.push_received(HOST_ID, channel, payload);
            }

            self.registry.lock_connections();
            for (handle, id) in self.registry.iter_connections() {
                for message in self.transport.receive_messages(handle, MAX_RECEIVE_MESSAGES) {
                    self.events.push_received(id, message.channel, message.payload);
                }
            }
            self.registry.unlock_connections();
        }

        mem::replace(&mut self.events, ServerEvents::new())
    }

    /// Sends data to a client. A no-op unless the socket is started.
    /// Send results indicating a dead connection trigger the same
    /// teardown as a close reported by the native layer.
    pub fn send(&mut self, channel: Channel, payload: &[u8], id: ConnectionId) {
        if self.state != LocalState::Started {
            return;
        }

        // Local client first, send and exit if so.
        if id == HOST_ID {
            self.server_end.send(channel, payload);
            return;
        }

        let Some(handle) = self.registry.handle_for_id(id) else {
            error!("connection id {id} does not exist, data will not be sent");
            self.events
                .push_error(TransportError::UnknownConnection(id));
            return;
        };

        match self.transport.send(handle, payload, channel) {
            NativeResult::Ok => {}
            NativeResult::NoConnection | NativeResult::InvalidParameter => {
                info!("connection to {id} was lost");
                self.teardown(handle, id, DisconnectReason::ConnectionLost);
            }
            result => {
                error!("could not send to connection {id}: {result:?}");
                self.events
                    .push_error(TransportError::NativeSendFailure { id });
            }
        }
    }

    /// Gets the connection state of a client on the server. Remote
    /// clients can only be Started or Stopped since nothing in between
    /// is observable above the native layer.
    pub fn connection_state(&self, id: ConnectionId) -> RemoteState {
        if self.registry.is_active(id) {
            RemoteState::Started
        } else {
            RemoteState::Stopped
        }
    }

    /// Gets the peer address of a connection id, rendered as a string.
    pub fn remote_peer_address(&self, id: ConnectionId) -> Option<String> {
        match self.registry.identity_for_id(id) {
            Some(identity) => Some(identity.to_string()),
            None => {
                error!("connection id {id} is invalid, no address available");
                None
            }
        }
    }

    /// Sets the maximum number of clients allowed to connect. Applied
    /// at runtime, existing clients stay connected but new clients may
    /// be rejected.
    pub fn set_maximum_clients(&mut self, value: u16) {
        self.registry.set_max_clients(value);
    }

    pub fn maximum_clients(&self) -> u16 {
        self.registry.max_clients()
    }

    /// Called when the loopback client transitions into or out of
    /// Started. On start the host identity is registered at [`HOST_ID`]
    /// and a started event raised; on stop any buffered client packets
    /// are flushed, a stopped event raised, and the identity removed.
    /// From the registry's point of view the host looks like a remote
    /// peer, except that it never consumes a pooled id.
    pub(crate) fn on_host_state_changed(&mut self, started: bool) {
        if started {
            self.registry.register_host(self.local_identity);
            info!("client host connected, assigned reserved connection id {HOST_ID}");
            self.events.push_state_change(HOST_ID, RemoteState::Started);
        } else if self.client_host_started {
            self.server_end.clear_incoming();
            self.events.push_state_change(HOST_ID, RemoteState::Stopped);
            self.registry.unregister_host(&self.local_identity);
            info!("client host disconnected");
        }
        self.client_host_started = started;
    }

    /// Shared teardown for deliberate stops, peer-side closes, and
    /// implicit disconnects: closes the native connection, releases the
    /// id to the reuse pool, and raises a stopped event.
    fn teardown(&mut self, handle: RemoteHandle, id: ConnectionId, reason: DisconnectReason) {
        self.transport.close_connection(handle, reason);
        self.registry.release(id);
        info!("client with connection id {id} disconnected");
        self.events.push_state_change(id, RemoteState::Stopped);
    }

    fn set_local_state(&mut self, state: LocalState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.server_end
            .set_server_started(state == LocalState::Started);
    }
}
