//! Shared utilities for the integration tests: a scriptable in-memory
//! native transport and helpers to bring up a started server.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use hostmux::{
    transport::{
        ConnectionStatus, ConnectionStatusEvent, DisconnectReason, ListenHandle, ListenTarget,
        NativeResult, NativeTransport, PeerIdentity, RawMessage, RemoteHandle,
    },
    Channel, ListenConfig, ServerSocket,
};

/// Identity the server under test uses for its own host client.
pub const LOCAL_IDENTITY: u64 = 7777;

/// Recorded native calls plus scripted results, shared between the
/// transport handed to the server and the test body.
pub struct MockState {
    /// When set, `create_listen_socket` fails with this reason.
    pub fail_listen: Option<String>,
    pub listen_open: bool,
    pub accepted: Vec<RemoteHandle>,
    pub accept_result: NativeResult,
    pub closed: Vec<(RemoteHandle, DisconnectReason)>,
    pub flushed: Vec<RemoteHandle>,
    pub sent: Vec<(RemoteHandle, Channel, Vec<u8>)>,
    /// Per-handle send results; handles not present send Ok.
    pub send_results: HashMap<RemoteHandle, NativeResult>,
    /// Inbound messages the server will pull on its next incoming pass.
    pub inbound: HashMap<RemoteHandle, VecDeque<RawMessage>>,
}

impl MockState {
    fn new() -> Self {
        Self {
            fail_listen: None,
            listen_open: false,
            accepted: Vec::new(),
            accept_result: NativeResult::Ok,
            closed: Vec::new(),
            flushed: Vec::new(),
            sent: Vec::new(),
            send_results: HashMap::new(),
            inbound: HashMap::new(),
        }
    }

    pub fn queue_inbound(&mut self, handle: RemoteHandle, channel: Channel, payload: &[u8]) {
        self.inbound.entry(handle).or_default().push_back(RawMessage {
            channel,
            payload: payload.into(),
        });
    }
}

pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl NativeTransport for MockTransport {
    fn create_listen_socket(&mut self, _target: &ListenTarget) -> Result<ListenHandle, String> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = state.fail_listen.take() {
            return Err(reason);
        }
        state.listen_open = true;
        Ok(ListenHandle::new(1))
    }

    fn close_listen_socket(&mut self, _handle: ListenHandle) {
        self.state.borrow_mut().listen_open = false;
    }

    fn accept_connection(&mut self, handle: RemoteHandle) -> NativeResult {
        let mut state = self.state.borrow_mut();
        state.accepted.push(handle);
        state.accept_result
    }

    fn close_connection(&mut self, handle: RemoteHandle, reason: DisconnectReason) {
        self.state.borrow_mut().closed.push((handle, reason));
    }

    fn send(&mut self, handle: RemoteHandle, payload: &[u8], channel: Channel) -> NativeResult {
        let mut state = self.state.borrow_mut();
        let result = state
            .send_results
            .get(&handle)
            .copied()
            .unwrap_or(NativeResult::Ok);
        if result == NativeResult::Ok {
            state.sent.push((handle, channel, payload.to_vec()));
        }
        result
    }

    fn receive_messages(&mut self, handle: RemoteHandle, max_count: usize) -> Vec<RawMessage> {
        let mut state = self.state.borrow_mut();
        let Some(queue) = state.inbound.get_mut(&handle) else {
            return Vec::new();
        };
        let count = queue.len().min(max_count);
        queue.drain(..count).collect()
    }

    fn flush(&mut self, handle: RemoteHandle) {
        self.state.borrow_mut().flushed.push(handle);
    }
}

pub fn mock_transport() -> (Box<dyn NativeTransport>, Rc<RefCell<MockState>>) {
    let state = Rc::new(RefCell::new(MockState::new()));
    (
        Box::new(MockTransport {
            state: state.clone(),
        }),
        state,
    )
}

/// Brings up a server in the Started state with the given capacity,
/// listening through a fresh mock transport.
pub fn started_server(max_clients: u16) -> (ServerSocket, Rc<RefCell<MockState>>) {
    init_logger();
    let (transport, state) = mock_transport();
    let mut server = ServerSocket::new(transport, PeerIdentity::new(LOCAL_IDENTITY));
    let config = ListenConfig {
        target: ListenTarget::PeerToPeer,
        max_clients,
    };
    assert!(server.start(&config));
    (server, state)
}

/// Walks a remote peer through Connecting and Connected on the server.
pub fn connect_peer(server: &mut ServerSocket, handle: u64, identity: u64) {
    let handle = RemoteHandle::new(handle);
    let identity = PeerIdentity::new(identity);
    server.handle_connection_status(&ConnectionStatusEvent {
        handle,
        identity,
        status: ConnectionStatus::Connecting,
    });
    server.handle_connection_status(&ConnectionStatusEvent {
        handle,
        identity,
        status: ConnectionStatus::Connected,
    });
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
