use std::collections::VecDeque;

use crate::{
    bimap::BiMap,
    connection::{ConnectionId, HOST_ID},
    error::TransportError,
    transport::{PeerIdentity, RemoteHandle},
};

/// Maps between native connection handles, peer identities, and
/// locally-assigned connection ids for every active connection.
///
/// Ids are reused eagerly through a FIFO pool rather than growing
/// monotonically, so the consuming layer sees a small, bounded id space
/// even under connection churn. Allocation is the only path that
/// creates an active id; release is the only path that recycles one.
pub struct ConnectionRegistry {
    /// Native handles for connection ids.
    connections: BiMap<RemoteHandle, ConnectionId>,
    /// Peer identities for connection ids. The host client occupies an
    /// identity entry at [`HOST_ID`] while logically connected.
    identities: BiMap<PeerIdentity, ConnectionId>,
    /// Next id to use for a connection when the reuse pool is empty.
    next_id: u16,
    /// Connection ids which can be reused, in release order.
    released: VecDeque<ConnectionId>,
    /// Maximum number of remote connections.
    max_clients: u16,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: BiMap::new(),
            identities: BiMap::new(),
            next_id: 0,
            released: VecDeque::new(),
            max_clients: 0,
        }
    }

    /// Sets the maximum number of remote clients, clamped below the
    /// reserved host id so the allocator can never hand it out.
    pub fn set_max_clients(&mut self, requested: u16) {
        self.max_clients = requested.min(HOST_ID.to_u16() - 1);
    }

    pub fn max_clients(&self) -> u16 {
        self.max_clients
    }

    /// Number of active remote connections. The host client is not
    /// counted; it never holds a pooled id.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Assigns a connection id to a newly connected peer, drawing from
    /// the reuse pool first and the counter otherwise.
    pub fn allocate(
        &mut self,
        handle: RemoteHandle,
        identity: PeerIdentity,
    ) -> Result<ConnectionId, TransportError> {
        if self.connection_count() >= usize::from(self.max_clients) {
            return Err(TransportError::CapacityExceeded {
                max: self.max_clients,
            });
        }

        let id = match self.released.pop_front() {
            Some(id) => id,
            None => {
                let id = ConnectionId::new(self.next_id);
                self.next_id += 1;
                id
            }
        };
        self.connections.insert(handle, id);
        self.identities.insert(identity, id);
        Ok(id)
    }

    /// Removes both map entries for `id` and returns it to the reuse
    /// pool. Releasing an id with no live mapping is a no-op returning
    /// false; nothing is pooled in that case.
    pub fn release(&mut self, id: ConnectionId) -> bool {
        if !self.connections.contains_right(&id) {
            return false;
        }
        self.connections.remove_by_right(&id);
        self.identities.remove_by_right(&id);
        self.released.push_back(id);
        true
    }

    pub fn id_for_handle(&self, handle: &RemoteHandle) -> Option<ConnectionId> {
        self.connections.get_by_left(handle).copied()
    }

    pub fn handle_for_id(&self, id: ConnectionId) -> Option<RemoteHandle> {
        self.connections.get_by_right(&id).copied()
    }

    pub fn identity_for_id(&self, id: ConnectionId) -> Option<PeerIdentity> {
        self.identities.get_by_right(&id).copied()
    }

    pub fn id_for_identity(&self, identity: &PeerIdentity) -> Option<ConnectionId> {
        self.identities.get_by_left(identity).copied()
    }

    /// True if any mapping exists for `id`, remote or host.
    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.connections.contains_right(&id) || self.identities.contains_right(&id)
    }

    /// Binds the local host's identity at the reserved host id. Repeat
    /// registrations are last-write-wins.
    pub fn register_host(&mut self, identity: PeerIdentity) {
        self.identities.insert(identity, HOST_ID);
    }

    pub fn unregister_host(&mut self, identity: &PeerIdentity) {
        self.identities.remove_by_left(identity);
    }

    /// Clears all mappings and resets id-allocation state. Called when
    /// the owning socket starts listening.
    pub fn reset(&mut self) {
        self.connections.clear();
        self.identities.clear();
        self.next_id = 0;
        self.released.clear();
    }

    /// Brackets an iteration pass over the handle↔id view so that
    /// connection-state callbacks arriving mid-pass defer their map
    /// mutations until the pass closes.
    pub fn lock_connections(&mut self) {
        self.connections.lock();
    }

    pub fn unlock_connections(&mut self) {
        self.connections.unlock();
    }

    pub fn iter_connections(&self) -> impl Iterator<Item = (RemoteHandle, ConnectionId)> + '_ {
        self.connections.iter().map(|(handle, id)| (*handle, *id))
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
