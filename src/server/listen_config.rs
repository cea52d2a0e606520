use std::net::{Ipv4Addr, SocketAddr};

use crate::transport::ListenTarget;

/// Contains config properties used when the server starts listening.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Where the native listen socket should bind.
    pub target: ListenTarget,
    /// Maximum number of remote clients. Clamped below the reserved
    /// host id; if lowered at runtime, existing clients stay connected
    /// but new clients may be rejected.
    pub max_clients: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            target: ListenTarget::Ip(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))),
            max_clients: 4095,
        }
    }
}
