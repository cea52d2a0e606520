//! # Hostmux
//! A transport-layer socket multiplexer that lets a single process act
//! simultaneously as a network server and as one of its own clients,
//! managing remote peers and a loopback host client through small
//! reusable connection ids instead of native connection handles.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod transport;

mod bimap;
mod connection;
mod error;
mod events;
mod loopback;
mod server;
mod types;

pub use bimap::BiMap;
pub use connection::{ConnectionId, ConnectionRegistry, HOST_ID};
pub use error::TransportError;
pub use events::ServerEvents;
pub use loopback::{ClientEnd, LocalPacket};
pub use server::{ListenConfig, ServerSocket};
pub use types::{Channel, LocalState, RemoteState};
