mod id;
pub use id::{ConnectionId, HOST_ID};

mod registry;
pub use registry::ConnectionRegistry;
