use std::fmt;

/// Channel a payload is carried on, as tagged by the native transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(pub u8);

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a locally-owned socket (server or loopback client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Stopped,
    Starting,
    Started,
    Stopping,
}

/// Connection state of a remote client as observable above the native
/// layer. Remote clients can only be Started or Stopped since nothing
/// in between is visible once a connection id exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    Started,
    Stopped,
}
