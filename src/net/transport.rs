//! Transport abstraction for host and client sessions
//!
//! The game loop only sees these traits. Implementations deliver inbound
//! traffic as events that are drained once per frame, and sends never block.

use std::fmt;

use crate::net::protocol::{ClientMessage, PeerId, ServerMessage};

/// Code a client needs to reach a host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinCode(pub String);

impl JoinCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session setup failures, surfaced to whoever started hosting or joining
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("no host is using join code {0}")]
    UnknownJoinCode(JoinCode),
    #[error("invalid join code {0:?}")]
    InvalidJoinCode(String),
    #[error("host rejected the handshake: {0}")]
    HandshakeRejected(String),
    #[error(transparent)]
    Framing(#[from] crate::net::framing::FramingError),
}

/// Inbound traffic on the host side
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PeerConnected(PeerId),
    PeerMessage { peer: PeerId, message: ClientMessage },
    PeerDisconnected(PeerId),
}

/// Inbound traffic on the client side
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Message(ServerMessage),
    /// The host went away; no further events follow
    Disconnected,
}

/// Authoritative side of a session
pub trait HostTransport: Send {
    fn join_code(&self) -> &JoinCode;

    /// Send to every connected peer
    fn broadcast(&mut self, message: &ServerMessage);

    fn send_to(&mut self, peer: PeerId, message: &ServerMessage);

    /// Everything received since the previous poll, in arrival order
    fn poll(&mut self) -> Vec<HostEvent>;

    /// Drop every connection and stop accepting new ones
    fn close(&mut self);
}

/// Presenting side of a session
pub trait ClientTransport: Send {
    fn peer_id(&self) -> PeerId;

    fn send_to_host(&mut self, message: &ClientMessage);

    fn poll(&mut self) -> Vec<ClientEvent>;

    fn close(&mut self);
}
