//! In-process transport
//!
//! A [`LoopbackHub`] plays the part of the signalling service: hosts register
//! under a random join code and clients find them by it. Messages are handed
//! over through mailboxes, so host and clients may live on different threads.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use rand::Rng;
use uuid::Uuid;

use crate::game::constants::net::JOIN_CODE_LEN;
use crate::net::mailbox::{Mailbox, MailboxError, MailboxSender};
use crate::net::protocol::{ClientMessage, PeerId, ServerMessage};
use crate::net::transport::{
    ClientEvent, ClientTransport, HostEvent, HostTransport, JoinCode, NetError,
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

type PeerTable = Arc<Mutex<HashMap<PeerId, MailboxSender<ClientEvent>>>>;

struct Listing {
    host_inbox: MailboxSender<HostEvent>,
    peers: PeerTable,
}

/// Registry of hosted sessions
#[derive(Clone, Default)]
pub struct LoopbackHub {
    hosts: Arc<Mutex<HashMap<String, Listing>>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new host under a fresh join code
    pub fn host(&self) -> Result<LoopbackHost, NetError> {
        let inbox = Mailbox::default();
        let peers: PeerTable = Arc::default();

        let mut hosts = self.hosts.lock();
        let mut rng = rand::thread_rng();
        let code = loop {
            let candidate: String = (0..JOIN_CODE_LEN)
                .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
                .collect();
            if !hosts.contains_key(&candidate) {
                break candidate;
            }
        };
        hosts.insert(
            code.clone(),
            Listing {
                host_inbox: inbox.sender(),
                peers: peers.clone(),
            },
        );
        tracing::info!(%code, "Loopback host registered");

        Ok(LoopbackHost {
            code: JoinCode(code),
            inbox,
            peers,
            hub: self.clone(),
            closed: false,
        })
    }

    /// Connect to the host registered under `code`
    pub fn join(&self, code: &str) -> Result<LoopbackClient, NetError> {
        let normalized = code.trim().to_ascii_uppercase();
        let valid = normalized.len() == JOIN_CODE_LEN
            && normalized.bytes().all(|b| CODE_ALPHABET.contains(&b));
        if !valid {
            return Err(NetError::InvalidJoinCode(code.to_string()));
        }

        let hosts = self.hosts.lock();
        let listing = hosts
            .get(&normalized)
            .ok_or_else(|| NetError::UnknownJoinCode(JoinCode(normalized.clone())))?;

        let peer_id = Uuid::new_v4();
        let inbox = Mailbox::default();
        listing.peers.lock().insert(peer_id, inbox.sender());
        listing
            .host_inbox
            .try_send(HostEvent::PeerConnected(peer_id))
            .map_err(|e| NetError::HandshakeRejected(e.to_string()))?;

        Ok(LoopbackClient {
            peer_id,
            to_host: listing.host_inbox.clone(),
            inbox,
            peers: listing.peers.clone(),
            closed: false,
        })
    }

    /// Number of hosts currently accepting peers
    pub fn hosts(&self) -> usize {
        self.hosts.lock().len()
    }
}

fn deliver(peer: PeerId, tx: &MailboxSender<ClientEvent>, message: &ServerMessage) {
    if let Err(MailboxError::Full) = tx.try_send(ClientEvent::Message(message.clone())) {
        tracing::warn!(%peer, "Peer mailbox full, dropping message");
    }
}

pub struct LoopbackHost {
    code: JoinCode,
    inbox: Mailbox<HostEvent>,
    peers: PeerTable,
    hub: LoopbackHub,
    closed: bool,
}

impl LoopbackHost {
    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }
}

impl HostTransport for LoopbackHost {
    fn join_code(&self) -> &JoinCode {
        &self.code
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        for (peer, tx) in self.peers.lock().iter() {
            deliver(*peer, tx, message);
        }
    }

    fn send_to(&mut self, peer: PeerId, message: &ServerMessage) {
        if let Some(tx) = self.peers.lock().get(&peer) {
            deliver(peer, tx, message);
        }
    }

    fn poll(&mut self) -> Vec<HostEvent> {
        self.inbox.drain()
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        self.hub.hosts.lock().remove(self.code.as_str());
        for (peer, tx) in self.peers.lock().drain() {
            if let Err(MailboxError::Full) = tx.try_send(ClientEvent::Disconnected) {
                tracing::warn!(%peer, "Peer inbox full, disconnect not delivered");
            }
        }
        tracing::info!(code = %self.code, "Loopback host closed");
    }
}

impl Drop for LoopbackHost {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct LoopbackClient {
    peer_id: PeerId,
    to_host: MailboxSender<HostEvent>,
    inbox: Mailbox<ClientEvent>,
    peers: PeerTable,
    closed: bool,
}

impl ClientTransport for LoopbackClient {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn send_to_host(&mut self, message: &ClientMessage) {
        if self.closed {
            return;
        }
        let event = HostEvent::PeerMessage {
            peer: self.peer_id,
            message: message.clone(),
        };
        if let Err(e) = self.to_host.try_send(event) {
            tracing::warn!(peer = %self.peer_id, error = %e, "Dropping message to host");
        }
    }

    fn poll(&mut self) -> Vec<ClientEvent> {
        self.inbox.drain()
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        self.peers.lock().remove(&self.peer_id);
        let left = HostEvent::PeerDisconnected(self.peer_id);
        if let Err(MailboxError::Full) = self.to_host.try_send(left) {
            tracing::warn!(peer = %self.peer_id, "Host inbox full, disconnect not delivered");
        }
    }
}

impl Drop for LoopbackClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::WorldSnapshot;

    #[test]
    fn test_join_code_format() {
        let hub = LoopbackHub::new();
        let host = hub.host().unwrap();
        let code = host.join_code().as_str();
        assert_eq!(code.len(), JOIN_CODE_LEN);
        assert!(code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        assert_eq!(hub.hosts(), 1);
    }

    #[test]
    fn test_join_errors() {
        let hub = LoopbackHub::new();
        assert!(matches!(hub.join("nope"), Err(NetError::InvalidJoinCode(_))));
        assert!(matches!(hub.join("ABC123"), Err(NetError::UnknownJoinCode(_))));
    }

    #[test]
    fn test_round_trip() {
        let hub = LoopbackHub::new();
        let mut host = hub.host().unwrap();
        // Codes are case-insensitive on entry
        let mut client = hub.join(&host.join_code().as_str().to_lowercase()).unwrap();
        let peer = client.peer_id();

        assert_eq!(host.poll(), vec![HostEvent::PeerConnected(peer)]);

        client.send_to_host(&ClientMessage::Goodbye);
        assert_eq!(
            host.poll(),
            vec![HostEvent::PeerMessage {
                peer,
                message: ClientMessage::Goodbye
            }]
        );

        let welcome = ServerMessage::Welcome {
            peer_id: peer,
            entity_id: 4,
        };
        host.send_to(peer, &welcome);
        host.broadcast(&ServerMessage::State(WorldSnapshot::default()));
        let events = client.poll();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ClientEvent::Message(welcome));
    }

    #[test]
    fn test_disconnects_both_ways() {
        let hub = LoopbackHub::new();
        let mut host = hub.host().unwrap();
        let code = host.join_code().clone();
        let client = hub.join(code.as_str()).unwrap();
        let peer = client.peer_id();
        drop(client);

        let events = host.poll();
        assert_eq!(events.last(), Some(&HostEvent::PeerDisconnected(peer)));
        assert_eq!(host.peer_count(), 0);

        let mut client = hub.join(code.as_str()).unwrap();
        host.close();
        assert_eq!(client.poll(), vec![ClientEvent::Disconnected]);
        assert_eq!(hub.hosts(), 0);
        assert!(matches!(hub.join(code.as_str()), Err(NetError::UnknownJoinCode(_))));
    }
}
