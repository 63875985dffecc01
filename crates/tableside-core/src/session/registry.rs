//! Live connections of one session and the identity each has declared.
//!
//! The registry is owned exclusively by its session actor and is never
//! shared, so it needs no locking. An entry is created when a connection
//! attaches, acquires a `senderId` only through `hand-joined`, and is
//! dropped when that connection detaches.

use std::collections::HashMap;
use std::sync::Arc;

use tableside_types::connection::ConnectionId;
use tokio::sync::mpsc;

/// One serialized text frame. Shared so a broadcast encodes once.
pub type Frame = Arc<str>;

/// Sending half of a connection's outbound queue.
///
/// Unbounded so the actor never waits on a slow socket.
pub type Outbound = mpsc::UnboundedSender<Frame>;

struct Peer {
    outbound: Outbound,
    sender_id: Option<String>,
}

/// Connection handle -> (outbound queue, declared sender id).
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: HashMap<ConnectionId, Peer>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected, still anonymous connection.
    pub fn attach(&mut self, conn_id: ConnectionId, outbound: Outbound) {
        self.peers.insert(
            conn_id,
            Peer {
                outbound,
                sender_id: None,
            },
        );
    }

    /// Bind a connection to the identity it announced.
    ///
    /// Returns the identity it was previously bound to, if any. Unknown
    /// connections are ignored.
    pub fn bind(&mut self, conn_id: ConnectionId, sender_id: String) -> Option<String> {
        self.peers
            .get_mut(&conn_id)
            .and_then(|peer| peer.sender_id.replace(sender_id))
    }

    /// Forget a connection. Returns its identity if it ever declared one.
    pub fn detach(&mut self, conn_id: ConnectionId) -> Option<String> {
        self.peers.remove(&conn_id).and_then(|peer| peer.sender_id)
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.peers.contains_key(&conn_id)
    }

    /// Queue a frame for one connection. Returns `false` if the connection is
    /// unknown or its socket task has already gone away.
    pub fn send_to(&self, conn_id: ConnectionId, frame: &Frame) -> bool {
        self.peers
            .get(&conn_id)
            .is_some_and(|peer| peer.outbound.send(Arc::clone(frame)).is_ok())
    }

    /// Queue a frame for every connection bound to `sender_id`.
    ///
    /// Returns the number of connections it was queued for.
    pub fn send_to_sender(&self, sender_id: &str, frame: &Frame) -> usize {
        self.peers
            .values()
            .filter(|peer| peer.sender_id.as_deref() == Some(sender_id))
            .filter(|peer| peer.outbound.send(Arc::clone(frame)).is_ok())
            .count()
    }

    /// Queue a frame for every connection, optionally skipping one.
    ///
    /// Returns the number of connections it was queued for.
    pub fn broadcast(&self, frame: &Frame, except: Option<ConnectionId>) -> usize {
        self.peers
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .filter(|(_, peer)| peer.outbound.send(Arc::clone(frame)).is_ok())
            .count()
    }

    /// Distinct identities currently bound, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .peers
            .values()
            .filter_map(|peer| peer.sender_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Drop every connection. Their outbound queues close, which ends the
    /// socket tasks on the other side.
    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
