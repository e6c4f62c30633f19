//! Connection registry: the bidirectional connection ↔ room index.
//!
//! Both halves of the index sit behind one `RwLock`, so every join, leave and
//! removal is applied atomically and readers never see a connection listed in
//! a room that is missing from its own room set (or vice versa). No lock is
//! ever held across an `.await`; delivery uses non-blocking `try_send`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::error::RelayError;

use super::events::ServerEvent;
use super::room::RoomKey;

/// Per-connection outbound queue depth. Events for a client that falls this
/// far behind are dropped.
pub const OUTBOUND_CAPACITY: usize = 256;

pub type Outbound = mpsc::Sender<Arc<ServerEvent>>;
pub type OutboundReceiver = mpsc::Receiver<Arc<ServerEvent>>;

/// Per-connection state.
struct ConnectionEntry {
    rooms: HashSet<RoomKey>,
    /// `None` for connections that joined without a transport attached.
    outbound: Option<Outbound>,
}

impl ConnectionEntry {
    fn detached() -> Self {
        Self {
            rooms: HashSet::new(),
            outbound: None,
        }
    }
}

#[derive(Default)]
struct Index {
    connections: HashMap<String, ConnectionEntry>,
    rooms: HashMap<RoomKey, HashSet<String>>,
}

impl Index {
    fn deliver(&self, connection_id: &str, event: &Arc<ServerEvent>) -> bool {
        let Some(outbound) = self
            .connections
            .get(connection_id)
            .and_then(|c| c.outbound.as_ref())
        else {
            return false;
        };

        match outbound.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    %connection_id,
                    event = event.name(),
                    "outbound queue full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(%connection_id, "outbound queue closed");
                false
            }
        }
    }
}

/// Live connections and their room memberships.
pub struct ConnectionRegistry {
    index: RwLock<Index>,
    shut_down: AtomicBool,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Index::default()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Attach a transport to `connection_id` and return the receiving end of
    /// its outbound queue. Re-registering replaces the previous queue.
    pub fn register(&self, connection_id: &str) -> Result<OutboundReceiver, RelayError> {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let mut index = self.index.write();
        // Checked under the write lock so `shutdown` cannot interleave.
        if self.shut_down.load(Ordering::Acquire) {
            return Err(RelayError::ShuttingDown);
        }
        index
            .connections
            .entry(connection_id.to_string())
            .or_insert_with(ConnectionEntry::detached)
            .outbound = Some(tx);
        Ok(rx)
    }

    /// Add `connection_id` to `room`. Returns `false` if it was already a member.
    pub fn join(&self, connection_id: &str, room: &RoomKey) -> bool {
        let mut index = self.index.write();
        let added = index
            .connections
            .entry(connection_id.to_string())
            .or_insert_with(ConnectionEntry::detached)
            .rooms
            .insert(room.clone());
        if added {
            index
                .rooms
                .entry(room.clone())
                .or_default()
                .insert(connection_id.to_string());
        }
        added
    }

    /// Remove `connection_id` from `room`. Returns `false` if it was not a member.
    pub fn leave(&self, connection_id: &str, room: &RoomKey) -> bool {
        let mut index = self.index.write();
        let removed = index
            .connections
            .get_mut(connection_id)
            .is_some_and(|c| c.rooms.remove(room));
        if removed {
            detach_member(&mut index.rooms, room, connection_id);
        }
        removed
    }

    /// Drop a connection and every membership it held. Returns the rooms it
    /// was removed from; empty when the connection was unknown.
    pub fn remove_connection(&self, connection_id: &str) -> Vec<RoomKey> {
        let mut index = self.index.write();
        let Some(entry) = index.connections.remove(connection_id) else {
            return Vec::new();
        };
        let rooms: Vec<RoomKey> = entry.rooms.into_iter().collect();
        for room in &rooms {
            detach_member(&mut index.rooms, room, connection_id);
        }
        rooms
    }

    pub fn members_of(&self, room: &RoomKey) -> HashSet<String> {
        self.index.read().rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn excluding_sender(&self, room: &RoomKey, sender: &str) -> HashSet<String> {
        let index = self.index.read();
        index
            .rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter(|id| id.as_str() != sender)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection_id: &str) -> HashSet<RoomKey> {
        self.index
            .read()
            .connections
            .get(connection_id)
            .map(|c| c.rooms.clone())
            .unwrap_or_default()
    }

    /// Deliver `event` to every member of `room` except `exclude`.
    ///
    /// Membership is read under the same lock as delivery. Returns the number
    /// of connections the event was queued for.
    pub fn broadcast(&self, room: &RoomKey, event: ServerEvent, exclude: Option<&str>) -> usize {
        let event = Arc::new(event);
        let index = self.index.read();
        let Some(members) = index.rooms.get(room) else {
            return 0;
        };
        members
            .iter()
            .filter(|id| Some(id.as_str()) != exclude)
            .filter(|id| index.deliver(id, &event))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.index.read().connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.index.read().rooms.len()
    }

    /// Close every outbound queue and refuse new registrations. Connection
    /// tasks observe their queue closing and end the socket. Idempotent.
    pub fn shutdown(&self) -> usize {
        let mut index = self.index.write();
        self.shut_down.store(true, Ordering::Release);
        let closed = index.connections.len();
        index.connections.clear();
        index.rooms.clear();
        closed
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

fn detach_member(rooms: &mut HashMap<RoomKey, HashSet<String>>, room: &RoomKey, connection_id: &str) {
    if let Some(members) = rooms.get_mut(room) {
        members.remove(connection_id);
        if members.is_empty() {
            rooms.remove(room);
        }
    }
}
