//! Room fan-out with bounded per-member buffers.
//!
//! Uses tokio broadcast channels so one send reaches every member.
//! Each member gets an independent receiver that buffers up to `capacity`
//! frames; a member that falls further behind loses the oldest frames.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::protocol::{ProtocolError, ServerEvent};

/// A connection that joined a room.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerInfo {
    pub peer_id: Uuid,
    pub remote_addr: Option<SocketAddr>,
}

impl PeerInfo {
    pub fn new(peer_id: Uuid, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            peer_id,
            remote_addr,
        }
    }

    /// Peer with a fresh id and no address (tests, local tools).
    pub fn anonymous() -> Self {
        Self::new(Uuid::new_v4(), None)
    }
}

/// An encoded server event plus the connection that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomFrame {
    /// `None` for server-originated frames, which every member receives
    pub origin: Option<Uuid>,
    pub text: String,
}

impl RoomFrame {
    pub fn new(origin: Option<Uuid>, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
        }
    }

    /// Whether this frame should be withheld from `peer_id`.
    pub fn is_from(&self, peer_id: Uuid) -> bool {
        self.origin == Some(peer_id)
    }
}

/// Statistics for monitoring broadcast health.
#[derive(Debug, Clone, Default)]
pub struct BroadcastStats {
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub active_peers: usize,
}

struct AtomicBroadcastStats {
    messages_sent: AtomicU64,
    messages_dropped: AtomicU64,
}

impl AtomicBroadcastStats {
    fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }
}

/// Broadcast group for a single room.
pub struct BroadcastGroup {
    sender: broadcast::Sender<Arc<RoomFrame>>,

    /// Members of this room
    peers: Arc<RwLock<HashMap<Uuid, PeerInfo>>>,

    atomic_stats: Arc<AtomicBroadcastStats>,
}

impl BroadcastGroup {
    /// Create a new broadcast group with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            peers: Arc::new(RwLock::new(HashMap::new())),
            atomic_stats: Arc::new(AtomicBroadcastStats::new()),
        }
    }

    /// Add a member and return its receiver.
    pub async fn add_peer(&self, info: PeerInfo) -> broadcast::Receiver<Arc<RoomFrame>> {
        let mut peers = self.peers.write().await;
        peers.insert(info.peer_id, info);
        self.sender.subscribe()
    }

    pub async fn remove_peer(&self, peer_id: &Uuid) -> Option<PeerInfo> {
        let mut peers = self.peers.write().await;
        peers.remove(peer_id)
    }

    /// Encode `event` once and send it to every receiver.
    ///
    /// Returns the number of receivers reached. Skipping the origin is
    /// the receiver's job (see [`RoomFrame::is_from`]).
    pub fn broadcast(
        &self,
        event: &ServerEvent,
        origin: Option<Uuid>,
    ) -> Result<usize, ProtocolError> {
        let text = event.encode()?;
        Ok(self.broadcast_raw(Arc::new(RoomFrame::new(origin, text))))
    }

    /// Send an already-encoded frame.
    pub fn broadcast_raw(&self, frame: Arc<RoomFrame>) -> usize {
        let count = self.sender.send(frame).unwrap_or(0);
        self.atomic_stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Record frames a lagging receiver skipped.
    pub fn record_dropped(&self, count: u64) {
        self.atomic_stats
            .messages_dropped
            .fetch_add(count, Ordering::Relaxed);
    }

    pub async fn stats(&self) -> BroadcastStats {
        let peers = self.peers.read().await;
        BroadcastStats {
            messages_sent: self.atomic_stats.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.atomic_stats.messages_dropped.load(Ordering::Relaxed),
            active_peers: peers.len(),
        }
    }
}

/// Maps room ids to broadcast groups.
///
/// Each room gets its own group so frames never cross rooms.
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<String, Arc<BroadcastGroup>>>>,
    default_capacity: usize,
}

impl RoomManager {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            default_capacity,
        }
    }

    /// Existing group for `room_id`, if anyone ever joined it.
    pub async fn get(&self, room_id: &str) -> Option<Arc<BroadcastGroup>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Add `info` to the room, creating it if needed.
    ///
    /// Runs under the manager's write lock so a concurrent
    /// [`RoomManager::leave`] cannot drop the group in between.
    pub async fn join(
        &self,
        room_id: &str,
        info: PeerInfo,
    ) -> (Arc<BroadcastGroup>, broadcast::Receiver<Arc<RoomFrame>>) {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                log::debug!("Room {room_id} opened");
                Arc::new(BroadcastGroup::new(self.default_capacity))
            })
            .clone();
        let rx = room.add_peer(info).await;
        (room, rx)
    }

    /// Remove `peer_id` from the room; drops the room once empty.
    ///
    /// Returns `true` if the room was removed.
    pub async fn leave(&self, room_id: &str, peer_id: &Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(room_id) else {
            return false;
        };
        room.remove_peer(peer_id).await;
        let stats = room.stats().await;
        if stats.active_peers == 0 {
            rooms.remove(room_id);
            log::debug!(
                "Room {room_id} closed (empty) after {} frames, {} dropped",
                stats.messages_sent,
                stats.messages_dropped
            );
            return true;
        }
        false
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
