//! WebSocket relay server with room-scoped broadcast and board persistence.
//!
//! Architecture:
//! ```text
//! Client A ──┐                  ┌── BroadcastGroup ──► other members
//!            ├── Room (roomId) ─┤
//! Client B ──┘                  └── BoardStore (RocksDB)
//!                                       │
//!                                       └── load-board on join
//! ```
//!
//! Each connection keeps:
//! - one forwarder task per joined room, copying room frames into the
//!   connection's outbox while skipping frames it originated
//! - the outbox itself, drained by the connection loop into the socket
//!
//! Persistence is best-effort: failures are logged and counted, never
//! reported to clients.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use collabboard_core::validate_room_id;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::broadcast::{BroadcastGroup, PeerInfo, RoomFrame, RoomManager};
use crate::protocol::{ClientEvent, DrawRequest, ProtocolError, ServerEvent};
use crate::storage::{BoardStore, StoreConfig, StoreError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Broadcast channel capacity per room
    pub broadcast_capacity: usize,
    /// Frames queued per connection before room forwarders wait
    pub outbox_capacity: usize,
    /// Origins allowed to open a socket (empty = any)
    pub allowed_origins: Vec<String>,
    /// Persistence storage path (None = relay only)
    pub storage_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5001".to_string(),
            broadcast_capacity: 256,
            outbox_capacity: 256,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            storage_path: None,
        }
    }
}

/// Server statistics.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub total_events: u64,
    pub strokes_relayed: u64,
    pub strokes_persisted: u64,
    pub boards_cleared: u64,
    pub persist_failures: u64,
    pub rejected_frames: u64,
    pub active_rooms: usize,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ServerError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ServerError::WebSocket(Box::new(e))
    }
}

/// Whether a handshake carrying `origin` may connect.
///
/// Requests without an `Origin` header come from non-browser clients and
/// are always accepted.
pub fn origin_allowed(origin: Option<&str>, allowed: &[String]) -> bool {
    match origin {
        None => true,
        Some(_) if allowed.is_empty() => true,
        Some(origin) => allowed.iter().any(|a| a == origin || a == "*"),
    }
}

/// Per-connection state.
struct Session {
    peer: PeerInfo,
    outbox: mpsc::Sender<String>,
    /// Joined rooms and their forwarder tasks
    rooms: HashMap<String, JoinHandle<()>>,
}

impl Session {
    fn new(peer: PeerInfo, outbox: mpsc::Sender<String>) -> Self {
        Self {
            peer,
            outbox,
            rooms: HashMap::new(),
        }
    }

    fn peer_id(&self) -> Uuid {
        self.peer.peer_id
    }
}

/// Shared state handed to every connection task.
#[derive(Clone)]
struct RelayContext {
    config: Arc<ServerConfig>,
    rooms: Arc<RoomManager>,
    stats: Arc<RwLock<ServerStats>>,
    store: Option<Arc<BoardStore>>,
}

impl RelayContext {
    async fn bump(&self, f: impl FnOnce(&mut ServerStats)) {
        let mut stats = self.stats.write().await;
        f(&mut stats);
    }

    /// Decode and dispatch one text frame. Returns a reply for this
    /// connection only, if the event produces one.
    async fn handle_text(&self, session: &mut Session, text: &str) -> Option<ServerEvent> {
        let event = match ClientEvent::decode(text) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Ignoring malformed frame from peer {}: {e}", session.peer_id());
                self.bump(|s| s.rejected_frames += 1).await;
                return None;
            }
        };

        if let Err(e) = validate_room_id(event.room_id()) {
            log::warn!(
                "Ignoring {} from peer {}: {e}",
                event.name(),
                session.peer_id()
            );
            self.bump(|s| s.rejected_frames += 1).await;
            return None;
        }

        self.bump(|s| s.total_events += 1).await;
        self.handle_event(session, event).await
    }

    async fn handle_event(&self, session: &mut Session, event: ClientEvent) -> Option<ServerEvent> {
        match event {
            ClientEvent::JoinRoom(room_id) => self.join_room(session, &room_id).await,
            ClientEvent::Draw(request) => {
                self.relay_draw(session, request).await;
                None
            }
            ClientEvent::ClearBoard(room_id) => {
                self.clear_board(session, &room_id).await;
                None
            }
        }
    }

    /// Join a room and return its persisted history, if any.
    async fn join_room(&self, session: &mut Session, room_id: &str) -> Option<ServerEvent> {
        if !session.rooms.contains_key(room_id) {
            let (group, rx) = self.rooms.join(room_id, session.peer.clone()).await;
            let forwarder = tokio::spawn(forward_frames(
                rx,
                group,
                session.peer_id(),
                session.outbox.clone(),
            ));
            session.rooms.insert(room_id.to_string(), forwarder);

            let room_count = self.rooms.room_count().await;
            self.bump(|s| s.active_rooms = room_count).await;
            log::info!("Peer {} joined room {room_id}", session.peer_id());
        }

        let store = self.store.as_ref()?;
        match store.load_board(room_id) {
            Ok(Some(board)) => {
                log::debug!(
                    "Replaying {} strokes of room {room_id} to peer {}",
                    board.actions.len(),
                    session.peer_id()
                );
                Some(ServerEvent::LoadBoard(board.actions))
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to load board for room {room_id}: {e}");
                self.bump(|s| s.persist_failures += 1).await;
                None
            }
        }
    }

    /// Relay to the other members, then append to the room's board.
    async fn relay_draw(&self, session: &Session, request: DrawRequest) {
        let DrawRequest { room_id, action } = request;

        if let Some(group) = self.rooms.get(&room_id).await {
            match group.broadcast(&ServerEvent::Draw(action.clone()), Some(session.peer_id())) {
                Ok(_) => self.bump(|s| s.strokes_relayed += 1).await,
                Err(e) => log::warn!("Failed to relay stroke in room {room_id}: {e}"),
            }
        }

        if let Some(store) = &self.store {
            match store.append_action(&room_id, &action) {
                Ok(_) => self.bump(|s| s.strokes_persisted += 1).await,
                Err(e) => {
                    log::error!("Failed to persist stroke for room {room_id}: {e}");
                    self.bump(|s| s.persist_failures += 1).await;
                }
            }
        }
    }

    /// Empty the persisted board, then tell every member (sender included).
    async fn clear_board(&self, session: &Session, room_id: &str) {
        if let Some(store) = &self.store {
            match store.clear_board(room_id) {
                Ok(true) => {
                    log::info!("Peer {} cleared room {room_id}", session.peer_id());
                    self.bump(|s| s.boards_cleared += 1).await;
                }
                Ok(false) => log::debug!("Clear for room {room_id} without a board"),
                Err(e) => {
                    log::error!("Failed to clear board for room {room_id}: {e}");
                    self.bump(|s| s.persist_failures += 1).await;
                }
            }
        }

        if let Some(group) = self.rooms.get(room_id).await {
            if let Err(e) = group.broadcast(&ServerEvent::ClearBoard, None) {
                log::warn!("Failed to relay clear in room {room_id}: {e}");
            }
        }
    }

    /// Leave every joined room; empty rooms are dropped.
    async fn leave_all(&self, session: &mut Session) {
        let peer_id = session.peer_id();
        for (room_id, forwarder) in session.rooms.drain() {
            forwarder.abort();
            self.rooms.leave(&room_id, &peer_id).await;
            log::debug!("Peer {peer_id} left room {room_id}");
        }
        let room_count = self.rooms.room_count().await;
        self.bump(|s| s.active_rooms = room_count).await;
    }
}

/// Copy room frames into a connection's outbox until either side closes.
async fn forward_frames(
    mut rx: broadcast::Receiver<Arc<RoomFrame>>,
    group: Arc<BroadcastGroup>,
    peer_id: Uuid,
    outbox: mpsc::Sender<String>,
) {
    loop {
        match rx.recv().await {
            Ok(frame) => {
                if frame.is_from(peer_id) {
                    continue;
                }
                if outbox.send(frame.text.clone()).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(n)) => {
                log::warn!("Peer {peer_id} lagged by {n} frames");
                group.record_dropped(n);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// The relay server.
pub struct BoardServer {
    ctx: RelayContext,
}

impl BoardServer {
    /// Create a server, opening the board store if a path is configured.
    pub fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let store = match &config.storage_path {
            Some(path) => Some(Arc::new(BoardStore::open(StoreConfig::at(path.clone()))?)),
            None => None,
        };
        Ok(Self::assemble(config, store))
    }

    /// Create a server around an already-open store.
    pub fn with_store(config: ServerConfig, store: Arc<BoardStore>) -> Self {
        Self::assemble(config, Some(store))
    }

    /// Relay-only server with default configuration.
    pub fn with_defaults() -> Self {
        Self::assemble(ServerConfig::default(), None)
    }

    /// Create with persistence enabled at the given path.
    pub fn with_storage(
        bind_addr: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        Self::new(ServerConfig {
            bind_addr: bind_addr.into(),
            storage_path: Some(path.into()),
            ..ServerConfig::default()
        })
    }

    fn assemble(config: ServerConfig, store: Option<Arc<BoardStore>>) -> Self {
        let rooms = Arc::new(RoomManager::new(config.broadcast_capacity));
        Self {
            ctx: RelayContext {
                config: Arc::new(config),
                rooms,
                stats: Arc::new(RwLock::new(ServerStats::default())),
                store,
            },
        }
    }

    /// Bind the configured address and serve until an accept error.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.ctx.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        if let Some(store) = &self.ctx.store {
            let boards = store.list_boards()?;
            log::info!("{} persisted boards available for replay", boards.len());
        }
        log::info!("Board server listening on {}", listener.local_addr()?);

        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("New TCP connection from {addr}");

            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, ctx).await {
                    log::error!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handle a single WebSocket connection.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        ctx: RelayContext,
    ) -> Result<(), ServerError> {
        let allowed = ctx.config.allowed_origins.clone();
        let check_origin = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let origin = req
                .headers()
                .get("origin")
                .and_then(|value| value.to_str().ok());
            if origin_allowed(origin, &allowed) {
                Ok(resp)
            } else {
                log::warn!("Refusing socket from {addr}: origin {origin:?} not allowed");
                let mut refusal = ErrorResponse::new(Some("Origin not allowed".to_string()));
                *refusal.status_mut() = StatusCode::FORBIDDEN;
                Err(refusal)
            }
        };

        let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_origin).await?;

        let (outbox_tx, outbox_rx) = mpsc::channel(ctx.config.outbox_capacity.max(1));
        let mut session = Session::new(PeerInfo::new(Uuid::new_v4(), Some(addr)), outbox_tx);
        log::info!("Peer {} connected from {addr}", session.peer_id());

        ctx.bump(|s| {
            s.total_connections += 1;
            s.active_connections += 1;
        })
        .await;

        let result = Self::pump(ws_stream, outbox_rx, &mut session, &ctx).await;

        ctx.leave_all(&mut session).await;
        ctx.bump(|s| s.active_connections = s.active_connections.saturating_sub(1))
            .await;
        log::info!("Peer {} disconnected", session.peer_id());

        result
    }

    /// Move frames between the socket, the relay and the outbox until the
    /// socket closes.
    async fn pump(
        ws_stream: tokio_tungstenite::WebSocketStream<TcpStream>,
        mut outbox_rx: mpsc::Receiver<String>,
        session: &mut Session,
        ctx: &RelayContext,
    ) -> Result<(), ServerError> {
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = ctx.handle_text(session, text.as_str()).await {
                                let encoded = reply.encode()?;
                                ws_sender.send(Message::Text(encoded.into())).await?;
                            }
                        }

                        Some(Ok(Message::Binary(_))) => {
                            log::debug!("Ignoring binary frame from peer {}", session.peer_id());
                        }

                        Some(Ok(Message::Ping(data))) => {
                            ws_sender.send(Message::Pong(data)).await?;
                        }

                        Some(Ok(Message::Close(_))) | None => break,

                        Some(Err(e)) => {
                            log::warn!("WebSocket error from peer {}: {e}", session.peer_id());
                            break;
                        }

                        _ => {}
                    }
                }

                Some(text) = outbox_rx.recv() => {
                    ws_sender.send(Message::Text(text.into())).await?;
                }
            }
        }

        Ok(())
    }

    pub async fn stats(&self) -> ServerStats {
        self.ctx.stats.read().await.clone()
    }

    pub fn bind_addr(&self) -> &str {
        &self.ctx.config.bind_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.ctx.config
    }

    pub fn room_manager(&self) -> &Arc<RoomManager> {
        &self.ctx.rooms
    }

    /// The board store, if persistence is enabled.
    pub fn store(&self) -> Option<&Arc<BoardStore>> {
        self.ctx.store.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabboard_core::StrokeSegment;
    use tokio::time::{timeout, Duration};

    fn seg(x: f64) -> StrokeSegment {
        StrokeSegment::new((x, 0.0), (x, 5.0), "#ff0000", 2.0)
    }

    fn session() -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        (Session::new(PeerInfo::anonymous(), tx), rx)
    }

    async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Option<ServerEvent> {
        let text = timeout(Duration::from_millis(200), rx.recv()).await.ok()??;
        ServerEvent::decode(&text).ok()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:5001");
        assert_eq!(config.broadcast_capacity, 256);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_server_creation() {
        let server = BoardServer::with_defaults();
        assert_eq!(server.bind_addr(), "0.0.0.0:5001");
        assert!(server.store().is_none());
    }

    #[test]
    fn test_server_with_storage() {
        let dir = tempfile::tempdir().unwrap();
        let server = BoardServer::with_storage("127.0.0.1:0", dir.path().join("db")).unwrap();
        assert!(server.store().is_some());
    }

    #[test]
    fn test_origin_allowed() {
        let allowed = vec!["http://localhost:3000".to_string()];
        assert!(origin_allowed(None, &allowed));
        assert!(origin_allowed(Some("http://localhost:3000"), &allowed));
        assert!(!origin_allowed(Some("http://evil.example"), &allowed));
        assert!(origin_allowed(Some("http://anything"), &[]));
        assert!(origin_allowed(Some("http://anything"), &["*".to_string()]));
    }

    #[tokio::test]
    async fn test_server_stats_initial() {
        let stats = BoardServer::with_defaults().stats().await;
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.strokes_relayed, 0);
        assert_eq!(stats.active_rooms, 0);
    }

    #[tokio::test]
    async fn test_draw_skips_sender() {
        let server = BoardServer::with_defaults();
        let ctx = &server.ctx;
        let (mut alice, mut alice_rx) = session();
        let (mut bob, mut bob_rx) = session();

        assert!(ctx.handle_event(&mut alice, ClientEvent::join_room("r")).await.is_none());
        assert!(ctx.handle_event(&mut bob, ClientEvent::join_room("r")).await.is_none());

        ctx.handle_event(&mut alice, ClientEvent::draw("r", seg(1.0))).await;

        assert_eq!(next_frame(&mut bob_rx).await, Some(ServerEvent::Draw(seg(1.0))));
        assert_eq!(next_frame(&mut alice_rx).await, None);
        assert_eq!(server.stats().await.strokes_relayed, 1);
    }

    #[tokio::test]
    async fn test_clear_reaches_sender() {
        let server = BoardServer::with_defaults();
        let ctx = &server.ctx;
        let (mut alice, mut alice_rx) = session();

        ctx.handle_event(&mut alice, ClientEvent::join_room("r")).await;
        ctx.handle_event(&mut alice, ClientEvent::clear_board("r")).await;

        assert_eq!(next_frame(&mut alice_rx).await, Some(ServerEvent::ClearBoard));
    }

    #[tokio::test]
    async fn test_join_replays_persisted_board() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BoardStore::open(StoreConfig::for_testing(dir.path())).unwrap());
        store.append_action("r", &seg(1.0)).unwrap();
        store.append_action("r", &seg(2.0)).unwrap();

        let server = BoardServer::with_store(ServerConfig::default(), store);
        let (mut alice, _alice_rx) = session();

        let reply = server.ctx.handle_event(&mut alice, ClientEvent::join_room("r")).await;
        assert_eq!(reply, Some(ServerEvent::LoadBoard(vec![seg(1.0), seg(2.0)])));

        // Unknown rooms get nothing
        let reply = server.ctx.handle_event(&mut alice, ClientEvent::join_room("empty")).await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_draw_persists_without_membership() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BoardStore::open(StoreConfig::for_testing(dir.path())).unwrap());
        let server = BoardServer::with_store(ServerConfig::default(), store.clone());
        let (mut alice, _alice_rx) = session();

        server.ctx.handle_event(&mut alice, ClientEvent::draw("solo", seg(3.0))).await;

        assert_eq!(store.load_actions("solo").unwrap(), vec![seg(3.0)]);
        let stats = server.stats().await;
        assert_eq!(stats.strokes_persisted, 1);
        assert_eq!(stats.strokes_relayed, 0);
    }

    #[tokio::test]
    async fn test_malformed_and_invalid_frames_counted() {
        let server = BoardServer::with_defaults();
        let (mut alice, _rx) = session();

        assert!(server.ctx.handle_text(&mut alice, "garbage").await.is_none());
        assert!(server
            .ctx
            .handle_text(&mut alice, r#"{"event":"join-room","data":""}"#)
            .await
            .is_none());

        let stats = server.stats().await;
        assert_eq!(stats.rejected_frames, 2);
        assert_eq!(stats.total_events, 0);
        assert!(alice.rooms.is_empty());
    }

    #[tokio::test]
    async fn test_leave_all_closes_empty_rooms() {
        let server = BoardServer::with_defaults();
        let (mut alice, _rx) = session();

        server.ctx.handle_event(&mut alice, ClientEvent::join_room("a")).await;
        server.ctx.handle_event(&mut alice, ClientEvent::join_room("b")).await;
        // Joining twice is a no-op
        server.ctx.handle_event(&mut alice, ClientEvent::join_room("a")).await;
        assert_eq!(alice.rooms.len(), 2);
        assert_eq!(server.stats().await.active_rooms, 2);

        server.ctx.leave_all(&mut alice).await;
        assert_eq!(server.room_manager().room_count().await, 0);
        assert_eq!(server.stats().await.active_rooms, 0);
    }

    #[tokio::test]
    async fn test_lagging_member_counts_dropped_frames() {
        let server = BoardServer::new(ServerConfig {
            broadcast_capacity: 2,
            ..ServerConfig::default()
        })
        .unwrap();
        let ctx = &server.ctx;

        // Alice's outbox holds one frame and nobody reads it yet
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let mut alice = Session::new(PeerInfo::anonymous(), slow_tx);
        let (mut bob, _bob_rx) = session();
        ctx.handle_event(&mut alice, ClientEvent::join_room("r")).await;
        ctx.handle_event(&mut bob, ClientEvent::join_room("r")).await;

        for i in 0..10 {
            ctx.handle_event(&mut bob, ClientEvent::draw("r", seg(i as f64))).await;
        }

        let group = server.room_manager().get("r").await.unwrap();
        let mut dropped = 0;
        for _ in 0..20 {
            while slow_rx.try_recv().is_ok() {}
            tokio::time::sleep(Duration::from_millis(20)).await;
            dropped = group.stats().await.messages_dropped;
            if dropped > 0 {
                break;
            }
        }
        assert!(dropped > 0, "Lagging member should record dropped frames");
        assert_eq!(group.stats().await.messages_sent, 10);
    }

    #[tokio::test]
    async fn test_persist_failure_still_relays() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = BoardStore::open(StoreConfig::for_testing(dir.path())).unwrap();
            store.append_action("r", &seg(0.0)).unwrap();
        }
        // Every write to a read-only store fails
        let store = Arc::new(BoardStore::open(StoreConfig::read_only_at(dir.path())).unwrap());
        let server = BoardServer::with_store(ServerConfig::default(), store.clone());
        let ctx = &server.ctx;
        let (mut alice, mut alice_rx) = session();
        let (mut bob, mut bob_rx) = session();

        ctx.handle_event(&mut alice, ClientEvent::join_room("r")).await;
        ctx.handle_event(&mut bob, ClientEvent::join_room("r")).await;

        ctx.handle_event(&mut alice, ClientEvent::draw("r", seg(1.0))).await;
        assert_eq!(next_frame(&mut bob_rx).await, Some(ServerEvent::Draw(seg(1.0))));

        ctx.handle_event(&mut alice, ClientEvent::clear_board("r")).await;
        assert_eq!(next_frame(&mut alice_rx).await, Some(ServerEvent::ClearBoard));
        assert_eq!(next_frame(&mut bob_rx).await, Some(ServerEvent::ClearBoard));

        let stats = server.stats().await;
        assert_eq!(stats.strokes_relayed, 1);
        assert_eq!(stats.strokes_persisted, 0);
        assert_eq!(stats.boards_cleared, 0);
        assert_eq!(stats.persist_failures, 2);
        assert_eq!(store.load_actions("r").unwrap(), vec![seg(0.0)]);
    }
}
