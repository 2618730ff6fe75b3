//! WebSocket client for the board relay.
//!
//! Provides:
//! - Connection lifecycle (connect, disconnect)
//! - `join-room`, `draw` and `clear-board` emits
//! - Incoming board events as a channel of [`BoardEvent`]
//! - Offline queue: emits made while disconnected are flushed on connect

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use collabboard_core::StrokeSegment;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{ClientEvent, ProtocolError, ServerEvent};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events surfaced to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    Connected,
    Disconnected,
    /// History of a joined room
    BoardLoaded(Vec<StrokeSegment>),
    /// A segment drawn by another client
    RemoteDraw(StrokeSegment),
    /// Someone cleared a joined room
    BoardCleared,
}

impl From<ServerEvent> for BoardEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::LoadBoard(actions) => BoardEvent::BoardLoaded(actions),
            ServerEvent::Draw(action) => BoardEvent::RemoteDraw(action),
            ServerEvent::ClearBoard => BoardEvent::BoardCleared,
        }
    }
}

/// Encoded emits waiting for a connection, oldest first.
pub struct OfflineQueue {
    queue: VecDeque<String>,
    max_size: usize,
}

impl OfflineQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Queue a frame. Returns `false` when full.
    pub fn enqueue(&mut self, frame: String) -> bool {
        if self.queue.len() >= self.max_size {
            return false;
        }
        self.queue.push_back(frame);
        true
    }

    pub fn drain(&mut self) -> Vec<String> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// The board client.
///
/// Holds one WebSocket connection to the relay server. Emits go through
/// the offline queue whenever the client is not connected.
pub struct BoardClient {
    server_url: String,

    state: Arc<RwLock<ConnectionState>>,

    /// Also serializes emits against the flush on connect
    offline_queue: Arc<Mutex<OfflineQueue>>,

    /// Channel to the WebSocket writer task
    outgoing_tx: Option<mpsc::Sender<String>>,

    /// Reader task of the current socket
    reader: Option<JoinHandle<()>>,

    /// Bumped whenever a socket is retired; a reader only touches `state`
    /// while its generation is current
    generation: Arc<AtomicU64>,

    event_rx: Option<mpsc::Receiver<BoardEvent>>,

    event_tx: mpsc::Sender<BoardEvent>,
}

impl BoardClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_queue_limit(server_url, 10_000)
    }

    pub fn with_queue_limit(server_url: impl Into<String>, max_queued: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            server_url: server_url.into(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            offline_queue: Arc::new(Mutex::new(OfflineQueue::new(max_queued))),
            outgoing_tx: None,
            reader: None,
            generation: Arc::new(AtomicU64::new(0)),
            event_rx: Some(event_rx),
            event_tx,
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<BoardEvent>> {
        self.event_rx.take()
    }

    /// Connect to the server and flush queued emits.
    ///
    /// Spawns background tasks for reading and writing the socket.
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        let generation = self.retire_socket().await;
        *self.state.write().await = ConnectionState::Connecting;

        let ws_stream = match tokio_tungstenite::connect_async(self.server_url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ProtocolError::ConnectionFailed(e.to_string()));
            }
        };
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Writer task: forward outgoing channel to the socket, close when the
        // channel is dropped.
        let (out_tx, mut out_rx) = mpsc::channel::<String>(256);
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if ws_writer.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            let _ = ws_writer.send(Message::Close(None)).await;
        });

        // Reader task: surface server events until the socket closes.
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        let current = self.generation.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match ServerEvent::decode(text.as_str()) {
                        Ok(event) => {
                            if event_tx.send(event.into()).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("Ignoring malformed server frame: {e}"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }

            let mut state = state.write().await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            *state = ConnectionState::Disconnected;
            drop(state);
            let _ = event_tx.send(BoardEvent::Disconnected).await;
        });
        self.reader = Some(reader);

        // Flush under the queue lock so concurrent emits land after it
        {
            let mut queue = self.offline_queue.lock().await;
            let queued = queue.drain();
            if !queued.is_empty() {
                log::info!("Replaying {} queued events", queued.len());
            }
            for frame in queued {
                out_tx
                    .send(frame)
                    .await
                    .map_err(|_| ProtocolError::ConnectionClosed)?;
            }
            self.outgoing_tx = Some(out_tx);
            *self.state.write().await = ConnectionState::Connected;
        }

        let _ = self.event_tx.send(BoardEvent::Connected).await;
        Ok(())
    }

    /// Close the connection. Later emits are queued again.
    pub async fn disconnect(&mut self) {
        self.retire_socket().await;
    }

    /// Drop the current socket, if any, so its tasks can no longer change
    /// the client state. Returns the generation for the next socket.
    async fn retire_socket(&mut self) -> u64 {
        let mut state = self.state.write().await;
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        // Dropping the sender makes the writer send a close frame
        let was_connected = self.outgoing_tx.take().is_some()
            && *state == ConnectionState::Connected;
        *state = ConnectionState::Disconnected;
        drop(state);

        if was_connected {
            let _ = self.event_tx.send(BoardEvent::Disconnected).await;
        }
        next
    }

    pub async fn join_room(&self, room_id: impl Into<String>) -> Result<(), ProtocolError> {
        self.emit(&ClientEvent::join_room(room_id)).await
    }

    pub async fn draw(
        &self,
        room_id: impl Into<String>,
        action: StrokeSegment,
    ) -> Result<(), ProtocolError> {
        self.emit(&ClientEvent::draw(room_id, action)).await
    }

    pub async fn clear_board(&self, room_id: impl Into<String>) -> Result<(), ProtocolError> {
        self.emit(&ClientEvent::clear_board(room_id)).await
    }

    /// Send an event now, or queue it while not connected.
    pub async fn emit(&self, event: &ClientEvent) -> Result<(), ProtocolError> {
        let encoded = event.encode()?;
        let mut queue = self.offline_queue.lock().await;

        let state = *self.state.read().await;
        match (&self.outgoing_tx, state) {
            (Some(tx), ConnectionState::Connected) => tx
                .send(encoded)
                .await
                .map_err(|_| ProtocolError::ConnectionClosed),
            _ => {
                if queue.enqueue(encoded) {
                    Ok(())
                } else {
                    Err(ProtocolError::OfflineQueueFull)
                }
            }
        }
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn offline_queue_len(&self) -> usize {
        self.offline_queue.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg() -> StrokeSegment {
        StrokeSegment::new((0.0, 0.0), (1.0, 1.0), "#4f46e5", 4.0)
    }

    #[test]
    fn test_client_creation() {
        let client = BoardClient::new("ws://localhost:5001");
        assert_eq!(client.server_url(), "ws://localhost:5001");
    }

    #[tokio::test]
    async fn test_client_initial_state() {
        let client = BoardClient::new("ws://localhost:5001");
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
        assert_eq!(client.offline_queue_len().await, 0);
    }

    #[tokio::test]
    async fn test_emits_queue_while_offline() {
        let client = BoardClient::new("ws://localhost:5001");

        client.join_room("default").await.unwrap();
        client.draw("default", seg()).await.unwrap();
        client.clear_board("default").await.unwrap();

        assert_eq!(client.offline_queue_len().await, 3);
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let client = BoardClient::with_queue_limit("ws://localhost:5001", 1);
        client.join_room("default").await.unwrap();
        assert_eq!(
            client.draw("default", seg()).await,
            Err(ProtocolError::OfflineQueueFull)
        );
    }

    #[tokio::test]
    async fn test_connect_failure_resets_state() {
        // Port 1 is never a board server
        let mut client = BoardClient::new("ws://127.0.0.1:1");
        let result = client.connect().await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
    }

    #[test]
    fn test_offline_queue() {
        let mut queue = OfflineQueue::new(100);
        assert!(queue.is_empty());

        queue.enqueue("abc".into());
        queue.enqueue("defg".into());
        assert_eq!(queue.len(), 2);

        // Oldest first
        assert_eq!(queue.drain(), vec!["abc".to_string(), "defg".to_string()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_offline_queue_capacity() {
        let mut queue = OfflineQueue::new(2);
        assert!(queue.enqueue("1".into()));
        assert!(queue.enqueue("2".into()));
        assert!(!queue.enqueue("3".into()));
        assert_eq!(queue.len(), 2);

        // Draining frees room again
        queue.drain();
        assert!(queue.enqueue("3".into()));
    }

    #[test]
    fn test_server_event_mapping() {
        assert_eq!(BoardEvent::from(ServerEvent::ClearBoard), BoardEvent::BoardCleared);
        assert_eq!(
            BoardEvent::from(ServerEvent::Draw(seg())),
            BoardEvent::RemoteDraw(seg())
        );
        assert_eq!(
            BoardEvent::from(ServerEvent::LoadBoard(vec![])),
            BoardEvent::BoardLoaded(vec![])
        );
    }

    #[tokio::test]
    async fn test_take_event_rx() {
        let mut client = BoardClient::new("ws://localhost:5001");
        assert!(client.take_event_rx().is_some());
        assert!(client.take_event_rx().is_none());
    }
}
