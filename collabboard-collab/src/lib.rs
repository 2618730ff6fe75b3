//! # collabboard-collab: real-time relay for CollabBoard
//!
//! Relays stroke segments between WebSocket clients that share a room and
//! keeps an append-only history per room so late joiners can replay it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     WebSocket      ┌─────────────┐
//! │ BoardClient │ ◄────────────────► │ BoardServer │
//! │ (per user)  │    JSON events     │ (central)   │
//! └─────────────┘                    └──────┬──────┘
//!                                           │
//!                             ┌─────────────┴─────────────┐
//!                             ▼                           ▼
//!                     ┌───────────────┐           ┌──────────────┐
//!                     │ BroadcastGroup│           │ BoardStore   │
//!                     │ (per room)    │           │ (RocksDB)    │
//!                     └───────────────┘           └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: JSON event wire format
//! - [`broadcast`]: room-based fan-out
//! - [`server`]: WebSocket relay server
//! - [`client`]: WebSocket client with offline queue
//! - [`storage`]: persistent per-room stroke history

pub mod broadcast;
pub mod client;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use broadcast::{BroadcastGroup, BroadcastStats, PeerInfo, RoomFrame, RoomManager};
pub use client::{BoardClient, BoardEvent, ConnectionState, OfflineQueue};
pub use protocol::{ClientEvent, DrawRequest, ProtocolError, ServerEvent};
pub use server::{origin_allowed, BoardServer, ServerConfig, ServerError, ServerStats};
pub use storage::{BoardMetadata, BoardStore, StoreConfig, StoreError};
