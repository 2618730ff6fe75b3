//! Persistent board history.
//!
//! ```text
//! ┌─────────────┐   append / clear   ┌──────────────┐
//! │ BoardServer │ ─────────────────► │ BoardStore   │
//! │ (relay)     │ ◄───────────────── │ (RocksDB)    │
//! └─────────────┘   load on join     └──────┬───────┘
//!                                           │ column families
//!                                           ▼
//!                          ┌──────────────────────────────────┐
//!                          │ CF "boards":  per-room metadata  │
//!                          │ CF "actions": stroke segments    │
//!                          └──────────────────────────────────┘
//! ```

pub mod rocks;

pub use rocks::{BoardMetadata, BoardStore, StoreConfig, StoreError};
