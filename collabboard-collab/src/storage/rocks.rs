//! RocksDB-backed board store.
//!
//! Column families:
//! - `boards`: per-room metadata (bincode), keyed by room prefix
//! - `actions`: one stroke segment per record (bincode), keyed by
//!   `<room prefix><sequence:8 bytes big-endian>`
//!
//! Room prefix: `<room_id length:2 bytes big-endian><room_id bytes>`. The
//! length makes prefixes of different rooms disjoint ("a" never matches "ab").

use collabboard_core::{validate_room_id, BoardDocument, ModelError, StrokeSegment};
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, DBWithThreadMode,
    Direction, IteratorMode, Options, SingleThreaded, WriteBatch, WriteOptions,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use thiserror::Error;

const CF_BOARDS: &str = "boards";
const CF_ACTIONS: &str = "actions";

const COLUMN_FAMILIES: &[&str] = &[CF_BOARDS, CF_ACTIONS];

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database directory path
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Bloom filter bits per key (default: 10)
    pub bloom_filter_bits: i32,
    /// Enable fsync on every write (default: false)
    pub sync_writes: bool,
    /// Max open files for RocksDB (default: 512)
    pub max_open_files: i32,
    /// Write buffer size per column family (default: 16MB)
    pub write_buffer_size: usize,
    /// Open an existing database without taking its lock; every write fails
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("collabboard_data"),
            block_cache_size: 64 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 512,
            write_buffer_size: 16 * 1024 * 1024,
            read_only: false,
        }
    }
}

impl StoreConfig {
    /// Create config at `path` with default tuning.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create config for testing (small caches).
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 64,
            write_buffer_size: 4 * 1024 * 1024,
            read_only: false,
        }
    }

    /// Inspect an existing database at `path`, e.g. while a server owns it.
    pub fn read_only_at(path: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::at(path)
        }
    }
}

/// Per-room bookkeeping stored in the `boards` column family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardMetadata {
    pub room_id: String,
    /// Segments currently on the board
    pub action_count: u64,
    /// Sequence number the next appended segment receives
    pub next_seq: u64,
    /// Creation timestamp (seconds since epoch)
    pub created_at: u64,
    /// Last append or clear (seconds since epoch)
    pub updated_at: u64,
    /// Times the board was cleared
    pub clear_count: u64,
}

impl BoardMetadata {
    fn new(room_id: &str) -> Self {
        let now = unix_now();
        Self {
            room_id: room_id.to_string(),
            action_count: 0,
            next_seq: 0,
            created_at: now,
            updated_at: now,
            clear_count: 0,
        }
    }

    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        encode_record(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        decode_record(bytes)
    }
}

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Invalid room id: {0}")]
    InvalidRoom(#[from] ModelError),
    #[error("Append lock poisoned")]
    LockPoisoned,
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Durable per-room stroke history.
///
/// Appends are serialized by an internal lock so that sequence numbers,
/// and therefore replay order, follow the order calls reach the store.
pub struct BoardStore {
    /// RocksDB instance (single-threaded mode, shared behind `Arc`)
    db: DBWithThreadMode<SingleThreaded>,
    config: StoreConfig,
    /// Guards the metadata read-modify-write in append and clear
    write_lock: Mutex<()>,
}

impl BoardStore {
    /// Open the store, creating the database and column families if needed.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_keep_log_file_num(5);
        db_opts.increase_parallelism(num_cpus());

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Self::cf_options(name, &config)))
            .collect();

        let db = if config.read_only {
            DBWithThreadMode::<SingleThreaded>::open_cf_descriptors_read_only(
                &db_opts,
                &config.path,
                cf_descriptors,
                false,
            )?
        } else {
            DBWithThreadMode::<SingleThreaded>::open_cf_descriptors(
                &db_opts,
                &config.path,
                cf_descriptors,
            )?
        };

        log::info!(
            "Board store opened at {}{}",
            config.path.display(),
            if config.read_only { " (read-only)" } else { "" }
        );

        Ok(Self {
            db,
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn cf_options(name: &str, config: &StoreConfig) -> Options {
        let mut opts = Options::default();

        let mut block_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(config.block_cache_size);
        block_opts.set_block_cache(&cache);
        block_opts.set_bloom_filter(config.bloom_filter_bits as f64, false);
        opts.set_block_based_table_factory(&block_opts);

        opts.set_compression_type(DBCompressionType::Lz4);
        opts.set_write_buffer_size(config.write_buffer_size);

        match name {
            CF_BOARDS => {
                // Small values, point lookups on join
                opts.set_max_write_buffer_number(2);
                // Takes the cache size in MB
                let cache_mb = (config.block_cache_size / (1024 * 1024)).max(1);
                opts.optimize_for_point_lookup(cache_mb as u64);
            }
            CF_ACTIONS => {
                // Many small appends, range-scanned per room on join
                opts.set_max_write_buffer_number(4);
            }
            _ => {}
        }

        opts
    }

    // ─── Appends ──────────────────────────────────────────────────────

    /// Append one segment to a room's board, creating the board if missing.
    ///
    /// Returns the sequence number assigned to the segment.
    pub fn append_action(&self, room_id: &str, action: &StrokeSegment) -> Result<u64, StoreError> {
        validate_room_id(room_id)?;
        let cf_boards = self.cf(CF_BOARDS)?;
        let cf_actions = self.cf(CF_ACTIONS)?;
        let prefix = room_prefix(room_id);

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let mut meta = self
            .read_metadata(&prefix)?
            .unwrap_or_else(|| BoardMetadata::new(room_id));
        let seq = meta.next_seq;
        meta.next_seq += 1;
        meta.action_count += 1;
        meta.updated_at = unix_now();

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_actions, action_key(&prefix, seq), encode_record(action)?);
        batch.put_cf(&cf_boards, &prefix, meta.encode()?);
        self.write(batch)?;

        Ok(seq)
    }

    // ─── Reads ────────────────────────────────────────────────────────

    /// Load a room's board document, or `None` if the room was never drawn on.
    pub fn load_board(&self, room_id: &str) -> Result<Option<BoardDocument>, StoreError> {
        validate_room_id(room_id)?;
        let prefix = room_prefix(room_id);

        let Some(meta) = self.read_metadata(&prefix)? else {
            return Ok(None);
        };
        let actions = self.scan_actions(&prefix)?;

        Ok(Some(BoardDocument {
            room_id: meta.room_id,
            actions,
            created_at: meta.created_at,
        }))
    }

    /// Load a room's segments in append order (empty if the room is unknown).
    pub fn load_actions(&self, room_id: &str) -> Result<Vec<StrokeSegment>, StoreError> {
        validate_room_id(room_id)?;
        self.scan_actions(&room_prefix(room_id))
    }

    pub fn board_exists(&self, room_id: &str) -> Result<bool, StoreError> {
        validate_room_id(room_id)?;
        let cf = self.cf(CF_BOARDS)?;
        Ok(self.db.get_cf(&cf, room_prefix(room_id))?.is_some())
    }

    pub fn load_metadata(&self, room_id: &str) -> Result<BoardMetadata, StoreError> {
        validate_room_id(room_id)?;
        self.read_metadata(&room_prefix(room_id))?
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))
    }

    /// List every room that has a board, in key order.
    pub fn list_boards(&self) -> Result<Vec<String>, StoreError> {
        let cf = self.cf(CF_BOARDS)?;
        let mut rooms = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            rooms.push(BoardMetadata::decode(&value)?.room_id);
        }

        Ok(rooms)
    }

    // ─── Clearing ─────────────────────────────────────────────────────

    /// Empty a room's board if it exists. Never creates a board.
    ///
    /// Returns `false` when the room has no board. Metadata survives, so the
    /// creation time is kept and sequence numbers keep increasing.
    pub fn clear_board(&self, room_id: &str) -> Result<bool, StoreError> {
        validate_room_id(room_id)?;
        let cf_boards = self.cf(CF_BOARDS)?;
        let prefix = room_prefix(room_id);

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let Some(mut meta) = self.read_metadata(&prefix)? else {
            return Ok(false);
        };

        let mut batch = self.delete_actions_batch(&prefix)?;
        meta.action_count = 0;
        meta.clear_count += 1;
        meta.updated_at = unix_now();
        batch.put_cf(&cf_boards, &prefix, meta.encode()?);
        self.write(batch)?;

        Ok(true)
    }

    /// Remove a room's board and all of its segments.
    pub fn delete_board(&self, room_id: &str) -> Result<bool, StoreError> {
        validate_room_id(room_id)?;
        let cf_boards = self.cf(CF_BOARDS)?;
        let prefix = room_prefix(room_id);

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        if self.read_metadata(&prefix)?.is_none() {
            return Ok(false);
        }

        let mut batch = self.delete_actions_batch(&prefix)?;
        batch.delete_cf(&cf_boards, &prefix);
        self.write(batch)?;

        Ok(true)
    }

    /// Flush memtables to disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        for name in COLUMN_FAMILIES {
            let cf = self.cf(name)?;
            self.db.flush_cf(&cf)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // ─── Helpers ──────────────────────────────────────────────────────

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("Column family '{name}' not found")))
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db.write_opt(batch, &write_opts)?;
        Ok(())
    }

    fn read_metadata(&self, prefix: &[u8]) -> Result<Option<BoardMetadata>, StoreError> {
        let cf = self.cf(CF_BOARDS)?;
        match self.db.get_cf(&cf, prefix)? {
            Some(bytes) => Ok(Some(BoardMetadata::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_actions(&self, prefix: &[u8]) -> Result<Vec<StrokeSegment>, StoreError> {
        let cf = self.cf(CF_ACTIONS)?;
        let mut actions = Vec::new();

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !is_action_of(&key, prefix) {
                break;
            }
            actions.push(decode_record(&value)?);
        }

        Ok(actions)
    }

    fn delete_actions_batch(&self, prefix: &[u8]) -> Result<WriteBatch, StoreError> {
        let cf = self.cf(CF_ACTIONS)?;
        let mut batch = WriteBatch::default();

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !is_action_of(&key, prefix) {
                break;
            }
            batch.delete_cf(&cf, &key);
        }

        Ok(batch)
    }
}

/// `<len:2 BE><room bytes>`. Callers validate the room id first.
fn room_prefix(room_id: &str) -> Vec<u8> {
    let bytes = room_id.as_bytes();
    let mut prefix = Vec::with_capacity(2 + bytes.len());
    prefix.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    prefix.extend_from_slice(bytes);
    prefix
}

fn action_key(prefix: &[u8], seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn is_action_of(key: &[u8], prefix: &[u8]) -> bool {
    key.len() == prefix.len() + 8 && key.starts_with(prefix)
}

fn encode_record<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_record<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    Ok(value)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn num_cpus() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4)
}
