//! Drawing model shared by every crate in the workspace.
//!
//! JSON field names are camelCase to match what browser clients emit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted room id, in bytes.
pub const MAX_ROOM_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Room id is empty")]
    EmptyRoomId,
    #[error("Room id is {len} bytes, limit is {max}", max = MAX_ROOM_ID_LEN)]
    RoomIdTooLong { len: usize },
}

/// Check that a room id can be used as a broadcast key and a storage prefix.
pub fn validate_room_id(room_id: &str) -> Result<(), ModelError> {
    if room_id.is_empty() {
        return Err(ModelError::EmptyRoomId);
    }
    if room_id.len() > MAX_ROOM_ID_LEN {
        return Err(ModelError::RoomIdTooLong { len: room_id.len() });
    }
    Ok(())
}

/// One line segment of a freehand stroke.
///
/// The atomic unit of drawing history: relayed as-is and stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSegment {
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    /// CSS colour string, e.g. `#4f46e5`
    pub color: String,
    /// Line width in canvas pixels
    pub size: f64,
}

impl StrokeSegment {
    pub fn new(
        from: (f64, f64),
        to: (f64, f64),
        color: impl Into<String>,
        size: f64,
    ) -> Self {
        Self {
            from_x: from.0,
            from_y: from.1,
            to_x: to.0,
            to_y: to.1,
            color: color.into(),
            size,
        }
    }
}

/// A room's persisted drawing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    pub room_id: String,
    /// Segments in server-receipt order
    pub actions: Vec<StrokeSegment>,
    /// Creation timestamp (seconds since epoch)
    pub created_at: u64,
}
