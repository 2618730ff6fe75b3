//! # collabboard-core: shared drawing model
//!
//! Types exchanged between browser clients, the relay server and the board
//! store, plus the pointer-to-segment capture used by clients.
//!
//! - [`model`]: stroke segments, board documents, room id rules
//! - [`capture`]: turns pointer down/move/up into stroke segments

pub mod capture;
pub mod model;

pub use capture::{Brush, StrokeRecorder};
pub use model::{validate_room_id, BoardDocument, ModelError, StrokeSegment, MAX_ROOM_ID_LEN};
