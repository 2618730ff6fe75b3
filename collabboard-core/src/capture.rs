//! Pointer capture: converts a press-drag-release gesture into segments.
//!
//! Every move while the pointer is down produces one segment from the last
//! seen position to the new one. Rendering is left to the caller.

use crate::model::StrokeSegment;

pub const DEFAULT_COLOR: &str = "#4f46e5";
pub const DEFAULT_SIZE: f64 = 4.0;
pub const MIN_SIZE: f64 = 1.0;
pub const MAX_SIZE: f64 = 10.0;

/// Current pen settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub color: String,
    pub size: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            size: DEFAULT_SIZE,
        }
    }
}

/// Tracks one pointer and emits a segment per move while pressed.
#[derive(Debug, Default)]
pub struct StrokeRecorder {
    brush: Brush,
    last: Option<(f64, f64)>,
}

impl StrokeRecorder {
    pub fn new(brush: Brush) -> Self {
        let mut recorder = Self { brush, last: None };
        recorder.set_size(recorder.brush.size);
        recorder
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.brush.color = color.into();
    }

    /// Set the line width, clamped to the range the board accepts.
    pub fn set_size(&mut self, size: f64) {
        self.brush.size = if size.is_nan() {
            DEFAULT_SIZE
        } else {
            size.clamp(MIN_SIZE, MAX_SIZE)
        };
    }

    pub fn is_drawing(&self) -> bool {
        self.last.is_some()
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        log::trace!("Stroke started at ({x}, {y})");
        self.last = Some((x, y));
    }

    /// Returns the segment drawn by this move, or `None` when not pressed.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<StrokeSegment> {
        let from = self.last?;
        self.last = Some((x, y));
        Some(StrokeSegment::new(
            from,
            (x, y),
            self.brush.color.clone(),
            self.brush.size,
        ))
    }

    pub fn pointer_up(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_without_press_yields_nothing() {
        let mut rec = StrokeRecorder::default();
        assert!(rec.pointer_move(5.0, 5.0).is_none());
        assert!(!rec.is_drawing());
    }

    #[test]
    fn test_drag_produces_chained_segments() {
        let mut rec = StrokeRecorder::default();
        rec.pointer_down(0.0, 0.0);

        let a = rec.pointer_move(10.0, 0.0).unwrap();
        let b = rec.pointer_move(10.0, 10.0).unwrap();

        assert_eq!((a.from_x, a.from_y, a.to_x, a.to_y), (0.0, 0.0, 10.0, 0.0));
        // Next segment starts where the previous one ended
        assert_eq!((b.from_x, b.from_y), (a.to_x, a.to_y));
        assert_eq!((b.to_x, b.to_y), (10.0, 10.0));
        assert_eq!(a.color, DEFAULT_COLOR);
        assert_eq!(a.size, DEFAULT_SIZE);
    }

    #[test]
    fn test_release_ends_stroke() {
        let mut rec = StrokeRecorder::default();
        rec.pointer_down(1.0, 1.0);
        rec.pointer_up();
        assert!(rec.pointer_move(2.0, 2.0).is_none());

        // A new press does not connect to the old stroke
        rec.pointer_down(50.0, 50.0);
        let seg = rec.pointer_move(51.0, 50.0).unwrap();
        assert_eq!((seg.from_x, seg.from_y), (50.0, 50.0));
    }

    #[test]
    fn test_brush_changes_apply_to_next_segment() {
        let mut rec = StrokeRecorder::default();
        rec.pointer_down(0.0, 0.0);
        rec.set_color("#000000");
        rec.set_size(7.0);

        let seg = rec.pointer_move(1.0, 1.0).unwrap();
        assert_eq!(seg.color, "#000000");
        assert_eq!(seg.size, 7.0);
    }

    #[test]
    fn test_size_clamped() {
        let mut rec = StrokeRecorder::new(Brush {
            color: "red".into(),
            size: 40.0,
        });
        assert_eq!(rec.brush().size, MAX_SIZE);

        rec.set_size(0.0);
        assert_eq!(rec.brush().size, MIN_SIZE);

        rec.set_size(f64::NAN);
        assert_eq!(rec.brush().size, DEFAULT_SIZE);
    }
}
