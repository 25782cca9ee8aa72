//! Rendering abstraction layer
//!
//! Fetched data is turned into a `Frame`: a flat list of draw primitives in
//! (time, channel-row) coordinates. Rasterization belongs to a `DrawSink`.

mod frame;

pub use frame::{assemble_frame, CURSOR_COLOR, EPOCH_FILL_ALPHA, LABEL_BACKGROUND, ROW_HEIGHT};

use egui::Color32;

/// A single draw command in (time, row) space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    /// Box from `(x, y)` spanning `width` seconds and `height` rows
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color32,
        border: Color32,
    },
    /// Polyline through `points`
    Line {
        points: Vec<[f64; 2]>,
        color: Color32,
    },
    /// Text anchored at its left edge, vertically centered on `position`
    Text {
        position: [f64; 2],
        text: String,
        color: Color32,
        background: Color32,
    },
    /// Vertical marker spanning the full height at time `t`
    Cursor {
        t: f64,
        color: Color32,
    },
}

/// Visible area of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Everything needed to paint one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub primitives: Vec<DrawPrimitive>,
    pub bounds: ViewBounds,
    pub background: Color32,
}

impl Frame {
    /// Replay the frame into a sink: clear, draw each primitive, set bounds
    pub fn paint(&self, sink: &mut dyn DrawSink) {
        sink.clear();
        sink.set_background(self.background);
        for primitive in &self.primitives {
            sink.draw(primitive);
        }
        sink.set_view_bounds(self.bounds);
    }

    pub fn count_rects(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p, DrawPrimitive::Rect { .. })).count()
    }

    pub fn count_lines(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p, DrawPrimitive::Line { .. })).count()
    }

    pub fn count_texts(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p, DrawPrimitive::Text { .. })).count()
    }

    pub fn count_cursors(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p, DrawPrimitive::Cursor { .. })).count()
    }
}

/// Trait for whatever rasterizes frames
pub trait DrawSink {
    /// Drop everything drawn so far
    fn clear(&mut self);

    fn set_background(&mut self, _color: Color32) {}

    fn draw(&mut self, primitive: &DrawPrimitive);

    fn set_view_bounds(&mut self, bounds: ViewBounds);
}

/// Calls received by a `RecordingSink`
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Clear,
    Background(Color32),
    Draw(DrawPrimitive),
    ViewBounds(ViewBounds),
}

/// Sink that keeps every call, for headless use and tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives drawn since the last clear
    pub fn current_primitives(&self) -> Vec<&DrawPrimitive> {
        let start = self
            .calls
            .iter()
            .rposition(|c| matches!(c, SinkCall::Clear))
            .map_or(0, |i| i + 1);
        self.calls[start..]
            .iter()
            .filter_map(|c| match c {
                SinkCall::Draw(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, SinkCall::Clear)).count()
    }

    pub fn last_bounds(&self) -> Option<ViewBounds> {
        self.calls.iter().rev().find_map(|c| match c {
            SinkCall::ViewBounds(b) => Some(*b),
            _ => None,
        })
    }
}

impl DrawSink for RecordingSink {
    fn clear(&mut self) {
        self.calls.push(SinkCall::Clear);
    }

    fn set_background(&mut self, color: Color32) {
        self.calls.push(SinkCall::Background(color));
    }

    fn draw(&mut self, primitive: &DrawPrimitive) {
        self.calls.push(SinkCall::Draw(primitive.clone()));
    }

    fn set_view_bounds(&mut self, bounds: ViewBounds) {
        self.calls.push(SinkCall::ViewBounds(bounds));
    }
}
