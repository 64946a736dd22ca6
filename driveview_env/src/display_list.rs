//! Recording surface that keeps the emitted command stream.
//!
//! A `DisplayList` can be serialized and replayed by any 2D backend, which
//! also makes it the surface used by the simulation harness and tests.

use crate::surface::{Paint, Path2D, Surface, Transform2D};
use serde::{Deserialize, Serialize};

/// One recorded drawing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    Resize { width: f64, height: f64 },
    SetTransform(Transform2D),
    Scale(f64, f64),
    Translate(f64, f64),
    Rotate(f64),
    Save,
    Restore,
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    FillPath { path: Path2D, paint: Paint },
    StrokePath { path: Path2D, paint: Paint, line_width: f64 },
    StrokeRect { x: f64, y: f64, width: f64, height: f64, paint: Paint, line_width: f64 },
}

impl DrawOp {
    /// True for commands that put pixels on the surface.
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            DrawOp::FillPath { .. } | DrawOp::StrokePath { .. } | DrawOp::StrokeRect { .. }
        )
    }
}

/// A surface that records every command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayList {
    client_width: f64,
    client_height: f64,
    ops: Vec<DrawOp>,
    transform: Transform2D,
    stack: Vec<Transform2D>,

    /// Paint commands issued since the last full clear or resize
    painted_since_clear: usize,
}

impl DisplayList {
    /// Creates an empty list for a surface of the given on-screen size.
    pub fn new(client_width: f64, client_height: f64) -> Self {
        Self {
            client_width,
            client_height,
            ..Default::default()
        }
    }

    /// Simulates the element being laid out at a new size.
    pub fn set_client_size(&mut self, width: f64, height: f64) {
        self.client_width = width;
        self.client_height = height;
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drains recorded commands, leaving surface state intact.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Total commands recorded (mutation count).
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Current transform after all recorded commands.
    pub fn current_transform(&self) -> Transform2D {
        self.transform
    }

    /// True when nothing has been painted since the last full clear.
    pub fn is_blank(&self) -> bool {
        self.painted_since_clear == 0
    }

    /// Paint commands currently visible (issued since the last full clear).
    pub fn painted_count(&self) -> usize {
        self.painted_since_clear
    }

    fn record(&mut self, op: DrawOp) {
        if op.is_paint() {
            self.painted_since_clear += 1;
        }
        self.ops.push(op);
    }
}

impl Surface for DisplayList {
    fn client_size(&self) -> (f64, f64) {
        (self.client_width, self.client_height)
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.transform = Transform2D::IDENTITY;
        self.stack.clear();
        self.painted_since_clear = 0;
        self.record(DrawOp::Resize { width, height });
    }

    fn set_transform(&mut self, transform: Transform2D) {
        self.transform = transform;
        self.record(DrawOp::SetTransform(transform));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform = self.transform.then(&Transform2D::scale(sx, sy));
        self.record(DrawOp::Scale(sx, sy));
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform = self.transform.then(&Transform2D::translate(dx, dy));
        self.record(DrawOp::Translate(dx, dy));
    }

    fn rotate(&mut self, radians: f64) {
        self.transform = self.transform.then(&Transform2D::rotate(radians));
        self.record(DrawOp::Rotate(radians));
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
        self.record(DrawOp::Save);
    }

    fn restore(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.transform = t;
        }
        self.record(DrawOp::Restore);
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        // Only an untransformed clear covering the whole element counts as a full clear
        let full = self.transform == Transform2D::IDENTITY
            && x <= 0.0
            && y <= 0.0
            && x + width >= self.client_width
            && y + height >= self.client_height;
        if full {
            self.painted_since_clear = 0;
        }
        self.record(DrawOp::ClearRect {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_path(&mut self, path: &Path2D, paint: &Paint) {
        self.record(DrawOp::FillPath {
            path: path.clone(),
            paint: paint.clone(),
        });
    }

    fn stroke_path(&mut self, path: &Path2D, paint: &Paint, line_width: f64) {
        self.record(DrawOp::StrokePath {
            path: path.clone(),
            paint: paint.clone(),
            line_width,
        });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, paint: &Paint, line_width: f64) {
        self.record(DrawOp::StrokeRect {
            x,
            y,
            width,
            height,
            paint: paint.clone(),
            line_width,
        });
    }
}
