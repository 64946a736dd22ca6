//! 2D drawing surface abstraction.
//!
//! The overlay renderers emit immediate-mode drawing commands against a
//! `Surface`. The command set is the small subset of a canvas-style 2D
//! context the overlay actually needs: paths, solid/gradient/pattern paints,
//! an affine transform stack and rectangle clears.

use serde::{Deserialize, Serialize};

/// RGBA color with 8-bit channels and a floating alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }
}

/// Linear gradient between two points with ordered color stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub stops: Vec<(f64, Color)>,
}

impl LinearGradient {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            stops: Vec::new(),
        }
    }

    pub fn with_stop(mut self, offset: f64, color: Color) -> Self {
        self.stops.push((offset, color));
        self
    }
}

/// Fill or stroke style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Solid(Color),
    Gradient(LinearGradient),
    /// Repeating image pattern, identified by asset key
    Pattern(String),
}

/// A single path construction command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Arc {
        cx: f64,
        cy: f64,
        radius: f64,
        start: f64,
        end: f64,
    },
    Close,
}

/// A path under construction, equivalent to `beginPath` ... `closePath`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path2D {
    cmds: Vec<PathCmd>,
}

impl Path2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.cmds.push(PathCmd::MoveTo(x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.cmds.push(PathCmd::LineTo(x, y));
    }

    /// Clockwise arc around `(cx, cy)` from `start` to `end` radians.
    pub fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64) {
        self.cmds.push(PathCmd::Arc {
            cx,
            cy,
            radius,
            start,
            end,
        });
    }

    pub fn close(&mut self) {
        self.cmds.push(PathCmd::Close);
    }

    pub fn commands(&self) -> &[PathCmd] {
        &self.cmds
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Vertices visited by move/line commands, in order.
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        self.cmds
            .iter()
            .filter_map(|cmd| match *cmd {
                PathCmd::MoveTo(x, y) | PathCmd::LineTo(x, y) => Some((x, y)),
                _ => None,
            })
            .collect()
    }
}

/// Affine transform `[a c e; b d f; 0 0 1]`, canvas argument order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform2D {
    pub const IDENTITY: Transform2D = Transform2D {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    pub fn translate(dx: f64, dy: f64) -> Self {
        Self {
            e: dx,
            f: dy,
            ..Self::IDENTITY
        }
    }

    pub fn rotate(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self * other`: `other` is applied to points first.
    pub fn then(&self, other: &Transform2D) -> Transform2D {
        Transform2D {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An immediate-mode drawing surface owned by one overlay layer.
///
/// # Implementations
///
/// - **Production**: a canvas element / GPU-backed 2D context
/// - **Recording**: `DisplayList` - keeps the command stream for replay and tests
pub trait Surface {
    /// On-screen size of the surface in physical pixels.
    fn client_size(&self) -> (f64, f64);

    /// Resizes the backing store. Resets contents, transform and state stack.
    fn resize(&mut self, width: f64, height: f64);

    /// Replaces the current transform.
    fn set_transform(&mut self, transform: Transform2D);

    fn scale(&mut self, sx: f64, sy: f64);

    fn translate(&mut self, dx: f64, dy: f64);

    fn rotate(&mut self, radians: f64);

    /// Pushes the current transform onto the state stack.
    fn save(&mut self);

    /// Pops the state stack.
    fn restore(&mut self);

    /// Clears a rectangle in current-transform coordinates.
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn fill_path(&mut self, path: &Path2D, paint: &Paint);

    fn stroke_path(&mut self, path: &Path2D, paint: &Paint, line_width: f64);

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, paint: &Paint, line_width: f64);

    /// Resets the transform and clears the whole visible area.
    fn clear_all(&mut self) {
        let (width, height) = self.client_size();
        self.set_transform(Transform2D::IDENTITY);
        self.clear_rect(0.0, 0.0, width, height);
    }
}
