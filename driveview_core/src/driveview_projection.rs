//! The "PROJECTION" Engine - vehicle space to screen space
//!
//! Pure numeric primitives, no state. Matrices are fixed-size and
//! stack-allocated (`nalgebra::Matrix4`/`Matrix3`); every constructor here
//! takes its elements in row-major order so the literal layouts below read
//! the same way the camera conventions are written down.
//!
//! Composition order matters: a point is moved by the extrinsic matrix
//! (device frame → camera frame) first and by the intrinsic matrix
//! (camera frame → image plane) second.

use crate::config::ViewportConfig;
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

pub type Mat4 = Matrix4<f64>;
pub type Mat3 = Matrix3<f64>;

/// Focal length of the road camera in pixels.
pub const FOCAL_LENGTH: f64 = 950.892854;

/// Principal point of the road camera (pixels).
pub const PRINCIPAL_POINT: (f64, f64) = (584.0, 439.0);

/// Builds a 4×4 matrix from 16 row-major elements.
pub fn mat4_from_row_major(m: &[f64; 16]) -> Mat4 {
    Mat4::from_row_slice(m)
}

/// Builds a 3×3 matrix from 9 row-major elements.
pub fn mat3_from_row_major(m: &[f64; 9]) -> Mat3 {
    Mat3::from_row_slice(m)
}

/// Pads a row-major 3×4 extrinsic with the homogeneous row `[0, 0, 0, 1]`.
pub fn extrinsic_from_3x4(m: &[f64; 12]) -> Mat4 {
    let mut full = [0.0; 16];
    full[..12].copy_from_slice(m);
    full[15] = 1.0;
    mat4_from_row_major(&full)
}

/// Fixed camera intrinsic. The last row is zero: `w` is discarded and the
/// perspective divide uses `z`.
#[rustfmt::skip]
pub fn intrinsic_matrix() -> Mat4 {
    let (cx, cy) = PRINCIPAL_POINT;
    mat4_from_row_major(&[
        FOCAL_LENGTH, 0.0,          cx,  0.0,
        0.0,          FOCAL_LENGTH, cy,  0.0,
        0.0,          0.0,          1.0, 0.0,
        0.0,          0.0,          0.0, 0.0,
    ])
}

/// Device mounting transform (identity for the forward road camera).
pub fn device_transform() -> Mat4 {
    Mat4::identity()
}

/// Horizontal aspect correction mapping the 4:3 camera frame into the
/// visible box of the viewport.
#[rustfmt::skip]
pub fn frame_transform(viewport: &ViewportConfig) -> Mat4 {
    let x = 2.0 * (4.0 / 3.0) / (viewport.visible_width() / viewport.box_height());
    mat4_from_row_major(&[
        x,   0.0, 0.0, 0.0,
        0.0, 2.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ])
}

/// Pixel → normalized device coordinates for a surface of the given size.
#[rustfmt::skip]
pub fn ndc_transform(width: f64, height: f64) -> Mat4 {
    mat4_from_row_major(&[
        2.0 / width, 0.0,          0.0, -1.0,
        0.0,         2.0 / height, 0.0, -1.0,
        0.0,         0.0,          1.0,  0.0,
        0.0,         0.0,          0.0,  1.0,
    ])
}

/// `m * v` for a homogeneous 4-vector.
pub fn matvecmul4(m: &Mat4, v: &Vector4<f64>) -> Vector4<f64> {
    m * v
}

/// `m * v` for a 3-vector.
pub fn matvecmul3(m: &Mat3, v: &Vector3<f64>) -> Vector3<f64> {
    m * v
}

/// `a * b`: `b` is applied to vectors first.
pub fn matmul4(a: &Mat4, b: &Mat4) -> Mat4 {
    a * b
}

/// `a * b`: `b` is applied to vectors first.
pub fn matmul3(a: &Mat3, b: &Mat3) -> Mat3 {
    a * b
}

/// Applies a homography to a 2D point and perspective-divides.
///
/// No guard on the homogeneous coordinate; degenerate inputs yield
/// non-finite output that callers must tolerate.
pub fn warp_point(warp: &Mat3, x: f64, y: f64) -> (f64, f64) {
    let v = matvecmul3(warp, &Vector3::new(x, y, 1.0));
    (v.x / v.z, v.y / v.z)
}

/// A projected point. `z` is the camera-frame depth before the divide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ScreenPoint {
    /// False for points behind/above the horizon or numerically degenerate.
    pub fn is_drawable(&self) -> bool {
        self.y.is_finite() && self.y >= 0.0
    }
}

/// Camera pose + lens model derived from one calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransform {
    pub extrinsic: Mat4,
    pub intrinsic: Mat4,
}

impl CameraTransform {
    pub fn new(extrinsic: Mat4, intrinsic: Mat4) -> Self {
        Self {
            extrinsic,
            intrinsic,
        }
    }

    /// Projects a homogeneous vehicle-space point onto the image plane.
    ///
    /// Extrinsic first, intrinsic second, then `x /= z; y /= z`. There is no
    /// guard against `z == 0`.
    pub fn car_space_to_image_space(&self, point: Vector4<f64>) -> Vector4<f64> {
        let camera = matvecmul4(&self.extrinsic, &point);
        let mut image = matvecmul4(&self.intrinsic, &camera);
        image.x /= image.z;
        image.y /= image.z;
        image
    }

    /// Projects a vehicle-space position `(x forward, y left, z up)`.
    pub fn project(&self, x: f64, y: f64, z: f64) -> ScreenPoint {
        let p = self.car_space_to_image_space(Vector4::new(x, y, z, 1.0));
        ScreenPoint {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }

    /// Pre-composed `intrinsic * extrinsic`.
    pub fn composed(&self) -> Mat4 {
        matmul4(&self.intrinsic, &self.extrinsic)
    }
}
