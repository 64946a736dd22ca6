//! Lane boundaries, planned path and MPC trajectory.

use super::{LayerEvents, LayerKind, OverlayLayer, DRIVING_BLUE, ENGAGED_GREEN, WHITE};
use crate::config::ViewportConfig;
use crate::driveview_calibration::CalibratedFrame;
use crate::driveview_projection::{device_transform, frame_transform, matmul4, ndc_transform, warp_point, CameraTransform, Mat3};
use driveview_env::{Color, LaneLine, LinearGradient, MpcEvent, Paint, Path2D, Surface};
use tracing::trace;

/// Longitudinal samples drawn for lane lines and the model path.
const LINE_HEIGHT: usize = 49;

/// Index of the last MPC trajectory sample.
const MPC_HEIGHT: usize = 20;

const PATH_HALF_WIDTH: f64 = 0.5;
const MPC_HALF_WIDTH: f64 = 0.3;

/// Ghost lines never stray further than this from the lane center.
const MAX_GHOST_OFFSET: f64 = 0.7;

const LANE_WIDTH_PER_PROB: f64 = 0.035;

/// Ghost stroke width (logical units).
const GHOST_LINE_WIDTH: f64 = 0.1;

/// Size of the reference rectangle in warped-image space.
const REFERENCE_WIDTH: f64 = 320.0;
const REFERENCE_HEIGHT: f64 = 160.0;

/// Corners of the reference rectangle after the calibration homography,
/// closed back on the first corner.
pub fn reference_quad(warp: &Mat3) -> [(f64, f64); 5] {
    [
        warp_point(warp, 0.0, 0.0),
        warp_point(warp, REFERENCE_WIDTH, 0.0),
        warp_point(warp, REFERENCE_WIDTH, REFERENCE_HEIGHT),
        warp_point(warp, 0.0, REFERENCE_HEIGHT),
        warp_point(warp, 0.0, 0.0),
    ]
}

/// Which trajectory a band follows.
enum Track<'a> {
    /// Fixed 1 m stations, lateral offset per station
    Path(&'a LaneLine),
    /// Explicit (x, y) samples
    Mpc(&'a MpcEvent),
}

impl Track<'_> {
    fn last_index(&self) -> usize {
        match self {
            Track::Path(_) => LINE_HEIGHT,
            Track::Mpc(_) => MPC_HEIGHT,
        }
    }

    fn half_width(&self) -> f64 {
        match self {
            Track::Path(_) => PATH_HALF_WIDTH,
            Track::Mpc(_) => MPC_HALF_WIDTH,
        }
    }

    fn sample(&self, i: usize) -> Option<(f64, f64)> {
        match self {
            Track::Path(line) => line.points.get(i).map(|y| (i as f64, *y)),
            Track::Mpc(mpc) => Some((*mpc.x.get(i)?, *mpc.y.get(i)?)),
        }
    }
}

/// Draws the road layer.
#[derive(Debug, Clone)]
pub struct LanePathLayer {
    viewport: ViewportConfig,
}

impl LanePathLayer {
    pub fn new(viewport: ViewportConfig) -> Self {
        Self { viewport }
    }

    fn draw_reference_quad(&self, surface: &mut dyn Surface, warp: &Mat3) {
        let (width, height) = surface.client_size();
        let out = matmul4(
            &device_transform(),
            &matmul4(&frame_transform(&self.viewport), &ndc_transform(width, height)),
        );
        trace!("Reference quad output transform: {:?}", out);

        let mut path = Path2D::new();
        let mut started = false;
        for (x, y) in reference_quad(warp) {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            if started {
                path.line_to(x, y);
            } else {
                path.move_to(x, y);
                started = true;
            }
        }
        if path.is_empty() {
            return;
        }
        surface.save();
        surface.stroke_path(&path, &Paint::Solid(Color::rgb(0, 0, 0)), 1.0);
        surface.restore();
    }

    fn draw_lane_boundary(&self, surface: &mut dyn Surface, camera: &CameraTransform, lane: &LaneLine) {
        let color = WHITE.with_alpha(lane.prob);
        lane_line(surface, camera, &lane.points, LANE_WIDTH_PER_PROB * lane.prob, color, false);
        let offset = lane.std.min(MAX_GHOST_OFFSET);
        lane_line(surface, camera, &lane.points, -offset, color, true);
        lane_line(surface, camera, &lane.points, offset, color, true);
    }

    fn draw_track(&self, surface: &mut dyn Surface, camera: &CameraTransform, track: Track<'_>, paint: Paint) {
        let off = track.half_width();
        let last = track.last_index();
        let bottom = self.viewport.height;
        let mut path = Path2D::new();

        let push = |path: &mut Path2D, i: usize, lateral: f64| {
            let Some((px, py)) = track.sample(i) else {
                return;
            };
            let p = camera.project(px, py + lateral, 0.0);
            if !p.x.is_finite() {
                return;
            }
            let y = if i == 0 {
                bottom
            } else if p.is_drawable() {
                p.y
            } else {
                return;
            };
            if path.is_empty() {
                path.move_to(p.x, y);
            } else {
                path.line_to(p.x, y);
            }
        };

        for i in 0..=last {
            push(&mut path, i, -off);
        }
        for i in (0..=last).rev() {
            push(&mut path, i, off);
        }
        if path.is_empty() {
            return;
        }
        path.close();
        surface.fill_path(&path, &paint);
    }

    fn path_gradient(&self) -> Paint {
        let (w, h) = (self.viewport.width, self.viewport.height);
        Paint::Gradient(
            LinearGradient::new(w, h, w, h * 0.5)
                .with_stop(0.0, WHITE.with_alpha(0.8))
                .with_stop(1.0, WHITE.with_alpha(0.0)),
        )
    }

    fn mpc_gradient(&self, engaged: bool) -> Paint {
        let (w, h) = (self.viewport.width, self.viewport.height);
        let gradient = LinearGradient::new(w, h - 40.0, w, h * 0.4);
        Paint::Gradient(if engaged {
            gradient
                .with_stop(0.0, ENGAGED_GREEN.with_alpha(0.8))
                .with_stop(1.0, Color::rgba(14, 89, 45, 0.8))
        } else {
            gradient
                .with_stop(0.0, DRIVING_BLUE.with_alpha(0.6))
                .with_stop(1.0, Color::rgba(15, 58, 89, 0.6))
        })
    }
}

/// One lane line band: forward along `points - off`, back along
/// `points + off` (or `points - off` again for a ghost outline).
fn lane_line(
    surface: &mut dyn Surface,
    camera: &CameraTransform,
    points: &[f64],
    off: f64,
    color: Color,
    ghost: bool,
) {
    let mut path = Path2D::new();
    for i in 0..LINE_HEIGHT {
        let Some(point) = points.get(i) else {
            continue;
        };
        let p = camera.project(i as f64, point - off, 0.0);
        if !p.is_drawable() {
            continue;
        }
        if path.is_empty() {
            path.move_to(p.x, p.y);
        } else {
            path.line_to(p.x, p.y);
        }
    }
    for i in (1..=LINE_HEIGHT).rev() {
        let Some(point) = points.get(i) else {
            continue;
        };
        let lateral = if ghost { point - off } else { point + off };
        let p = camera.project(i as f64, lateral, 0.0);
        if !p.is_drawable() {
            continue;
        }
        if path.is_empty() {
            path.move_to(p.x, p.y);
        } else {
            path.line_to(p.x, p.y);
        }
    }
    if path.is_empty() {
        return;
    }
    path.close();
    if ghost {
        surface.stroke_path(&path, &Paint::Solid(color), GHOST_LINE_WIDTH);
    } else {
        surface.fill_path(&path, &Paint::Solid(color));
    }
}

impl OverlayLayer for LanePathLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::LaneAndPath
    }

    fn draw(&self, surface: &mut dyn Surface, frame: &CalibratedFrame, events: &LayerEvents) {
        let camera = &frame.camera;
        self.draw_reference_quad(surface, &frame.warp);

        if let Some(model) = events.model() {
            self.draw_lane_boundary(surface, camera, &model.left_lane);
            self.draw_lane_boundary(surface, camera, &model.right_lane);
            self.draw_track(surface, camera, Track::Path(&model.path), self.path_gradient());
        }

        if let (Some(mpc), Some(car_state)) = (events.mpc(), events.car_state()) {
            let paint = self.mpc_gradient(car_state.cruise.enabled);
            self.draw_track(surface, camera, Track::Mpc(mpc), paint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::driveview_calibration::CalibrationCache;
    use crate::driveview_projection::{extrinsic_from_3x4, intrinsic_matrix};
    use driveview_env::{DisplayList, DrawOp};

    fn frame() -> CalibratedFrame {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&road_calibration(1)));
        cache.current().cloned().unwrap()
    }

    fn fills(list: &DisplayList) -> Vec<(&Path2D, &Paint)> {
        list.ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillPath { path, paint } => Some((path, paint)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_reference_quad_is_closed() {
        let quad = reference_quad(&Mat3::identity());
        assert_eq!(quad[0], quad[4]);
        assert_eq!(quad[2], (320.0, 160.0));
    }

    #[test]
    fn test_reference_quad_perspective_divides() {
        let warp = Mat3::identity() * 2.0;
        let quad = reference_quad(&warp);
        assert_eq!(quad[1], (320.0, 0.0));
    }

    #[test]
    fn test_model_draws_lanes_and_path() {
        let layer = LanePathLayer::new(ViewportConfig::default());
        let mut events = LayerEvents::default();
        events.insert(model(1));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame(), &events);

        // two lane fills and the path fill; ghosts are strokes
        assert_eq!(fills(&list).len(), 3);
        let strokes = list
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::StrokePath { line_width, .. } if *line_width == GHOST_LINE_WIDTH))
            .count();
        assert_eq!(strokes, 4);
    }

    #[test]
    fn test_lane_alpha_follows_probability() {
        let layer = LanePathLayer::new(ViewportConfig::default());
        let mut events = LayerEvents::default();
        events.insert(model(1));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame(), &events);

        let lane_fills = fills(&list);
        assert_eq!(lane_fills[0].1, &Paint::Solid(WHITE.with_alpha(0.9)));
        assert_eq!(lane_fills[1].1, &Paint::Solid(WHITE.with_alpha(0.7)));
    }

    #[test]
    fn test_path_band_pinned_to_bottom() {
        let layer = LanePathLayer::new(ViewportConfig::default());
        let mut events = LayerEvents::default();
        events.insert(model(1));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame(), &events);

        let (path, paint) = fills(&list)[2];
        let verts = path.vertices();
        assert_eq!(verts.len(), 100);
        assert_eq!(verts.first().unwrap().1, 874.0);
        assert_eq!(verts.last().unwrap().1, 874.0);
        assert!(verts[1..verts.len() - 1].iter().all(|(_, y)| *y != 874.0));
        assert!(matches!(paint, Paint::Gradient(g) if g.y1 == 437.0));
    }

    #[test]
    fn test_mpc_requires_car_state() {
        let layer = LanePathLayer::new(ViewportConfig::default());
        let mut events = LayerEvents::default();
        events.insert(mpc(1));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame(), &events);
        assert!(fills(&list).is_empty());

        events.insert(car_state(1, true, 0.0));
        layer.draw(&mut list, &frame(), &events);
        let mpc_fills = fills(&list);
        assert_eq!(mpc_fills.len(), 1);
        match mpc_fills[0].1 {
            Paint::Gradient(g) => {
                assert_eq!(g.stops[0].1, ENGAGED_GREEN.with_alpha(0.8));
                assert_eq!(g.y0, 834.0);
            }
            other => panic!("unexpected paint {:?}", other),
        }
    }

    #[test]
    fn test_mpc_blue_when_not_engaged() {
        let layer = LanePathLayer::new(ViewportConfig::default());
        let mut events = LayerEvents::default();
        events.insert(mpc(1));
        events.insert(car_state(1, false, 0.0));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame(), &events);
        match fills(&list)[0].1 {
            Paint::Gradient(g) => assert_eq!(g.stops[0].1, DRIVING_BLUE.with_alpha(0.6)),
            other => panic!("unexpected paint {:?}", other),
        }
    }

    #[rustfmt::skip]
    #[test]
    fn test_points_at_zero_depth_are_skipped() {
        // Camera at the vehicle origin: station 0 projects with zero depth
        let extrinsic = extrinsic_from_3x4(&[
            0.0, -1.0,  0.0, 0.0,
            0.0,  0.0, -1.0, 1.2,
            1.0,  0.0,  0.0, 0.0,
        ]);
        let camera = CameraTransform::new(extrinsic, intrinsic_matrix());
        let mut list = DisplayList::new(1164.0, 874.0);
        lane_line(&mut list, &camera, &[1.0; 50], 0.0, WHITE, false);

        let (path, _) = fills(&list)[0];
        let verts = path.vertices();
        assert!(verts.iter().all(|(x, y)| x.is_finite() && y.is_finite() && *y >= 0.0));
        // forward stations 1..49, backward stations 49..1
        assert_eq!(verts.len(), 48 + 49);
    }
}
