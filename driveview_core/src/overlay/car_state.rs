//! Engagement border and steering wheel.

use super::{LayerEvents, LayerKind, OverlayLayer, DRIVING_BLUE, ENGAGED_GREEN, WHEEL_PATTERN};
use crate::config::ViewportConfig;
use crate::driveview_calibration::CalibratedFrame;
use driveview_env::{CarStateEvent, Paint, Path2D, Surface};
use std::f64::consts::PI;

const WHEEL_RADIUS: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct CarStateLayer {
    viewport: ViewportConfig,
}

impl CarStateLayer {
    pub fn new(viewport: ViewportConfig) -> Self {
        Self { viewport }
    }

    /// Center of the wheel disc in logical coordinates.
    pub fn wheel_center(&self) -> (f64, f64) {
        let inset = WHEEL_RADIUS + self.viewport.border * 2.0;
        (self.viewport.width - inset, inset)
    }

    fn state_color(car_state: &CarStateEvent) -> Paint {
        if car_state.cruise.enabled {
            Paint::Solid(ENGAGED_GREEN)
        } else {
            Paint::Solid(DRIVING_BLUE)
        }
    }

    fn draw_border(&self, surface: &mut dyn Surface, car_state: &CarStateEvent) {
        surface.stroke_rect(
            0.0,
            0.0,
            self.viewport.width,
            self.viewport.height,
            &Self::state_color(car_state),
            self.viewport.border * 2.0,
        );
    }

    fn draw_wheel(&self, surface: &mut dyn Surface, car_state: &CarStateEvent) {
        let (x, y) = self.wheel_center();
        let border = self.viewport.border;

        let mut disc = Path2D::new();
        disc.arc(x, y, WHEEL_RADIUS, 0.0, 2.0 * PI);
        disc.close();
        surface.fill_path(&disc, &Self::state_color(car_state));

        // Icon rotates about the disc center; the pattern origin sits at the icon's corner
        surface.save();
        surface.translate(x, y);
        surface.rotate(-car_state.steering_angle_deg.to_radians());
        surface.translate(-x, -y);

        let mut icon = Path2D::new();
        icon.arc(x, y, WHEEL_RADIUS - border / 2.0, 0.0, 2.0 * PI);
        icon.close();
        surface.translate(
            self.viewport.width - (border * 2.0 + border / 2.0),
            border * 2.0 + border / 2.0,
        );
        surface.fill_path(&icon, &Paint::Pattern(WHEEL_PATTERN.to_string()));
        surface.restore();
    }
}

impl OverlayLayer for CarStateLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::CarState
    }

    fn draw(&self, surface: &mut dyn Surface, _frame: &CalibratedFrame, events: &LayerEvents) {
        let Some(car_state) = events.car_state() else {
            return;
        };
        self.draw_border(surface, car_state);
        self.draw_wheel(surface, car_state);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::driveview_calibration::CalibrationCache;
    use approx::assert_relative_eq;
    use driveview_env::{DisplayList, DrawOp, Transform2D};

    fn draw(enabled: bool, angle: f64) -> DisplayList {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&road_calibration(1)));
        let frame = cache.current().cloned().unwrap();

        let layer = CarStateLayer::new(ViewportConfig::default());
        let mut events = LayerEvents::default();
        events.insert(car_state(1, enabled, angle));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame, &events);
        list
    }

    #[test]
    fn test_wheel_center() {
        let layer = CarStateLayer::new(ViewportConfig::default());
        assert_eq!(layer.wheel_center(), (1024.0, 140.0));
    }

    #[test]
    fn test_border_color_tracks_engagement() {
        let engaged = draw(true, 0.0);
        match &engaged.ops()[0] {
            DrawOp::StrokeRect {
                width,
                height,
                paint,
                line_width,
                ..
            } => {
                assert_eq!((*width, *height), (1164.0, 874.0));
                assert_eq!(*line_width, 60.0);
                assert_eq!(paint, &Paint::Solid(ENGAGED_GREEN));
            }
            other => panic!("unexpected op {:?}", other),
        }

        let driving = draw(false, 0.0);
        assert!(matches!(
            &driving.ops()[0],
            DrawOp::StrokeRect { paint, .. } if *paint == Paint::Solid(DRIVING_BLUE)
        ));
    }

    #[test]
    fn test_wheel_rotates_by_negative_angle() {
        let list = draw(true, 90.0);
        let rotation = list.ops().iter().find_map(|op| match op {
            DrawOp::Rotate(r) => Some(*r),
            _ => None,
        });
        assert_relative_eq!(rotation.unwrap(), -std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_wheel_leaves_transform_balanced() {
        let list = draw(true, 37.0);
        assert_eq!(list.current_transform(), Transform2D::IDENTITY);
        let pattern_fills = list
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::FillPath { paint: Paint::Pattern(k), .. } if k == WHEEL_PATTERN))
            .count();
        assert_eq!(pattern_fills, 1);
    }

    #[test]
    fn test_no_car_state_draws_nothing() {
        let layer = CarStateLayer::new(ViewportConfig::default());
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&road_calibration(1)));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, cache.current().unwrap(), &LayerEvents::default());
        assert_eq!(list.op_count(), 0);
    }
}
