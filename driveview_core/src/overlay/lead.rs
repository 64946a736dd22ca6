//! Lead vehicle markers.
//!
//! Each valid detection gets an amber glow chevron sized by distance. A lead
//! closer than the proximity threshold also gets a red warning chevron whose
//! opacity grows as the gap shrinks and as the closing speed rises.

use super::{LayerEvents, LayerKind, OverlayLayer, LEAD_GLOW, LEAD_WARNING};
use crate::config::LeadStyle;
use crate::driveview_calibration::CalibratedFrame;
use driveview_env::{LeadData, Paint, Path2D, Surface};

/// Distance from the radar origin to the front bumper (meters).
const RADAR_TO_BUMPER: f64 = 2.7;

const MIN_ICON_SIZE: f64 = 15.0;
const MAX_ICON_SIZE: f64 = 30.0;

/// Marker size for a lead at `d_rel` meters.
pub fn lead_icon_size(d_rel: f64) -> f64 {
    let size = 25.0 * 30.0 / ((d_rel + RADAR_TO_BUMPER) / 3.0 + 30.0);
    size.clamp(MIN_ICON_SIZE, MAX_ICON_SIZE)
}

/// Warning opacity in `[0, 1]`: proximity plus closing speed, saturating.
pub fn lead_alpha(d_rel: f64, v_rel: f64, style: &LeadStyle) -> f64 {
    if d_rel >= style.proximity_threshold {
        return 0.0;
    }
    let mut alpha = 255.0 * (1.0 - d_rel / style.proximity_threshold);
    if v_rel < 0.0 {
        alpha += 255.0 * (-v_rel / style.speed_buffer);
    }
    alpha.min(255.0) / 255.0
}

/// Draws up to two leads.
#[derive(Debug, Clone)]
pub struct LeadLayer {
    style: LeadStyle,
}

impl LeadLayer {
    pub fn new(style: LeadStyle) -> Self {
        Self { style }
    }

    fn draw_lead(&self, surface: &mut dyn Surface, frame: &CalibratedFrame, lead: &LeadData, secondary: bool) {
        let p = frame.camera.project(lead.d_rel + RADAR_TO_BUMPER, lead.y_rel, 0.0);
        if !(p.x.is_finite() && p.x >= 0.0 && p.is_drawable()) {
            return;
        }
        let (x, y) = (p.x, p.y);

        let mut sz = lead_icon_size(lead.d_rel);
        if secondary {
            sz /= self.style.secondary_size_divisor;
        }

        let glow = if secondary { LEAD_GLOW.with_alpha(0.5) } else { LEAD_GLOW };
        let g_xo = sz / 5.0;
        let g_yo = sz / 10.0;
        surface.fill_path(
            &chevron(
                (x + sz * 1.35 + g_xo, y + sz + g_yo),
                (x, y - g_xo),
                (x - sz * 1.35 - g_xo, y + sz + g_yo),
            ),
            &Paint::Solid(glow),
        );

        let mut alpha = lead_alpha(lead.d_rel, lead.v_rel, &self.style);
        if alpha > 0.0 {
            if secondary {
                alpha /= self.style.secondary_alpha_divisor;
            }
            surface.fill_path(
                &chevron((x + sz * 1.25, y + sz), (x, y), (x - sz * 1.25, y + sz)),
                &Paint::Solid(LEAD_WARNING.with_alpha(alpha)),
            );
        }
    }
}

fn chevron(right: (f64, f64), tip: (f64, f64), left: (f64, f64)) -> Path2D {
    let mut path = Path2D::new();
    path.move_to(right.0, right.1);
    path.line_to(tip.0, tip.1);
    path.line_to(left.0, left.1);
    path.line_to(right.0, right.1);
    path
}

impl OverlayLayer for LeadLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::LeadVehicles
    }

    fn draw(&self, surface: &mut dyn Surface, frame: &CalibratedFrame, events: &LayerEvents) {
        let Some(live20) = events.live20() else {
            return;
        };
        if live20.lead_one.status {
            self.draw_lead(surface, frame, &live20.lead_one, false);
        }
        if live20.lead_two.status {
            self.draw_lead(surface, frame, &live20.lead_two, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::driveview_calibration::CalibrationCache;
    use approx::assert_relative_eq;
    use driveview_env::{Color, DisplayList, DrawOp};
    use proptest::prelude::*;

    fn frame() -> CalibratedFrame {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&road_calibration(1)));
        cache.current().cloned().unwrap()
    }

    fn lead(d_rel: f64, y_rel: f64, v_rel: f64) -> LeadData {
        LeadData {
            status: true,
            d_rel,
            y_rel,
            v_rel,
        }
    }

    fn fill_colors(list: &DisplayList) -> Vec<Color> {
        list.ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillPath {
                    paint: Paint::Solid(c), ..
                } => Some(*c),
                _ => None,
            })
            .collect()
    }

    fn draw(lead_one: LeadData, lead_two: LeadData) -> DisplayList {
        let layer = LeadLayer::new(LeadStyle::default());
        let mut events = LayerEvents::default();
        events.insert(live20(1, lead_one, lead_two));
        let mut list = DisplayList::new(1164.0, 874.0);
        layer.draw(&mut list, &frame(), &events);
        list
    }

    #[test]
    fn test_alpha_at_zero_distance_is_full() {
        assert_eq!(lead_alpha(0.0, 0.0, &LeadStyle::default()), 1.0);
    }

    #[test]
    fn test_alpha_beyond_threshold_is_zero() {
        let style = LeadStyle::default();
        assert_eq!(lead_alpha(40.0, -20.0, &style), 0.0);
        assert_eq!(lead_alpha(75.0, 0.0, &style), 0.0);
    }

    #[test]
    fn test_alpha_closing_speed_adds() {
        let style = LeadStyle::default();
        // half the threshold away, closing at a fifth of the speed buffer
        assert_relative_eq!(lead_alpha(20.0, -2.0, &style), 0.7, epsilon = 1e-12);
        // opening speed is ignored
        assert_relative_eq!(lead_alpha(20.0, 5.0, &style), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_icon_size_clamped() {
        assert_eq!(lead_icon_size(0.0), 750.0 / (2.7 / 3.0 + 30.0));
        assert_eq!(lead_icon_size(200.0), MIN_ICON_SIZE);
        assert!(lead_icon_size(-100.0) <= MAX_ICON_SIZE);
    }

    #[test]
    fn test_near_lead_gets_warning() {
        let list = draw(lead(10.0, 0.0, -1.0), LeadData::default());
        let colors = fill_colors(&list);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], LEAD_GLOW);
        assert_eq!((colors[1].r, colors[1].g, colors[1].b), (201, 34, 49));
        assert_relative_eq!(colors[1].a, 0.75 + 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_far_lead_glow_only() {
        let list = draw(lead(60.0, 0.0, 0.0), LeadData::default());
        assert_eq!(fill_colors(&list), vec![LEAD_GLOW]);
    }

    #[test]
    fn test_secondary_lead_is_dimmed() {
        let list = draw(LeadData::default(), lead(10.0, 0.0, 0.0));
        let colors = fill_colors(&list);
        assert_eq!(colors[0], LEAD_GLOW.with_alpha(0.5));
        assert_relative_eq!(colors[1].a, 0.75 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_secondary_lead_is_smaller() {
        let primary = draw(lead(10.0, 0.0, 0.0), LeadData::default());
        let secondary = draw(LeadData::default(), lead(10.0, 0.0, 0.0));
        let width = |list: &DisplayList| match &list.ops()[0] {
            DrawOp::FillPath { path, .. } => {
                let v = path.vertices();
                v[0].0 - v[2].0
            }
            other => panic!("unexpected op {:?}", other),
        };
        assert_relative_eq!(width(&primary), width(&secondary) * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_status_skipped() {
        let mut one = lead(10.0, 0.0, 0.0);
        one.status = false;
        let list = draw(one, LeadData::default());
        assert_eq!(list.op_count(), 0);
    }

    #[test]
    fn test_lead_off_left_edge_skipped() {
        // Far to the left of a narrow field of view projects to negative x
        let list = draw(lead(5.0, 30.0, 0.0), LeadData::default());
        assert_eq!(list.op_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_alpha_in_unit_range(d_rel in -10.0f64..200.0, v_rel in -50.0f64..50.0) {
            let alpha = lead_alpha(d_rel, v_rel, &LeadStyle::default());
            prop_assert!((0.0..=1.0).contains(&alpha));
        }

        #[test]
        fn prop_icon_size_in_bounds(d_rel in 0.0f64..500.0) {
            let size = lead_icon_size(d_rel);
            prop_assert!((MIN_ICON_SIZE..=MAX_ICON_SIZE).contains(&size));
        }
    }
}
