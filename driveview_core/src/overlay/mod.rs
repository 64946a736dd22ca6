//! Overlay Renderers - calibrated telemetry drawn over the video
//!
//! Three layers, each owning its own drawing surface:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  LaneAndPath   model + mpc + carState  → lane.rs             │
//! │  LeadVehicles  live20                  → lead.rs             │
//! │  CarState      carState                → car_state.rs        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A layer is only redrawn when one of its inputs changed. The
//! `ChangeTracker` remembers the `log_mono_time` last drawn for every
//! (layer, query) pair; a new timestamp, or an event that disappeared,
//! marks the layer dirty. A calibration change marks every layer dirty
//! since all geometry depends on it.

mod car_state;
mod lane;
mod lead;

pub use car_state::CarStateLayer;
pub use lane::{reference_quad, LanePathLayer};
pub use lead::{lead_alpha, lead_icon_size, LeadLayer};

use crate::config::{DriveViewConfig, ViewportConfig};
use crate::driveview_calibration::{CalibratedFrame, CalibrationCache, CalibrationStatus};
use crate::metrics::RenderStats;
use driveview_env::{
    CarStateEvent, Color, EventQuery, Live20Event, ModelEvent, MpcEvent, Surface, TelemetryEvent,
    TimelineStore, Transform2D,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

/// Engaged (cruise enabled) state color.
pub const ENGAGED_GREEN: Color = Color::rgb(23, 134, 68);

/// Driving (not engaged) state color.
pub const DRIVING_BLUE: Color = Color::rgb(23, 88, 134);

/// Lead vehicle glow.
pub const LEAD_GLOW: Color = Color::rgb(218, 202, 37);

/// Lead vehicle proximity warning.
pub const LEAD_WARNING: Color = Color::rgb(201, 34, 49);

pub const WHITE: Color = Color::rgb(255, 255, 255);

/// Asset key of the steering wheel icon pattern.
pub const WHEEL_PATTERN: &str = "wheel";

/// Logical overlay layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    LaneAndPath,
    LeadVehicles,
    CarState,
}

impl LayerKind {
    pub fn all() -> &'static [LayerKind] {
        &[LayerKind::LaneAndPath, LayerKind::LeadVehicles, LayerKind::CarState]
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::LaneAndPath => "lane_and_path",
            LayerKind::LeadVehicles => "lead_vehicles",
            LayerKind::CarState => "car_state",
        }
    }

    /// Telemetry queries whose events this layer draws.
    pub fn queries(&self) -> &'static [EventQuery] {
        match self {
            LayerKind::LaneAndPath => &[EventQuery::Model, EventQuery::Mpc, EventQuery::CarState],
            LayerKind::LeadVehicles => &[EventQuery::Live20],
            LayerKind::CarState => &[EventQuery::CarState],
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Events fetched for one render pass, keyed by query.
#[derive(Debug, Clone, Default)]
pub struct LayerEvents {
    events: BTreeMap<EventQuery, TelemetryEvent>,
}

impl LayerEvents {
    /// Fetches every query any layer needs, once each.
    pub fn fetch<T: TimelineStore + ?Sized>(store: &T) -> Self {
        let mut events = BTreeMap::new();
        for kind in LayerKind::all() {
            for query in kind.queries() {
                if events.contains_key(query) {
                    continue;
                }
                if let Some(event) = store.latest(*query) {
                    events.insert(*query, event);
                }
            }
        }
        Self { events }
    }

    pub fn insert(&mut self, event: TelemetryEvent) {
        self.events.insert(event.query(), event);
    }

    pub fn get(&self, query: EventQuery) -> Option<&TelemetryEvent> {
        self.events.get(&query)
    }

    pub fn model(&self) -> Option<&ModelEvent> {
        match self.get(EventQuery::Model) {
            Some(TelemetryEvent::Model(e)) => Some(e),
            _ => None,
        }
    }

    pub fn mpc(&self) -> Option<&MpcEvent> {
        match self.get(EventQuery::Mpc) {
            Some(TelemetryEvent::Mpc(e)) => Some(e),
            _ => None,
        }
    }

    pub fn car_state(&self) -> Option<&CarStateEvent> {
        match self.get(EventQuery::CarState) {
            Some(TelemetryEvent::CarState(e)) => Some(e),
            _ => None,
        }
    }

    pub fn live20(&self) -> Option<&Live20Event> {
        match self.get(EventQuery::Live20) {
            Some(TelemetryEvent::Live20(e)) => Some(e),
            _ => None,
        }
    }
}

/// Last drawn `log_mono_time` per (layer, query).
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    seen: HashMap<(LayerKind, EventQuery), u64>,
    forced: HashSet<LayerKind>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the layer's current inputs and reports whether it must redraw.
    ///
    /// Every query is recorded even after a change is found, so the next
    /// pass compares against what was actually drawn.
    pub fn observe(&mut self, layer: LayerKind, events: &LayerEvents) -> bool {
        let mut changed = self.forced.remove(&layer);
        for query in layer.queries() {
            let key = (layer, *query);
            match events.get(*query) {
                Some(event) => {
                    let time = event.log_mono_time();
                    if self.seen.insert(key, time) != Some(time) {
                        changed = true;
                    }
                }
                None => {
                    if self.seen.remove(&key).is_some() {
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Forgets everything and forces every layer to redraw on its next pass.
    pub fn invalidate(&mut self) {
        self.seen.clear();
        self.forced.extend(LayerKind::all().iter().copied());
    }

    pub fn last_seen(&self, layer: LayerKind, query: EventQuery) -> Option<u64> {
        self.seen.get(&(layer, query)).copied()
    }
}

/// Draws one layer's geometry onto a freshly prepared surface.
pub trait OverlayLayer {
    fn kind(&self) -> LayerKind;

    /// The surface is already cleared and scaled to the logical viewport.
    fn draw(&self, surface: &mut dyn Surface, frame: &CalibratedFrame, events: &LayerEvents);
}

/// Resets a surface for a full redraw and maps the logical viewport onto it.
pub fn prepare_surface(surface: &mut dyn Surface, viewport: &ViewportConfig) {
    let (width, height) = surface.client_size();
    surface.resize(width, height);
    surface.set_transform(Transform2D::IDENTITY);
    surface.clear_rect(0.0, 0.0, width, height);
    surface.scale(width / viewport.width, height / viewport.height);
}

/// Result of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub calibration: CalibrationStatus,
    pub redrawn: Vec<LayerKind>,
}

struct LayerSlot<S> {
    layer: Box<dyn OverlayLayer + Send + Sync>,
    surface: S,
}

/// Owns the layers, their surfaces, the calibration cache and the change tracker.
pub struct OverlayRenderer<S: Surface> {
    slots: Vec<LayerSlot<S>>,
    calibration: CalibrationCache,
    tracker: ChangeTracker,
    viewport: ViewportConfig,
    stats: RenderStats,
}

impl<S: Surface> OverlayRenderer<S> {
    /// Creates the three standard layers over the given surfaces.
    pub fn new(config: &DriveViewConfig, lane_surface: S, lead_surface: S, car_state_surface: S) -> Self {
        let viewport = config.viewport.clone();
        let slots = vec![
            LayerSlot {
                layer: Box::new(LanePathLayer::new(viewport.clone())) as Box<dyn OverlayLayer + Send + Sync>,
                surface: lane_surface,
            },
            LayerSlot {
                layer: Box::new(LeadLayer::new(config.lead.clone())),
                surface: lead_surface,
            },
            LayerSlot {
                layer: Box::new(CarStateLayer::new(viewport.clone())),
                surface: car_state_surface,
            },
        ];
        Self {
            slots,
            calibration: CalibrationCache::new(),
            tracker: ChangeTracker::new(),
            viewport,
            stats: RenderStats::default(),
        }
    }

    /// Runs one pass: refresh calibration, fetch events, redraw dirty layers.
    pub fn render_pass<T: TimelineStore + ?Sized>(&mut self, store: &T, route: &str) -> RenderReport {
        self.stats.passes += 1;
        let calibration = store.calibration(route);
        let status = self.calibration.observe(calibration.as_ref());

        match status {
            CalibrationStatus::Missing => {
                self.stats.missing_calibration += 1;
                self.tracker.invalidate();
                for slot in &mut self.slots {
                    slot.surface.clear_all();
                    self.stats.layer_mut(slot.layer.kind()).clears += 1;
                }
                return RenderReport {
                    calibration: status,
                    redrawn: Vec::new(),
                };
            }
            CalibrationStatus::Changed => {
                self.stats.calibration_changes += 1;
                self.tracker.invalidate();
            }
            CalibrationStatus::Unchanged => {}
        }

        let Some(frame) = self.calibration.current() else {
            return RenderReport {
                calibration: status,
                redrawn: Vec::new(),
            };
        };

        let events = LayerEvents::fetch(store);
        let mut redrawn = Vec::new();
        for slot in &mut self.slots {
            let kind = slot.layer.kind();
            if !self.tracker.observe(kind, &events) {
                trace!("Layer {} unchanged", kind);
                continue;
            }
            debug!("Redrawing layer {}", kind);
            prepare_surface(&mut slot.surface, &self.viewport);
            slot.layer.draw(&mut slot.surface, frame, &events);
            self.stats.layer_mut(kind).redraws += 1;
            redrawn.push(kind);
        }

        RenderReport {
            calibration: status,
            redrawn,
        }
    }

    pub fn surface(&self, kind: LayerKind) -> Option<&S> {
        self.slots
            .iter()
            .find(|slot| slot.layer.kind() == kind)
            .map(|slot| &slot.surface)
    }

    pub fn surface_mut(&mut self, kind: LayerKind) -> Option<&mut S> {
        self.slots
            .iter_mut()
            .find(|slot| slot.layer.kind() == kind)
            .map(|slot| &mut slot.surface)
    }

    pub fn calibration(&self) -> &CalibrationCache {
        &self.calibration
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use driveview_env::{
        Calibration, CarStateEvent, CruiseState, EventQuery, LaneLine, LeadData, Live20Event,
        ModelEvent, MpcEvent, PlaybackState, TelemetryEvent, TimelineStore,
    };
    use std::collections::BTreeMap;

    /// Camera 1.2 m above the road and 1.5 m behind the vehicle origin,
    /// looking down the vehicle x axis.
    pub fn road_calibration(log_mono_time: u64) -> Calibration {
        Calibration {
            log_mono_time,
            extrinsic: [0.0, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 1.2, 1.0, 0.0, 0.0, 1.5],
            warp: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn lane(offset: f64, prob: f64) -> LaneLine {
        LaneLine {
            points: vec![offset; 50],
            prob,
            std: 0.2,
        }
    }

    pub fn model(log_mono_time: u64) -> TelemetryEvent {
        TelemetryEvent::Model(ModelEvent {
            log_mono_time,
            path: lane(0.0, 1.0),
            left_lane: lane(1.8, 0.9),
            right_lane: lane(-1.8, 0.7),
        })
    }

    pub fn mpc(log_mono_time: u64) -> TelemetryEvent {
        TelemetryEvent::Mpc(MpcEvent {
            log_mono_time,
            x: (0..21).map(|i| i as f64 * 2.0).collect(),
            y: vec![0.0; 21],
        })
    }

    pub fn car_state(log_mono_time: u64, enabled: bool, angle: f64) -> TelemetryEvent {
        TelemetryEvent::CarState(CarStateEvent {
            log_mono_time,
            steering_angle_deg: angle,
            cruise: CruiseState {
                enabled,
                available: true,
            },
        })
    }

    pub fn live20(log_mono_time: u64, lead_one: LeadData, lead_two: LeadData) -> TelemetryEvent {
        TelemetryEvent::Live20(Live20Event {
            log_mono_time,
            lead_one,
            lead_two,
        })
    }

    /// In-memory store with directly settable contents.
    #[derive(Default)]
    pub struct FixedStore {
        pub offset_ms: i64,
        pub playback: PlaybackState,
        pub calibration: Option<Calibration>,
        pub events: BTreeMap<EventQuery, TelemetryEvent>,
    }

    impl FixedStore {
        pub fn with_all(time: u64) -> Self {
            let mut store = Self {
                calibration: Some(road_calibration(1)),
                ..Default::default()
            };
            store.set(model(time));
            store.set(mpc(time));
            store.set(car_state(time, true, 10.0));
            store.set(live20(
                time,
                LeadData {
                    status: true,
                    d_rel: 20.0,
                    y_rel: 0.0,
                    v_rel: -2.0,
                },
                LeadData::default(),
            ));
            store
        }

        pub fn set(&mut self, event: TelemetryEvent) {
            self.events.insert(event.query(), event);
        }
    }

    impl TimelineStore for FixedStore {
        fn current_offset(&self) -> i64 {
            self.offset_ms
        }
        fn playback(&self) -> PlaybackState {
            self.playback.clone()
        }
        fn calibration(&self, _route: &str) -> Option<Calibration> {
            self.calibration.clone()
        }
        fn latest(&self, query: EventQuery) -> Option<TelemetryEvent> {
            self.events.get(&query).cloned()
        }
    }
}
