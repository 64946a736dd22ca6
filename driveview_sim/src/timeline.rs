//! Scripted timeline store with synthetic telemetry.

use crate::clock::{lock, SimClock, SIM_EPOCH_MS};
use driveview_env::{
    Calibration, CarStateEvent, CruiseState, EventQuery, LaneLine, LeadData, Live20Event, ModelEvent,
    MpcEvent, PlaybackState, Segment, TelemetryEvent, TimelineStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Number of points in a model lane line.
const LANE_POINTS: usize = 50;

/// Number of samples in an MPC trajectory.
const MPC_POINTS: usize = 21;

const CAMERA_HEIGHT: f64 = 1.22;
const CAMERA_SETBACK: f64 = 1.5;

/// A change the user (or the replay engine) makes to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimelineAction {
    /// Changes the play speed; 0 pauses
    SetSpeed(f64),
    /// Jumps to an absolute offset (milliseconds)
    SeekTo(i64),
    /// Jumps by a relative amount (milliseconds)
    SeekBy(i64),
}

/// An action applied at a virtual time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_secs: f64,
    pub action: TimelineAction,
}

impl ScriptStep {
    pub fn new(at_secs: f64, action: TimelineAction) -> Self {
        Self { at_secs, action }
    }
}

/// Everything a simulated drive consists of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineScript {
    pub dongle_id: String,
    pub route: String,

    /// Segment length (milliseconds)
    pub segment_len_ms: i64,
    pub segment_count: i64,

    pub initial_offset_ms: i64,
    pub initial_speed: f64,

    /// Playback start relative to simulation start (milliseconds)
    pub start_delay_ms: i64,

    /// Applied in order of `at_secs`
    pub steps: Vec<ScriptStep>,

    /// A new calibration is published every period (seconds)
    pub calibration_period_secs: f64,

    /// Virtual-time windows `[from, to)` with no calibration (seconds)
    pub calibration_dropouts: Vec<(f64, f64)>,

    /// Row-major warp homography published with every calibration
    pub warp: Vec<f64>,

    /// Telemetry publish rate
    pub telemetry_hz: f64,
}

impl Default for TimelineScript {
    fn default() -> Self {
        Self {
            dongle_id: "0123456789abcdef".to_string(),
            route: "2024-01-01--12-00-00".to_string(),
            segment_len_ms: 60_000,
            segment_count: 3,
            initial_offset_ms: 2_000,
            initial_speed: 1.0,
            start_delay_ms: -1_000,
            steps: Vec::new(),
            calibration_period_secs: 30.0,
            calibration_dropouts: Vec::new(),
            warp: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            telemetry_hz: 20.0,
        }
    }
}

impl TimelineScript {
    pub fn route_len_ms(&self) -> i64 {
        self.segment_len_ms * self.segment_count
    }

    pub fn start_time_ms(&self) -> i64 {
        SIM_EPOCH_MS + self.start_delay_ms
    }

    pub fn segment(&self, index: i64) -> Segment {
        Segment::new(
            format!(
                "https://chffrprivate.blob.core.windows.net/{}/{}--{}",
                self.dongle_id, self.route, index
            ),
            index * self.segment_len_ms,
        )
    }

    fn in_dropout(&self, secs: f64) -> bool {
        self.calibration_dropouts
            .iter()
            .any(|&(from, to)| from <= secs && secs < to)
    }
}

#[derive(Debug, Clone)]
struct Cursor {
    offset_ms: f64,
    speed: f64,
    next_step: usize,
    last_secs: f64,
}

/// Timeline store driven by a `TimelineScript` on the shared `SimClock`.
///
/// The offset advances at the current speed once the start time has
/// passed. Telemetry is a smooth function of the offset, published on a
/// fixed grid so the same offset always yields the same events.
pub struct SimTimeline {
    clock: SimClock,
    script: TimelineScript,
    cursor: Mutex<Cursor>,
}

impl SimTimeline {
    pub fn new(clock: SimClock, mut script: TimelineScript) -> Self {
        script.steps.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        let cursor = Cursor {
            offset_ms: script.initial_offset_ms as f64,
            speed: script.initial_speed,
            next_step: 0,
            last_secs: clock.now_secs(),
        };
        Self {
            clock,
            script,
            cursor: Mutex::new(cursor),
        }
    }

    pub fn script(&self) -> &TimelineScript {
        &self.script
    }

    /// Current play speed after scripted changes.
    pub fn speed(&self) -> f64 {
        self.catch_up().speed
    }

    fn catch_up(&self) -> std::sync::MutexGuard<'_, Cursor> {
        let now = self.clock.now_secs();
        let start_secs = self.script.start_delay_ms as f64 / 1000.0;
        let mut cursor = lock(&self.cursor);

        while let Some(step) = self.script.steps.get(cursor.next_step) {
            if step.at_secs > now {
                break;
            }
            progress(&mut cursor, step.at_secs, start_secs);
            match step.action {
                TimelineAction::SetSpeed(speed) => cursor.speed = speed,
                TimelineAction::SeekTo(offset) => cursor.offset_ms = offset as f64,
                TimelineAction::SeekBy(delta) => cursor.offset_ms += delta as f64,
            }
            debug!("Timeline {:?} at {:.2}s", step.action, step.at_secs);
            cursor.next_step += 1;
        }
        progress(&mut cursor, now, start_secs);
        cursor
    }

    fn in_route(&self, offset_ms: i64) -> bool {
        (0..self.script.route_len_ms()).contains(&offset_ms)
    }

    /// Publish time of the latest telemetry sample at or before `offset_ms`.
    fn sample_time_ms(&self, offset_ms: i64) -> i64 {
        let period = ((1000.0 / self.script.telemetry_hz.max(1e-3)) as i64).max(1);
        offset_ms.div_euclid(period) * period
    }

    /// Calibration published for the period containing `secs`.
    ///
    /// A malformed scripted warp yields no calibration, the same way a
    /// corrupt log message would.
    fn calibration_at(&self, secs: f64) -> Option<Calibration> {
        let epoch = (secs / self.script.calibration_period_secs.max(1e-3)).floor() as u64;
        let pitch = (0.5 + 0.25 * (epoch % 3) as f64).to_radians();
        let (s, c) = pitch.sin_cos();
        let log_mono_time = (epoch + 1) * 1_000_000_000;
        let extrinsic = [
            0.0,
            -1.0,
            0.0,
            0.0,
            s,
            0.0,
            -c,
            CAMERA_HEIGHT * c + CAMERA_SETBACK * s,
            c,
            0.0,
            s,
            CAMERA_SETBACK * c - CAMERA_HEIGHT * s,
        ];
        match Calibration::from_slices(log_mono_time, &extrinsic, &self.script.warp) {
            Ok(calibration) => Some(calibration),
            Err(err) => {
                warn!("Dropping calibration log_mono_time={}: {}", log_mono_time, err);
                None
            }
        }
    }
}

/// Moves the offset forward to `to_secs`, counting only time after start.
fn progress(cursor: &mut Cursor, to_secs: f64, start_secs: f64) {
    let from = cursor.last_secs.max(start_secs);
    if to_secs > from {
        cursor.offset_ms += cursor.speed * (to_secs - from) * 1000.0;
    }
    cursor.last_secs = cursor.last_secs.max(to_secs);
}

fn road_curvature(t_secs: f64) -> f64 {
    0.002 * (t_secs / 7.0).sin()
}

fn lane_line(offset: f64, curvature: f64, prob: f64) -> LaneLine {
    LaneLine {
        points: (0..LANE_POINTS)
            .map(|i| offset + curvature * (i as f64).powi(2))
            .collect(),
        prob,
        std: 0.2,
    }
}

fn telemetry(query: EventQuery, t_ms: i64) -> TelemetryEvent {
    let t = t_ms as f64 / 1000.0;
    let log_mono_time = t_ms as u64 * 1_000_000 + 1;
    let curvature = road_curvature(t);
    match query {
        EventQuery::Model => TelemetryEvent::Model(ModelEvent {
            log_mono_time,
            path: lane_line(0.0, curvature, 1.0),
            left_lane: lane_line(1.8, curvature, 0.9),
            right_lane: lane_line(-1.8, curvature, 0.8),
        }),
        EventQuery::Mpc => {
            let x: Vec<f64> = (0..MPC_POINTS).map(|i| i as f64 * 2.0).collect();
            let y = x.iter().map(|x| curvature * x * x).collect();
            TelemetryEvent::Mpc(MpcEvent { log_mono_time, x, y })
        }
        EventQuery::CarState => TelemetryEvent::CarState(CarStateEvent {
            log_mono_time,
            steering_angle_deg: 30.0 * (t / 5.0).sin(),
            cruise: CruiseState {
                enabled: (t / 20.0).floor() as i64 % 2 == 0,
                available: true,
            },
        }),
        EventQuery::Live20 => TelemetryEvent::Live20(Live20Event {
            log_mono_time,
            lead_one: LeadData {
                status: true,
                d_rel: 25.0 + 15.0 * (t / 6.0).sin(),
                y_rel: 0.5 * (t / 3.0).sin(),
                v_rel: 2.5 * (t / 6.0).cos(),
            },
            lead_two: LeadData {
                status: t.rem_euclid(10.0) < 5.0,
                d_rel: 55.0,
                y_rel: -3.5,
                v_rel: -1.0,
            },
        }),
    }
}

impl TimelineStore for SimTimeline {
    fn current_offset(&self) -> i64 {
        self.catch_up().offset_ms.floor() as i64
    }

    fn playback(&self) -> PlaybackState {
        let (offset_ms, speed) = {
            let cursor = self.catch_up();
            (cursor.offset_ms.floor() as i64, cursor.speed)
        };
        let script = &self.script;
        let index = offset_ms.div_euclid(script.segment_len_ms.max(1));

        let (current_segment, next_segment) = if offset_ms < 0 {
            (None, Some(script.segment(0)))
        } else if index >= script.segment_count {
            (None, None)
        } else {
            let next = (index + 1 < script.segment_count).then(|| script.segment(index + 1));
            (Some(script.segment(index)), next)
        };

        PlaybackState {
            current_segment,
            next_segment,
            play_speed: speed,
            start_time_ms: script.start_time_ms(),
        }
    }

    fn calibration(&self, route: &str) -> Option<Calibration> {
        if route != self.script.route {
            return None;
        }
        let now = self.clock.now_secs();
        if self.script.in_dropout(now) {
            return None;
        }
        self.calibration_at(now)
    }

    fn latest(&self, query: EventQuery) -> Option<TelemetryEvent> {
        let offset_ms = self.current_offset();
        if !self.in_route(offset_ms) {
            return None;
        }
        Some(telemetry(query, self.sample_time_ms(offset_ms)))
    }
}
