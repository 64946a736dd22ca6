//! Telemetry snapshots consumed by the overlay renderers.
//!
//! All events are immutable snapshots handed out by the timeline store and
//! carry their own `log_mono_time`, which is the only field the renderers
//! use for change detection.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};

/// Camera pose / lens correction snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Monotonic log time of the calibration message (nanoseconds)
    pub log_mono_time: u64,

    /// Row-major 3×4 extrinsic matrix (device frame → camera frame)
    pub extrinsic: [f64; 12],

    /// Row-major 3×3 warp homography
    pub warp: [f64; 9],
}

impl Calibration {
    /// Builds a calibration from loosely-typed matrix slices, validating shapes.
    pub fn from_slices(log_mono_time: u64, extrinsic: &[f64], warp: &[f64]) -> Result<Self, EnvError> {
        let extrinsic: [f64; 12] = extrinsic
            .try_into()
            .map_err(|_| EnvError::matrix("extrinsic", 12, extrinsic.len()))?;
        let warp: [f64; 9] = warp
            .try_into()
            .map_err(|_| EnvError::matrix("warp", 9, warp.len()))?;
        Ok(Self {
            log_mono_time,
            extrinsic,
            warp,
        })
    }
}

/// A single lane boundary estimate from the driving model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneLine {
    /// Lateral offset (meters) sampled at 1 m longitudinal steps
    pub points: Vec<f64>,

    /// Existence probability (0.0 - 1.0)
    pub prob: f64,

    /// Lateral standard deviation (meters)
    pub std: f64,
}

/// Driving model output: planned path plus lane boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvent {
    pub log_mono_time: u64,
    pub path: LaneLine,
    pub left_lane: LaneLine,
    pub right_lane: LaneLine,
}

/// Short-horizon planned trajectory from the motion controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcEvent {
    pub log_mono_time: u64,

    /// Longitudinal sample positions (meters)
    pub x: Vec<f64>,

    /// Lateral sample positions (meters)
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CruiseState {
    pub enabled: bool,
    pub available: bool,
}

/// Vehicle state relevant to the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarStateEvent {
    pub log_mono_time: u64,

    /// Steering wheel angle (degrees, positive = left)
    pub steering_angle_deg: f64,

    pub cruise: CruiseState,
}

/// One tracked lead vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LeadData {
    /// Detection is valid
    pub status: bool,

    /// Relative distance (meters)
    pub d_rel: f64,

    /// Relative lateral offset (meters)
    pub y_rel: f64,

    /// Relative speed (m/s, negative = closing)
    pub v_rel: f64,
}

/// Radar/vision lead detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Live20Event {
    pub log_mono_time: u64,
    pub lead_one: LeadData,
    pub lead_two: LeadData,
}

/// Named telemetry queries answered by the timeline store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventQuery {
    Model,
    Mpc,
    CarState,
    Live20,
}

impl EventQuery {
    /// Returns the query name.
    pub fn name(&self) -> &'static str {
        match self {
            EventQuery::Model => "model",
            EventQuery::Mpc => "mpc",
            EventQuery::CarState => "carState",
            EventQuery::Live20 => "live20",
        }
    }
}

impl std::fmt::Display for EventQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Any telemetry event the store can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    Model(ModelEvent),
    Mpc(MpcEvent),
    CarState(CarStateEvent),
    Live20(Live20Event),
}

impl TelemetryEvent {
    /// Monotonic log time of the underlying message.
    pub fn log_mono_time(&self) -> u64 {
        match self {
            TelemetryEvent::Model(e) => e.log_mono_time,
            TelemetryEvent::Mpc(e) => e.log_mono_time,
            TelemetryEvent::CarState(e) => e.log_mono_time,
            TelemetryEvent::Live20(e) => e.log_mono_time,
        }
    }

    /// The query that produces this kind of event.
    pub fn query(&self) -> EventQuery {
        match self {
            TelemetryEvent::Model(_) => EventQuery::Model,
            TelemetryEvent::Mpc(_) => EventQuery::Mpc,
            TelemetryEvent::CarState(_) => EventQuery::CarState,
            TelemetryEvent::Live20(_) => EventQuery::Live20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_shape_validation() {
        let ok = Calibration::from_slices(7, &[0.0; 12], &[0.0; 9]);
        assert!(ok.is_ok());

        let bad = Calibration::from_slices(7, &[0.0; 11], &[0.0; 9]);
        assert_eq!(bad.unwrap_err(), EnvError::matrix("extrinsic", 12, 11));

        let bad_warp = Calibration::from_slices(7, &[0.0; 12], &[0.0; 16]);
        assert_eq!(bad_warp.unwrap_err(), EnvError::matrix("warp", 9, 16));
    }

    #[test]
    fn test_event_query_roundtrip() {
        let event = TelemetryEvent::CarState(CarStateEvent {
            log_mono_time: 42,
            steering_angle_deg: 3.0,
            cruise: CruiseState::default(),
        });
        assert_eq!(event.query(), EventQuery::CarState);
        assert_eq!(event.log_mono_time(), 42);
        assert_eq!(event.query().name(), "carState");
    }
}
