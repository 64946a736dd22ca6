//! DriveView Metrics Module
//! ========================
//!
//! Counters collected by the orchestrator each tick:
//! - **SyncStats**: how the controller reconciled player and timeline
//! - **RenderStats**: how often each overlay layer was redrawn or cleared
//!
//! Both are plain data, serializable so the simulation harness can export them.

use crate::driveview_sync::{Correction, SyncOutcome};
use crate::overlay::LayerKind;
use serde::{Deserialize, Serialize};

/// Sync controller decision counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Ticks seen by the controller
    pub ticks: u64,
    /// Ticks skipped because the player could not report state
    pub skipped: u64,
    /// Seeks issued
    pub hard_seeks: u64,
    /// Rate nudges toward the target
    pub soft_corrections: u64,
    /// Ticks that ran at the nominal speed
    pub nominal: u64,
    /// Ticks where playback was not requested (no segment or zero speed)
    pub idle: u64,
    /// Hard corrections suppressed because the target lay outside the video
    pub unavailable: u64,
    pub plays: u64,
    pub pauses: u64,
    /// Changes of the no-video flag
    pub no_video_transitions: u64,
    /// Ticks with the still-image fallback visible
    pub fallback_ticks: u64,
}

impl SyncStats {
    /// Folds one tick outcome into the counters.
    pub fn record(&mut self, outcome: &SyncOutcome) {
        self.ticks += 1;
        match outcome.correction {
            Correction::Skipped => self.skipped += 1,
            Correction::Seek { .. } => self.hard_seeks += 1,
            Correction::Rate { .. } => self.soft_corrections += 1,
            Correction::Nominal { .. } => self.nominal += 1,
            Correction::Idle => self.idle += 1,
            Correction::Unavailable => self.unavailable += 1,
        }
        if outcome.played {
            self.plays += 1;
        }
        if outcome.paused {
            self.pauses += 1;
        }
        if outcome.no_video_changed.is_some() {
            self.no_video_transitions += 1;
        }
        if outcome.show_fallback == Some(true) {
            self.fallback_ticks += 1;
        }
    }

    /// Fraction of non-skipped ticks that needed no correction.
    pub fn in_sync_ratio(&self) -> f64 {
        let active = self.ticks - self.skipped - self.idle;
        if active == 0 {
            return 1.0;
        }
        self.nominal as f64 / active as f64
    }
}

/// Per-layer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStats {
    pub redraws: u64,
    pub clears: u64,
}

/// Overlay render counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Render passes run (excludes ticks with the UI hidden)
    pub passes: u64,
    /// Passes that found no calibration
    pub missing_calibration: u64,
    /// Calibration changes observed
    pub calibration_changes: u64,
    pub lane_and_path: LayerStats,
    pub lead_vehicles: LayerStats,
    pub car_state: LayerStats,
}

impl RenderStats {
    pub fn layer(&self, kind: LayerKind) -> &LayerStats {
        match kind {
            LayerKind::LaneAndPath => &self.lane_and_path,
            LayerKind::LeadVehicles => &self.lead_vehicles,
            LayerKind::CarState => &self.car_state,
        }
    }

    pub fn layer_mut(&mut self, kind: LayerKind) -> &mut LayerStats {
        match kind {
            LayerKind::LaneAndPath => &mut self.lane_and_path,
            LayerKind::LeadVehicles => &mut self.lead_vehicles,
            LayerKind::CarState => &mut self.car_state,
        }
    }

    pub fn total_redraws(&self) -> u64 {
        LayerKind::all().iter().map(|k| self.layer(*k).redraws).sum()
    }
}
