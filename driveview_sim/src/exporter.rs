//! JSON exporter for simulation runs.
//!
//! Samples the view a few times per second so a run can be plotted
//! (offset vs. player time, corrections, overlay redraws) after the fact.

use crate::error::SimError;
use driveview_core::{RenderStats, SyncStats};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One sampled tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Timeline offset (milliseconds)
    pub offset_ms: i64,

    /// Player media time (seconds)
    pub player_time: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<f64>,

    /// Correction chosen by the controller (`seek`, `rate`, ...)
    pub correction: String,

    pub playback_rate: f64,
    pub show_fallback: bool,
    pub no_video: bool,

    /// Calibration status of the render pass, if one ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<String>,

    /// Layers redrawn on this tick
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redrawn: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Notable things that happened on a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some("warn".to_string()),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub sync: SyncStats,
    pub render: RenderStats,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
            sync: SyncStats::default(),
            render: RenderStats::default(),
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>, sync: SyncStats, render: RenderStats) {
        self.passed = passed;
        self.failure_reason = failure_reason;
        self.sync = sync;
        self.render = render;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        File::create(path)
            .and_then(|mut file| file.write_all(json.as_bytes()))
            .map_err(|source| SimError::Write {
                path: path.to_string(),
                source,
            })
    }
}
