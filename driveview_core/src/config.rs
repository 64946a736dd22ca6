//! Configuration for the sync controller, viewport and overlay styling.
//!
//! Every section has defaults matching the reference camera and player, so
//! `DriveViewConfig::default()` is a complete configuration. A JSON file only
//! needs to name the fields it overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Drift thresholds used by the sync controller (all in seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Look-ahead the player is expected to buffer (default: 4.0)
    pub buffer_slack_secs: f64,

    /// Drift below this is ignored (default: 0.25)
    pub drift_deadband_secs: f64,

    /// Buffered targets further than this are seeked to (default: 0.5)
    pub buffered_seek_secs: f64,

    /// Multiplier on the slack beyond which any drift is seeked (default: 1.1)
    pub slack_multiplier: f64,

    /// Drift above this shows the still-image fallback (default: 2.0)
    pub fallback_drift_secs: f64,

    /// Distance to a buffered range start still counted as buffered (default: 5.0)
    pub buffered_start_tolerance_secs: f64,

    /// Largest positive rate correction (default: 1.0)
    pub max_rate_boost: f64,

    /// Slowest rate a negative correction may reach (default: 0.25)
    pub min_rate: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            buffer_slack_secs: 4.0,
            drift_deadband_secs: 0.25,
            buffered_seek_secs: 0.5,
            slack_multiplier: 1.1,
            fallback_drift_secs: 2.0,
            buffered_start_tolerance_secs: 5.0,
            max_rate_boost: 1.0,
            min_rate: 0.25,
        }
    }
}

/// Logical viewport the overlay is authored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
    pub border: f64,
}

impl ViewportConfig {
    /// Width of the visualization area inside the border.
    pub fn visible_width(&self) -> f64 {
        self.width - self.border * 2.0
    }

    /// Height of the box inside the border.
    pub fn box_height(&self) -> f64 {
        self.height - self.border * 2.0
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1164.0,
            height: 874.0,
            border: 30.0,
        }
    }
}

/// Lead vehicle marker tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadStyle {
    /// Distance (m) under which the red warning is drawn (default: 40)
    pub proximity_threshold: f64,

    /// Closing speed (m/s) that alone saturates the warning (default: 10)
    pub speed_buffer: f64,

    /// Size divisor for the secondary lead (default: 2.0)
    pub secondary_size_divisor: f64,

    /// Warning alpha divisor for the secondary lead (default: 2.0)
    pub secondary_alpha_divisor: f64,
}

impl Default for LeadStyle {
    fn default() -> Self {
        Self {
            proximity_threshold: 40.0,
            speed_buffer: 10.0,
            secondary_size_divisor: 2.0,
            secondary_alpha_divisor: 2.0,
        }
    }
}

/// Where video and still images are fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Host prefix of the HLS streaming endpoint
    pub video_host: String,

    /// Granularity of cached still frames (default: 1000 ms)
    pub image_granularity_ms: i64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            video_host: "//video.comma.ai".to_string(),
            image_granularity_ms: 1000,
        }
    }
}

/// Complete DriveView configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveViewConfig {
    pub sync: SyncConfig,
    pub viewport: ViewportConfig,
    pub lead: LeadStyle,
    pub sources: SourceConfig,
}

impl DriveViewConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: DriveViewConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Rejects values that would make the controller or renderer divide by zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return Err(ConfigError::Invalid("viewport must have a positive size".into()));
        }
        if self.viewport.box_height() <= 0.0 {
            return Err(ConfigError::Invalid("viewport border leaves no visible box".into()));
        }
        if self.sources.image_granularity_ms <= 0 {
            return Err(ConfigError::Invalid("image granularity must be positive".into()));
        }
        if self.lead.speed_buffer <= 0.0 || self.lead.proximity_threshold <= 0.0 {
            return Err(ConfigError::Invalid("lead thresholds must be positive".into()));
        }
        if self.sync.buffer_slack_secs < 0.0 || self.sync.drift_deadband_secs < 0.0 {
            return Err(ConfigError::Invalid("sync thresholds must be non-negative".into()));
        }
        Ok(())
    }
}
