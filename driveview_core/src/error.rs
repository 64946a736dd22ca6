//! Error types for DriveView core.
//!
//! The per-tick paths (sync, calibration, rendering) never fail: not-ready
//! inputs skip work and out-of-range times become state. Errors only exist
//! at the edges, when configuration is loaded.

use thiserror::Error;

/// Errors raised while loading a `DriveViewConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}
