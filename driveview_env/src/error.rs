//! Error types for the DriveView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq)]
pub enum EnvError {
    /// The frame scheduler stopped producing frames (shutdown, budget exhausted)
    #[error("Frame scheduler closed")]
    SchedulerClosed,

    /// A calibration matrix arrived with the wrong number of elements
    #[error("Invalid {name} matrix: expected {expected} elements, got {actual}")]
    InvalidMatrix {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Segment URL has no usable final path component
    #[error("Invalid segment URL: {0}")]
    InvalidSegmentUrl(String),
}

impl EnvError {
    /// Creates a matrix shape error.
    pub fn matrix(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidMatrix {
            name,
            expected,
            actual,
        }
    }

    /// Creates a segment URL error.
    pub fn segment_url(url: impl Into<String>) -> Self {
        Self::InvalidSegmentUrl(url.into())
    }
}
