//! Common types shared between the DriveView core and its environment.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};

/// One contiguous recorded video chunk and its position within the drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Base URL of the segment; the final path component is the segment id
    pub url: String,

    /// Offset of the segment's first frame within the drive (milliseconds)
    pub route_offset_ms: i64,
}

impl Segment {
    /// Creates a new segment.
    pub fn new(url: impl Into<String>, route_offset_ms: i64) -> Self {
        Self {
            url: url.into(),
            route_offset_ms,
        }
    }

    /// Returns the opaque segment id (final path component of the URL).
    pub fn segment_id(&self) -> Result<&str, EnvError> {
        match self.url.trim_end_matches('/').rsplit('/').next() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(EnvError::segment_url(&self.url)),
        }
    }
}

/// A contiguous buffered time range of the video element, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferedRange {
    pub start: f64,
    pub end: f64,
}

impl BufferedRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Snapshot of the video player, polled once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current media time (seconds)
    pub current_time: f64,

    /// Media duration (seconds); `None` or NaN while metadata is loading
    pub duration: Option<f64>,

    /// Buffered ranges; `None` while the player cannot report them yet
    pub buffered: Option<Vec<BufferedRange>>,

    pub paused: bool,
    pub seeking: bool,

    /// Playback stalled waiting for data
    pub waiting: bool,
}

impl PlayerState {
    /// A player that has not loaded any metadata yet.
    pub fn unloaded() -> Self {
        Self {
            current_time: 0.0,
            duration: None,
            buffered: None,
            paused: true,
            seeking: false,
            waiting: false,
        }
    }

    /// Returns the duration if the player can report a real one.
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| !d.is_nan())
    }

    /// Returns the buffered ranges, or an empty slice if not reported.
    pub fn buffered_ranges(&self) -> &[BufferedRange] {
        self.buffered.as_deref().unwrap_or(&[])
    }

    /// True when at least one buffered range is reported.
    pub fn has_buffered_data(&self) -> bool {
        !self.buffered_ranges().is_empty()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::unloaded()
    }
}

/// Playback snapshot published by the timeline store alongside the offset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Segment containing the current offset, if any
    pub current_segment: Option<Segment>,

    /// Segment that will start next (used when between segments)
    pub next_segment: Option<Segment>,

    /// Nominal signed playback rate; 0 when paused
    pub play_speed: f64,

    /// Wall-clock time (Unix ms) at which playback is due to start
    pub start_time_ms: i64,
}

impl PlaybackState {
    /// Current segment, falling back to the next one.
    pub fn active_segment(&self) -> Option<&Segment> {
        self.current_segment.as_ref().or(self.next_segment.as_ref())
    }

    /// Play speed gated on the start time having passed.
    pub fn effective_speed(&self, now_ms: i64) -> f64 {
        if self.start_time_ms < now_ms {
            self.play_speed
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_id_is_last_path_component() {
        let seg = Segment::new("https://data.example/a1b2c3/2026-01-01--10-00-00--4", 240_000);
        assert_eq!(seg.segment_id().unwrap(), "2026-01-01--10-00-00--4");
    }

    #[test]
    fn test_segment_id_ignores_trailing_slash() {
        let seg = Segment::new("https://data.example/a1b2c3/route--2/", 0);
        assert_eq!(seg.segment_id().unwrap(), "route--2");
    }

    #[test]
    fn test_segment_id_rejects_empty() {
        let seg = Segment::new("", 0);
        assert!(seg.segment_id().is_err());
    }

    #[test]
    fn test_nan_duration_is_unknown() {
        let mut state = PlayerState::unloaded();
        state.duration = Some(f64::NAN);
        assert_eq!(state.known_duration(), None);
        state.duration = Some(60.0);
        assert_eq!(state.known_duration(), Some(60.0));
    }

    #[test]
    fn test_effective_speed_waits_for_start() {
        let playback = PlaybackState {
            play_speed: 2.0,
            start_time_ms: 1_000,
            ..Default::default()
        };
        assert_eq!(playback.effective_speed(999), 0.0);
        assert_eq!(playback.effective_speed(1_000), 0.0);
        assert_eq!(playback.effective_speed(1_001), 2.0);
    }
}
