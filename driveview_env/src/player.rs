//! Video player and still-image abstractions.

use crate::types::PlayerState;

/// Control surface of the opaque video player.
///
/// # Implementations
///
/// - **Production**: wraps an HLS-capable media element
/// - **Simulation**: `SimPlayer` - buffering model with seeded latency
///
/// # Semantics
///
/// Commands are fire-and-forget. Their effect (a finished seek, a new
/// buffered range, a changed `paused` flag) becomes visible through
/// `state()` on a later tick; callers never wait for them.
pub trait VideoPlayer {
    /// Returns a point-in-time snapshot of the player.
    fn state(&self) -> PlayerState;

    /// Starts a seek to the given media time (seconds).
    fn seek(&mut self, seconds: f64);

    /// Requests playback to resume.
    fn play(&mut self);

    /// Requests playback to pause.
    fn pause(&mut self);

    /// Replaces the media source and restarts loading.
    fn load(&mut self, src: &str);

    /// Sets the playback rate multiplier.
    fn set_playback_rate(&mut self, rate: f64);
}

/// The still-image element layered over the video.
pub trait StillImage {
    /// Currently assigned image source.
    fn src(&self) -> &str;

    /// Assigns a new image source (triggers a fetch in production).
    fn set_src(&mut self, src: &str);

    /// Sets opacity (0.0 hidden, 1.0 fully visible).
    fn set_opacity(&mut self, opacity: f64);
}

/// Plain in-memory still image; records what it was told to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageElement {
    pub src: String,
    pub opacity: f64,

    /// Number of source assignments so far
    pub loads: u64,
}

impl ImageElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

impl StillImage for ImageElement {
    fn src(&self) -> &str {
        &self.src
    }

    fn set_src(&mut self, src: &str) {
        self.src = src.to_string();
        self.loads += 1;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }
}
