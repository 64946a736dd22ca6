//! The "SYNC" Controller - keeps the video player on the master timeline
//!
//! The timeline offset is the single source of truth; the video player is an
//! independently buffering element that lags, stalls and overshoots. Once per
//! tick the controller compares the two and picks the cheapest correction:
//!
//! ```text
//!   |drift| <= deadband                      → run at the nominal speed
//!   |drift| >  slack * 1.1                   ┐
//!   |drift| >  0.5 and target is buffered    ┘→ hard seek (or "no video")
//!   otherwise                                → nudge the playback rate
//! ```
//!
//! A hard seek into unbuffered media lands `slack * speed` seconds ahead of
//! the target so that playback catches up with the timeline while loading.
//! A target outside `[0, duration]` never seeks; it raises the no-video flag.
//!
//! Nothing here fails. An unusable player snapshot skips the tick.

use crate::config::{SourceConfig, SyncConfig};
use crate::sources;
use driveview_env::{BufferedRange, PlaybackState, StillImage, VideoPlayer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Per-tick inputs, read once from the timeline store.
#[derive(Debug, Clone, Copy)]
pub struct SyncInput<'a> {
    /// Global timeline offset (milliseconds)
    pub offset_ms: i64,

    /// Segments and nominal speed for this offset
    pub playback: &'a PlaybackState,

    /// Whether the drive's start time has passed
    pub started: bool,
}

impl SyncInput<'_> {
    /// Play speed after start-time gating.
    pub fn effective_speed(&self) -> f64 {
        if self.started {
            self.playback.play_speed
        } else {
            0.0
        }
    }
}

/// The correction chosen for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Correction {
    /// Player state unusable, nothing touched
    #[default]
    Skipped,
    /// Not playing (no current segment or zero speed)
    Idle,
    /// Hard correction needed but the target lies outside the video
    Unavailable,
    /// Seek issued to `target` seconds
    Seek { target: f64 },
    /// Playback rate nudged to `rate`
    Rate { rate: f64 },
    /// In sync; playback rate set to the nominal speed
    Nominal { rate: f64 },
}

/// Everything the controller did on one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub correction: Correction,

    /// Drift between target and player time; `None` when not computed
    pub drift: Option<f64>,

    /// Fallback visibility; `None` when the tick was skipped
    pub show_fallback: Option<bool>,

    /// `play()` was requested
    pub played: bool,

    /// `pause()` was requested
    pub paused: bool,

    /// New value of the no-video flag, when it changed
    pub no_video_changed: Option<bool>,
}

/// True when `desired` lies strictly inside a buffered range, or within
/// `start_tolerance` seconds of a range's start.
pub fn is_buffered(ranges: &[BufferedRange], desired: f64, start_tolerance: f64) -> bool {
    ranges.iter().any(|range| {
        (range.start < desired && range.end > desired) || (range.start - desired).abs() < start_tolerance
    })
}

/// Drift-correcting controller for one video player.
#[derive(Debug, Clone)]
pub struct SyncController {
    config: SyncConfig,
    sources: SourceConfig,
    no_video: bool,
}

impl SyncController {
    pub fn new(config: SyncConfig, sources: SourceConfig) -> Self {
        Self {
            config,
            sources,
            no_video: false,
        }
    }

    /// True when the timeline points outside the available video.
    pub fn no_video_available(&self) -> bool {
        self.no_video
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs one reconciliation step against the player and fallback image.
    pub fn tick<P, I>(&mut self, input: &SyncInput<'_>, player: &mut P, image: &mut I) -> SyncOutcome
    where
        P: VideoPlayer + ?Sized,
        I: StillImage + ?Sized,
    {
        let state = player.state();
        let mut outcome = SyncOutcome::default();

        let Some(duration) = state.known_duration() else {
            trace!("Player duration unknown, skipping tick");
            return outcome;
        };
        if state.buffered.is_none() {
            trace!("Player buffer not reported, skipping tick");
            return outcome;
        }

        let cfg = &self.config;
        let ranges = state.buffered_ranges();
        let speed = input.effective_speed();
        let mut no_video = self.no_video;
        let show_fallback;

        if speed != 0.0 && input.playback.current_segment.is_some() {
            let desired = sources::current_video_time(input.playback, input.offset_ms);
            let time_diff = desired - state.current_time;
            let buffered = is_buffered(ranges, desired, cfg.buffered_start_tolerance_secs);
            outcome.drift = Some(time_diff);

            show_fallback = ranges.is_empty() || state.waiting || time_diff.abs() > cfg.fallback_drift_secs;

            if time_diff.is_finite() && time_diff.abs() > cfg.drift_deadband_secs {
                let hard = time_diff.abs() > cfg.buffer_slack_secs * cfg.slack_multiplier
                    || (time_diff.abs() > cfg.buffered_seek_secs && buffered);
                if hard {
                    if desired > duration || desired < 0.0 {
                        no_video = true;
                        outcome.correction = Correction::Unavailable;
                    } else {
                        no_video = false;
                        let target = if buffered {
                            desired
                        } else {
                            desired + cfg.buffer_slack_secs * speed
                        };
                        debug!(
                            "Seeking to {:.3}s (drift {:.3}s, buffered: {})",
                            target, time_diff, buffered
                        );
                        player.seek(target);
                        outcome.correction = Correction::Seek { target };
                    }
                } else {
                    let clamped = if time_diff > 0.0 {
                        time_diff.min(cfg.max_rate_boost)
                    } else {
                        (time_diff + speed).max(cfg.min_rate) - speed
                    };
                    let rate = if input.started { speed + clamped } else { 0.0 };
                    trace!("Nudging playback rate to {:.3} (drift {:.3}s)", rate, time_diff);
                    player.set_playback_rate(rate);
                    no_video = false;
                    outcome.correction = Correction::Rate { rate };
                }
            } else {
                no_video = false;
                player.set_playback_rate(speed);
                outcome.correction = Correction::Nominal { rate: speed };
            }

            if state.paused && !state.seeking {
                debug!("Resuming playback");
                player.play();
                outcome.played = true;
            }
        } else {
            show_fallback = input.playback.current_segment.is_none() || ranges.is_empty();
            outcome.correction = Correction::Idle;
            if !state.paused && !state.seeking && !ranges.is_empty() {
                debug!("Pausing playback");
                player.pause();
                outcome.paused = true;
            }
        }

        self.update_fallback(image, show_fallback, input);
        outcome.show_fallback = Some(show_fallback);

        if no_video != self.no_video {
            info!("No video available: {}", no_video);
            self.no_video = no_video;
            outcome.no_video_changed = Some(no_video);
        }

        outcome
    }

    fn update_fallback<I: StillImage + ?Sized>(&self, image: &mut I, show: bool, input: &SyncInput<'_>) {
        if show {
            if let Some(frame) = sources::nearest_image_frame(&self.sources, input.playback, input.offset_ms) {
                if image.src() != frame {
                    trace!("Fallback image -> {}", frame);
                    image.set_src(&frame);
                }
            }
        }
        image.set_opacity(if show { 1.0 } else { 0.0 });
    }
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new(SyncConfig::default(), SourceConfig::default())
    }
}
