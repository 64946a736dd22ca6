//! Buffering video player model with seeded load and seek latency.

use crate::clock::{lock, SimClock};
use driveview_env::{BufferedRange, PlayerState, VideoPlayer};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, trace};

/// Tunables of the simulated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimPlayerConfig {
    /// Media duration reported once metadata arrives (seconds)
    pub duration_secs: f64,

    /// Seconds of media fetched per second of wall time
    pub fetch_rate: f64,

    /// Fetching stops this far ahead of the playhead (seconds)
    pub max_buffer_ahead_secs: f64,

    pub load_latency_mean_secs: f64,
    pub load_latency_std_secs: f64,
    pub seek_latency_mean_secs: f64,
    pub seek_latency_std_secs: f64,
}

impl Default for SimPlayerConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            fetch_rate: 8.0,
            max_buffer_ahead_secs: 30.0,
            load_latency_mean_secs: 0.4,
            load_latency_std_secs: 0.1,
            seek_latency_mean_secs: 0.12,
            seek_latency_std_secs: 0.04,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    done_at: f64,
}

#[derive(Debug, Clone)]
struct PlayerModel {
    src: String,
    /// Virtual time at which metadata becomes available
    ready_at: Option<f64>,
    current_time: f64,
    rate: f64,
    paused: bool,
    waiting: bool,
    seek: Option<PendingSeek>,
    ranges: Vec<BufferedRange>,
    /// Range currently being fetched
    active: usize,
    last_update: f64,
}

/// Counters of what the player was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerLog {
    pub loads: u64,
    pub plays: u64,
    pub pauses: u64,
    /// Every requested seek target, before clamping
    pub seeks: Vec<f64>,
    /// Largest playhead position ever reached
    pub max_time: f64,
}

/// Simulated media element.
///
/// Time is read from the shared `SimClock`; the model catches up lazily on
/// every query or command. After `load()` the player reports no duration
/// and no buffer until a sampled load latency has passed. A seek moves the
/// playhead immediately, reports `seeking` for a sampled latency, and
/// starts a new buffered range when the target is outside the existing
/// ones. Playback stalls (`waiting`) at the edge of the active range and
/// stops at the end of the media.
pub struct SimPlayer {
    clock: SimClock,
    config: SimPlayerConfig,
    rng: ChaCha8Rng,
    model: Mutex<PlayerModel>,
    log: PlayerLog,
}

impl SimPlayer {
    pub fn new(clock: SimClock, config: SimPlayerConfig, seed: u64) -> Self {
        let now = clock.now_secs();
        Self {
            clock,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            model: Mutex::new(PlayerModel {
                src: String::new(),
                ready_at: None,
                current_time: 0.0,
                rate: 1.0,
                paused: true,
                waiting: false,
                seek: None,
                ranges: Vec::new(),
                active: 0,
                last_update: now,
            }),
            log: PlayerLog::default(),
        }
    }

    pub fn config(&self) -> &SimPlayerConfig {
        &self.config
    }

    pub fn log(&self) -> &PlayerLog {
        &self.log
    }

    pub fn src(&self) -> String {
        lock(&self.model).src.clone()
    }

    pub fn playback_rate(&self) -> f64 {
        lock(&self.model).rate
    }

    /// Folds the current playhead into the log; call once per tick.
    pub fn observe(&mut self) {
        let time = self.catch_up().current_time;
        self.log.max_time = self.log.max_time.max(time);
    }

    fn sample_latency(&mut self, mean: f64, std: f64) -> f64 {
        match Normal::new(mean, std) {
            Ok(dist) => dist.sample(&mut self.rng).max(0.0),
            Err(_) => mean.max(0.0),
        }
    }

    /// Brings the model up to the clock's current time.
    fn catch_up(&self) -> std::sync::MutexGuard<'_, PlayerModel> {
        let now = self.clock.now_secs();
        let mut model = lock(&self.model);
        advance(&mut model, &self.config, now);
        model
    }
}

fn advance(model: &mut PlayerModel, config: &SimPlayerConfig, now: f64) {
    let Some(ready_at) = model.ready_at else {
        model.last_update = now;
        return;
    };
    if now < ready_at {
        model.last_update = now;
        return;
    }
    let dt = (now - model.last_update.max(ready_at)).max(0.0);
    model.last_update = now;

    if model.seek.is_some_and(|seek| now >= seek.done_at) {
        model.seek = None;
    }

    let duration = config.duration_secs;
    let limit = (model.current_time + config.max_buffer_ahead_secs).min(duration);
    let Some(range) = model.ranges.get_mut(model.active) else {
        return;
    };
    range.end = (range.end + config.fetch_rate * dt).min(limit).max(range.end);
    let edge = range.end;

    if model.paused || model.seek.is_some() {
        return;
    }
    let target = model.current_time + model.rate * dt;
    if target >= duration {
        model.current_time = duration;
        model.paused = true;
        model.waiting = false;
    } else if target > edge {
        model.current_time = model.current_time.max(edge);
        model.waiting = true;
    } else {
        model.current_time = target.max(0.0);
        model.waiting = false;
    }
}

/// Sorted, overlap-free copy of the buffered ranges.
fn merged(ranges: &[BufferedRange]) -> Vec<BufferedRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut out: Vec<BufferedRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match out.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => out.push(range),
        }
    }
    out
}

impl VideoPlayer for SimPlayer {
    fn state(&self) -> PlayerState {
        let model = self.catch_up();
        if model.src.is_empty() {
            return PlayerState::unloaded();
        }
        let ready = model.ready_at.is_some_and(|t| self.clock.now_secs() >= t);
        if !ready {
            return PlayerState {
                paused: model.paused,
                ..PlayerState::unloaded()
            };
        }
        PlayerState {
            current_time: model.current_time,
            duration: Some(self.config.duration_secs),
            buffered: Some(merged(&model.ranges)),
            paused: model.paused,
            seeking: model.seek.is_some(),
            waiting: model.waiting,
        }
    }

    fn seek(&mut self, seconds: f64) {
        let latency = self.sample_latency(self.config.seek_latency_mean_secs, self.config.seek_latency_std_secs);
        self.log.seeks.push(seconds);
        let now = self.clock.now_secs();
        let duration = self.config.duration_secs;

        let target = seconds.clamp(0.0, duration);
        {
            let mut model = self.catch_up();
            model.current_time = target;
            model.waiting = false;
            model.seek = Some(PendingSeek { done_at: now + latency });

            let containing = model
                .ranges
                .iter()
                .position(|r| r.start <= target && target <= r.end);
            model.active = match containing {
                Some(index) => index,
                None => {
                    model.ranges.push(BufferedRange::new(target, target));
                    model.ranges.len() - 1
                }
            };
        }
        self.log.max_time = self.log.max_time.max(target);
        trace!("Sim player seeking to {:.3}s (ready in {:.3}s)", target, latency);
    }

    fn play(&mut self) {
        self.log.plays += 1;
        let duration = self.config.duration_secs;
        let mut model = self.catch_up();
        // Ended media stays ended
        if model.ready_at.is_some() && model.current_time >= duration {
            return;
        }
        model.paused = false;
    }

    fn pause(&mut self) {
        self.log.pauses += 1;
        let mut model = self.catch_up();
        model.paused = true;
        model.waiting = false;
    }

    fn load(&mut self, src: &str) {
        let latency = self.sample_latency(self.config.load_latency_mean_secs, self.config.load_latency_std_secs);
        self.log.loads += 1;
        let now = self.clock.now_secs();

        let mut model = self.catch_up();
        model.src = src.to_string();
        model.ready_at = if src.is_empty() { None } else { Some(now + latency) };
        model.current_time = 0.0;
        model.paused = true;
        model.waiting = false;
        model.seek = None;
        model.ranges = vec![BufferedRange::new(0.0, 0.0)];
        model.active = 0;
        model.last_update = now;
        debug!("Sim player loading {:?} (ready in {:.3}s)", src, latency);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let mut model = self.catch_up();
        model.rate = rate;
    }
}
