//! Virtual frame clock for deterministic simulation.

use async_trait::async_trait;
use driveview_env::{EnvError, FrameClock};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Virtual time 0 maps to 2024-01-01 00:00:00 UTC.
pub const SIM_EPOCH_MS: i64 = 1_704_067_200_000;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Frame clock that advances virtual time by one frame per `next_frame()`.
///
/// Clones share the same time, so the player and timeline models read the
/// instant the view is ticking at. After `frame_budget` frames the clock
/// closes and `next_frame()` returns `SchedulerClosed`.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Frames left before the clock closes
    frames_remaining: Arc<Mutex<u64>>,

    frame_ns: u64,
}

impl SimClock {
    /// Creates a clock at `refresh_hz` that produces `frame_budget` frames.
    pub fn new(refresh_hz: u32, frame_budget: u64) -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
            frames_remaining: Arc::new(Mutex::new(frame_budget)),
            frame_ns: 1_000_000_000 / refresh_hz.max(1) as u64,
        }
    }

    /// Advances virtual time without consuming a frame.
    pub fn advance(&self, duration: Duration) {
        *lock(&self.virtual_time_ns) += duration.as_nanos() as u64;
    }

    /// Virtual time since simulation start.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(*lock(&self.virtual_time_ns))
    }

    pub fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_nanos(self.frame_ns)
    }

    pub fn frames_remaining(&self) -> u64 {
        *lock(&self.frames_remaining)
    }

    /// Stops producing frames.
    pub fn close(&self) {
        *lock(&self.frames_remaining) = 0;
    }
}

#[async_trait]
impl FrameClock for SimClock {
    async fn next_frame(&self) -> Result<(), EnvError> {
        {
            let mut remaining = lock(&self.frames_remaining);
            if *remaining == 0 {
                return Err(EnvError::SchedulerClosed);
            }
            *remaining -= 1;
        }
        *lock(&self.virtual_time_ns) += self.frame_ns;
        Ok(())
    }

    fn wall_time_ms(&self) -> i64 {
        SIM_EPOCH_MS + self.now().as_millis() as i64
    }
}
