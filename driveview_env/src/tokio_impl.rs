//! Production implementation of FrameClock using Tokio.

use crate::error::EnvError;
use crate::FrameClock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Frame clock backed by a Tokio interval at the display refresh rate.
///
/// Missed frames are skipped rather than replayed in a burst, matching how a
/// display refresh callback behaves when the previous frame overran.
pub struct TokioFrameClock {
    interval: Mutex<Interval>,
    closed: AtomicBool,
}

impl TokioFrameClock {
    /// Creates a clock ticking at `refresh_hz` frames per second.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(refresh_hz: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval: Mutex::new(ticker),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates an Arc-wrapped clock for sharing across tasks.
    pub fn shared(refresh_hz: u32) -> Arc<Self> {
        Arc::new(Self::new(refresh_hz))
    }

    /// Stops producing frames; pending and future waits return an error.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameClock for TokioFrameClock {
    async fn next_frame(&self) -> Result<(), EnvError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EnvError::SchedulerClosed);
        }
        self.interval.lock().await.tick().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(EnvError::SchedulerClosed);
        }
        Ok(())
    }

    fn wall_time_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_are_paced() {
        let clock = TokioFrameClock::new(100);
        let start = tokio::time::Instant::now();
        // First tick of an interval completes immediately
        for _ in 0..4 {
            clock.next_frame().await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn test_closed_clock_stops() {
        let clock = TokioFrameClock::new(60);
        clock.close();
        assert_eq!(clock.next_frame().await, Err(EnvError::SchedulerClosed));
    }

    #[test]
    fn test_wall_time_is_recent() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let clock = rt.block_on(async { TokioFrameClock::new(60) });
        // 2024-01-01 00:00:00 UTC
        assert!(clock.wall_time_ms() > 1_704_067_200_000);
    }
}
