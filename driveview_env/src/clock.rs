//! Per-frame scheduler abstraction.

use crate::error::EnvError;
use async_trait::async_trait;

/// The free-running display-refresh scheduler.
///
/// # Implementations
///
/// - **Production**: `TokioFrameClock` - wraps a `tokio::time::Interval`
/// - **Simulation**: `SimClock` - advances virtual time one frame per call
///
/// The next frame is scheduled independently of how long the previous tick
/// took, so a slow tick delays at most its own frame.
#[async_trait]
pub trait FrameClock: Send + Sync {
    /// Waits for the next display frame.
    ///
    /// # Returns
    /// * `Ok(())` - A frame is due; run one tick
    /// * `Err(EnvError::SchedulerClosed)` - No more frames will be produced
    async fn next_frame(&self) -> Result<(), EnvError>;

    /// Wall-clock time (Unix milliseconds) used for start-time gating.
    fn wall_time_ms(&self) -> i64;
}
