//! Timeline/telemetry store abstraction.

use crate::telemetry::{Calibration, EventQuery, TelemetryEvent};
use crate::types::PlaybackState;

/// Read-only view of the process-wide timeline store.
///
/// # Implementations
///
/// - **Production**: backed by the log replay worker that indexes events by time
/// - **Simulation**: `SimTimeline` - scripted offset and synthetic telemetry
///
/// Every method is a non-blocking snapshot query. The DriveView core calls
/// each of them at most once per tick and never mutates what it receives.
pub trait TimelineStore {
    /// Current global offset within the drive (milliseconds).
    fn current_offset(&self) -> i64;

    /// Segments, play speed and start time for the current offset.
    fn playback(&self) -> PlaybackState;

    /// Latest calibration for a route, or `None` while still loading.
    fn calibration(&self, route: &str) -> Option<Calibration>;

    /// Latest event at or near the current offset for a named query.
    fn latest(&self, query: EventQuery) -> Option<TelemetryEvent>;
}
