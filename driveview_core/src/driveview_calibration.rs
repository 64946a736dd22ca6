//! The "CALIBRATION" Cache - invalidate-on-change camera transform
//!
//! Calibration messages arrive from the timeline store as raw row-major
//! arrays. Rebuilding the 4×4 extrinsic on every frame is wasted work, so
//! the cache keeps the last applied `log_mono_time` and only recomputes when
//! a newer (or simply different) message is observed.
//!
//! Absence is meaningful: while the store has no calibration for the route
//! the cached transform is dropped and every overlay layer must clear.

use crate::driveview_projection::{extrinsic_from_3x4, intrinsic_matrix, mat3_from_row_major, CameraTransform, Mat3, Mat4};
use driveview_env::Calibration;
use tracing::{debug, info};

/// Camera transform and warp derived from one calibration message.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedFrame {
    pub camera: CameraTransform,
    pub warp: Mat3,
    pub log_mono_time: u64,
}

/// What `CalibrationCache::observe` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// No calibration available; the cached transform was dropped
    Missing,
    /// A new calibration was applied (first one, changed, or reappeared)
    Changed,
    /// Same calibration as last pass
    Unchanged,
}

/// Keeps the current camera transform in step with the calibration stream.
#[derive(Debug, Clone)]
pub struct CalibrationCache {
    intrinsic: Mat4,
    current: Option<CalibratedFrame>,
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self {
            intrinsic: intrinsic_matrix(),
            current: None,
        }
    }

    /// Applies the latest calibration snapshot (or its absence).
    pub fn observe(&mut self, calibration: Option<&Calibration>) -> CalibrationStatus {
        let Some(calibration) = calibration else {
            if let Some(previous) = self.current.take() {
                info!(
                    "Calibration lost (last log_mono_time {}), clearing overlay",
                    previous.log_mono_time
                );
            }
            return CalibrationStatus::Missing;
        };

        if let Some(current) = &self.current {
            if current.log_mono_time == calibration.log_mono_time {
                return CalibrationStatus::Unchanged;
            }
        }

        debug!("Applying calibration log_mono_time={}", calibration.log_mono_time);
        let extrinsic = extrinsic_from_3x4(&calibration.extrinsic);
        self.current = Some(CalibratedFrame {
            camera: CameraTransform::new(extrinsic, self.intrinsic),
            warp: mat3_from_row_major(&calibration.warp),
            log_mono_time: calibration.log_mono_time,
        });
        CalibrationStatus::Changed
    }

    /// Transform from the most recently observed calibration.
    pub fn current(&self) -> Option<&CalibratedFrame> {
        self.current.as_ref()
    }

    pub fn intrinsic(&self) -> &Mat4 {
        &self.intrinsic
    }

    /// Drops the cached transform without observing anything.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}

impl Default for CalibrationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration(log_mono_time: u64, height: f64) -> Calibration {
        Calibration {
            log_mono_time,
            extrinsic: [0.0, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, height, 1.0, 0.0, 0.0, 0.0],
            warp: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn test_first_observation_applies() {
        let mut cache = CalibrationCache::new();
        assert_eq!(cache.observe(Some(&calibration(1, 1.2))), CalibrationStatus::Changed);
        let frame = cache.current().unwrap();
        assert_eq!(frame.log_mono_time, 1);
        assert_eq!(frame.camera.extrinsic[(1, 3)], 1.2);
        assert_eq!(frame.camera.extrinsic[(3, 3)], 1.0);
        assert_eq!(frame.warp, Mat3::identity());
    }

    #[test]
    fn test_same_timestamp_is_unchanged() {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&calibration(5, 1.2)));
        // Contents are not compared, only the timestamp
        assert_eq!(cache.observe(Some(&calibration(5, 9.9))), CalibrationStatus::Unchanged);
        assert_eq!(cache.current().unwrap().camera.extrinsic[(1, 3)], 1.2);
    }

    #[test]
    fn test_new_timestamp_recomputes() {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&calibration(5, 1.2)));
        assert_eq!(cache.observe(Some(&calibration(6, 1.4))), CalibrationStatus::Changed);
        assert_eq!(cache.current().unwrap().camera.extrinsic[(1, 3)], 1.4);
    }

    #[test]
    fn test_absence_invalidates_and_reappearance_applies() {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&calibration(5, 1.2)));
        assert_eq!(cache.observe(None), CalibrationStatus::Missing);
        assert!(cache.current().is_none());
        assert_eq!(cache.observe(None), CalibrationStatus::Missing);
        assert_eq!(cache.observe(Some(&calibration(5, 1.2))), CalibrationStatus::Changed);
    }

    #[test]
    fn test_intrinsic_is_shared() {
        let mut cache = CalibrationCache::new();
        cache.observe(Some(&calibration(1, 1.2)));
        assert_eq!(&cache.current().unwrap().camera.intrinsic, cache.intrinsic());
        assert_eq!(*cache.intrinsic(), intrinsic_matrix());
    }
}
