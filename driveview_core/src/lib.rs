//! DriveView Core - Telemetry Overlay Synchronized to Recorded Drive Video
//!
//! This library solves the two coupled problems of replaying a drive with
//! its telemetry drawn on top of the camera feed:
//! 1. **Drift Problem**: keep an independently-buffered, variable-latency video
//!    player in lock-step with a master timeline that can speed up, slow down
//!    or jump (`driveview_sync`)
//! 2. **Projection Problem**: turn vehicle-space telemetry into screen-space
//!    drawing commands through a calibration that can change at any moment,
//!    redrawing a layer only when its inputs changed (`driveview_projection`,
//!    `driveview_calibration`, `overlay`)
//!
//! `view_runtime::DriveView` ties both together behind a per-frame `tick()`.

pub mod config;
pub mod driveview_calibration;
pub mod driveview_projection;
pub mod driveview_sync;
pub mod error;
pub mod metrics;
pub mod overlay;
pub mod sources;
pub mod view_runtime;

// Re-export key types for convenience
pub use config::{DriveViewConfig, LeadStyle, SourceConfig, SyncConfig, ViewportConfig};
pub use driveview_calibration::{CalibratedFrame, CalibrationCache, CalibrationStatus};
pub use driveview_projection::{CameraTransform, ScreenPoint};
pub use driveview_sync::{Correction, SyncController, SyncInput, SyncOutcome};
pub use error::ConfigError;
pub use metrics::{RenderStats, SyncStats};
pub use overlay::{LayerKind, OverlayRenderer, RenderReport};
pub use view_runtime::{DriveView, MountHandle, OverlaySurfaces, TickReport, ViewProps};
