//! DriveView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" boundary between the DriveView core
//! (sync controller, projection, overlay renderers) and everything it does
//! not own:
//! - The video player (`VideoPlayer`) and the still-image fallback (`StillImage`)
//! - The timeline/telemetry store (`TimelineStore`)
//! - Drawing surfaces (`Surface`)
//! - The per-frame scheduler (`FrameClock`)
//!
//! Every collaborator is consumed as a snapshot query or a fire-and-forget
//! command, so the same core runs against a browser-backed player, a native
//! decoder, or the deterministic simulation in `driveview_sim`.
//!
//! # Example
//!
//! ```ignore
//! use driveview_env::{FrameClock, TimelineStore, VideoPlayer};
//!
//! async fn preview_loop<C: FrameClock>(clock: &C, view: &mut View) {
//!     while clock.next_frame().await.is_ok() {
//!         view.tick(clock.wall_time_ms());
//!     }
//! }
//! ```

mod clock;
mod display_list;
mod error;
mod player;
mod surface;
mod telemetry;
mod timeline;
mod tokio_impl;
mod types;

pub use clock::FrameClock;
pub use display_list::{DisplayList, DrawOp};
pub use error::EnvError;
pub use player::{ImageElement, StillImage, VideoPlayer};
pub use surface::{Color, LinearGradient, Paint, Path2D, PathCmd, Surface, Transform2D};
pub use telemetry::{
    Calibration, CarStateEvent, CruiseState, EventQuery, LaneLine, LeadData, Live20Event,
    ModelEvent, MpcEvent, TelemetryEvent,
};
pub use timeline::TimelineStore;
pub use tokio_impl::TokioFrameClock;
pub use types::{BufferedRange, PlaybackState, PlayerState, Segment};
