//! DriveView Deterministic Simulation Harness
//!
//! Runs the real `DriveView` (sync controller + overlay renderer) against
//! simulated collaborators so playback behavior can be checked without a
//! browser, a media pipeline or a log server.
//!
//! # Core Principle: One Clock, One Seed
//!
//! Every source of non-determinism is replaced:
//! - **Time**: `SimClock` advances virtual time one display frame per `next_frame()`
//! - **Media**: `SimPlayer` models load/seek latency and buffering from a seeded RNG
//! - **Timeline**: `SimTimeline` replays a script of speed changes and scrubs
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ScenarioRunner                       │
//! │                                                          │
//! │   SimClock ───────────┬──────────────┬────────────┐      │
//! │   (virtual time)      │              │            │      │
//! │                  ┌────▼─────┐   ┌────▼────┐       │      │
//! │                  │SimTimeline│  │SimPlayer│       │      │
//! │                  │ (script) │   │(buffer) │       │      │
//! │                  └────┬─────┘   └────▲────┘       │      │
//! │                       │ offset       │ seek/rate  │      │
//! │                  ┌────▼──────────────┴────┐  tick │      │
//! │                  │       DriveView        │◄──────┘      │
//! │                  │   sync  →  overlay     │              │
//! │                  └────────────┬───────────┘              │
//! │                               ▼                          │
//! │                    DisplayList surfaces                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use driveview_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_duration(20.0)
//!     .run(ScenarioId::ScrubForward);
//! assert!(result.passed);
//! ```

mod clock;
mod error;
mod exporter;
mod player;
mod runner;
pub mod scenarios;
mod timeline;

pub use clock::{SimClock, SIM_EPOCH_MS};
pub use error::SimError;
pub use exporter::{SimEvent, SimExport, SimFrame};
pub use player::{PlayerLog, SimPlayer, SimPlayerConfig};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::{ScenarioId, ScenarioSetup};
pub use timeline::{ScriptStep, SimTimeline, TimelineAction, TimelineScript};
