//! Playback scenarios for the simulation harness.

use crate::player::SimPlayerConfig;
use crate::timeline::{ScriptStep, TimelineAction, TimelineScript};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// DVS-001: Normal playback from inside the first segment
    SteadyPlay,

    /// DVS-002: Timeline jumps 25 s ahead mid-playback
    ScrubForward,

    /// DVS-003: Timeline jumps 20 s back mid-playback
    ScrubBackward,

    /// DVS-004: Playback at twice the recorded speed
    DoubleSpeed,

    /// DVS-005: Playback runs across a segment boundary
    SegmentChange,

    /// DVS-006: Calibration disappears for 3 s, then returns
    CalibrationDropout,

    /// DVS-007: Video shorter than its segment
    ShortVideo,

    /// DVS-008: Drive start time lies 3 s in the future
    LateStart,

    /// DVS-009: Timeline paused at zero speed
    Paused,
}

/// Everything the runner needs to build a scenario's world.
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    pub script: TimelineScript,
    pub player: SimPlayerConfig,

    /// Scenario runs at least this long regardless of the requested duration
    pub min_duration_secs: f64,

    /// Ticks before this virtual time are excluded from drift statistics
    pub warmup_secs: f64,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SteadyPlay,
            ScenarioId::ScrubForward,
            ScenarioId::ScrubBackward,
            ScenarioId::DoubleSpeed,
            ScenarioId::SegmentChange,
            ScenarioId::CalibrationDropout,
            ScenarioId::ShortVideo,
            ScenarioId::LateStart,
            ScenarioId::Paused,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SteadyPlay => "steady_play",
            ScenarioId::ScrubForward => "scrub_forward",
            ScenarioId::ScrubBackward => "scrub_backward",
            ScenarioId::DoubleSpeed => "double_speed",
            ScenarioId::SegmentChange => "segment_change",
            ScenarioId::CalibrationDropout => "calibration_dropout",
            ScenarioId::ShortVideo => "short_video",
            ScenarioId::LateStart => "late_start",
            ScenarioId::Paused => "paused",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SteadyPlay => "1x playback, drift stays inside the deadband after warmup",
            ScenarioId::ScrubForward => "+25 s scrub at t=5s, player seeks and re-converges",
            ScenarioId::ScrubBackward => "-20 s scrub at t=6s, player seeks back and re-converges",
            ScenarioId::DoubleSpeed => "2x playback, nominal rate follows the play speed",
            ScenarioId::SegmentChange => "crosses into segment 1, source reloads and re-converges",
            ScenarioId::CalibrationDropout => "calibration missing 4-7 s, overlay clears then redraws",
            ScenarioId::ShortVideo => "30 s video in a 60 s segment, no-video flag raised past the end",
            ScenarioId::LateStart => "start time 3 s ahead, nothing plays until it passes",
            ScenarioId::Paused => "zero play speed, player is never started or seeked",
        }
    }

    /// Builds the timeline script and player model for this scenario.
    pub fn setup(&self) -> ScenarioSetup {
        let mut setup = ScenarioSetup {
            script: TimelineScript::default(),
            player: SimPlayerConfig::default(),
            min_duration_secs: 10.0,
            warmup_secs: 3.0,
        };
        match self {
            ScenarioId::SteadyPlay => {}
            ScenarioId::ScrubForward => {
                setup.script.steps = vec![ScriptStep::new(5.0, TimelineAction::SeekBy(25_000))];
                setup.min_duration_secs = 12.0;
            }
            ScenarioId::ScrubBackward => {
                setup.script.initial_offset_ms = 30_000;
                setup.script.steps = vec![ScriptStep::new(6.0, TimelineAction::SeekBy(-20_000))];
                setup.min_duration_secs = 12.0;
            }
            ScenarioId::DoubleSpeed => {
                setup.script.initial_speed = 2.0;
            }
            ScenarioId::SegmentChange => {
                setup.script.initial_offset_ms = 55_000;
                setup.min_duration_secs = 12.0;
            }
            ScenarioId::CalibrationDropout => {
                setup.script.calibration_dropouts = vec![(4.0, 7.0)];
            }
            ScenarioId::ShortVideo => {
                setup.script.initial_offset_ms = 25_000;
                setup.player.duration_secs = 30.0;
                setup.min_duration_secs = 12.0;
            }
            ScenarioId::LateStart => {
                setup.script.initial_offset_ms = 10_000;
                setup.script.start_delay_ms = 3_000;
                setup.warmup_secs = 6.0;
            }
            ScenarioId::Paused => {
                setup.script.initial_speed = 0.0;
            }
        }
        setup
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady_play" | "steadyplay" | "dvs-001" => Ok(ScenarioId::SteadyPlay),
            "scrub_forward" | "scrubforward" | "dvs-002" => Ok(ScenarioId::ScrubForward),
            "scrub_backward" | "scrubbackward" | "dvs-003" => Ok(ScenarioId::ScrubBackward),
            "double_speed" | "doublespeed" | "dvs-004" => Ok(ScenarioId::DoubleSpeed),
            "segment_change" | "segmentchange" | "dvs-005" => Ok(ScenarioId::SegmentChange),
            "calibration_dropout" | "calibrationdropout" | "dvs-006" => Ok(ScenarioId::CalibrationDropout),
            "short_video" | "shortvideo" | "dvs-007" => Ok(ScenarioId::ShortVideo),
            "late_start" | "latestart" | "dvs-008" => Ok(ScenarioId::LateStart),
            "paused" | "dvs-009" => Ok(ScenarioId::Paused),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
