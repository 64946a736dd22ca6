//! Scenario runner - drives a `DriveView` against the simulated world.

use crate::clock::SimClock;
use crate::error::SimError;
use crate::exporter::{SimEvent, SimExport, SimFrame};
use crate::player::{PlayerLog, SimPlayer};
use crate::scenarios::{ScenarioId, ScenarioSetup};
use crate::timeline::SimTimeline;

use driveview_core::{
    CalibrationStatus, Correction, DriveView, DriveViewConfig, LayerKind, OverlaySurfaces, RenderStats,
    SyncStats, TickReport, ViewProps,
};
use driveview_env::{DisplayList, FrameClock, ImageElement, TimelineStore, VideoPlayer};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

type SimView = DriveView<SimPlayer, SimTimeline, ImageElement, DisplayList>;

/// Drift (seconds) within which a tick counts as in sync.
const IN_SYNC_DRIFT: f64 = 0.5;

/// Drift (seconds) a scenario must end within after a disturbance.
const SETTLED_DRIFT: f64 = 1.0;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    pub sync: SyncStats,
    pub render: RenderStats,

    /// Ticks after warmup with a computed drift
    pub measured_ticks: u64,

    /// Measured ticks within the in-sync drift
    pub in_sync_ticks: u64,

    /// Largest drift magnitude after warmup (seconds)
    pub max_abs_drift: f64,

    /// Drift on the last tick that computed one
    pub final_drift: Option<f64>,

    /// Seeks issued after the first scripted timeline action
    pub seeks_after_script: u64,

    /// Video source reloads after mount
    pub reloads: u64,

    /// `play()` requests before the drive's start time
    pub plays_before_start: u64,

    /// Whether the offset moved before the drive's start time
    pub offset_moved_before_start: bool,

    /// Render passes without calibration
    pub missing_calibration_ticks: u64,

    /// Of those, passes that left paint on any surface
    pub painted_while_missing: u64,

    /// Paint commands visible across all surfaces at the end
    pub final_painted: usize,

    pub no_video_at_end: bool,
    pub fallback_visible_at_end: bool,
    pub final_player_time: f64,
    pub final_playback_rate: f64,
    pub video_src: String,
    pub player: PlayerLog,
}

impl ScenarioMetrics {
    /// Fraction of measured ticks that were in sync.
    pub fn in_sync_ratio(&self) -> f64 {
        if self.measured_ticks == 0 {
            return 0.0;
        }
        self.in_sync_ticks as f64 / self.measured_ticks as f64
    }
}

/// Per-run bookkeeping shared between ticks.
struct Observer {
    setup: ScenarioSetup,
    start_time_ms: i64,
    first_step_secs: Option<f64>,
    export_every: u64,
    metrics: ScenarioMetrics,
}

impl Observer {
    fn new(setup: ScenarioSetup, export_every: u64) -> Self {
        let first_step_secs = setup
            .script
            .steps
            .iter()
            .map(|s| s.at_secs)
            .min_by(|a, b| a.total_cmp(b));
        Self {
            start_time_ms: setup.script.start_time_ms(),
            first_step_secs,
            export_every: export_every.max(1),
            setup,
            metrics: ScenarioMetrics::default(),
        }
    }

    fn record(&mut self, clock: &SimClock, view: &SimView, report: &TickReport, export: Option<&mut SimExport>) {
        let now = clock.now_secs();
        let now_ms = clock.wall_time_ms();
        let m = &mut self.metrics;

        if let Some(drift) = report.sync.drift {
            m.final_drift = Some(drift);
            if now >= self.setup.warmup_secs {
                m.measured_ticks += 1;
                if drift.abs() <= IN_SYNC_DRIFT {
                    m.in_sync_ticks += 1;
                }
                m.max_abs_drift = m.max_abs_drift.max(drift.abs());
            }
        }
        if matches!(report.sync.correction, Correction::Seek { .. })
            && self.first_step_secs.is_some_and(|t| now >= t)
        {
            m.seeks_after_script += 1;
        }
        if report.reloaded.is_some() {
            m.reloads += 1;
        }
        if now_ms <= self.start_time_ms {
            if report.sync.played {
                m.plays_before_start += 1;
            }
            if report.offset_ms != self.setup.script.initial_offset_ms {
                m.offset_moved_before_start = true;
            }
        }

        let visible_paint = painted(view);
        if let Some(render) = &report.render {
            if render.calibration == CalibrationStatus::Missing {
                m.missing_calibration_ticks += 1;
                if visible_paint > 0 {
                    m.painted_while_missing += 1;
                }
            }
        }

        let Some(export) = export else {
            return;
        };
        if view.tick_count() % self.export_every != 0 {
            return;
        }
        let mut events = Vec::new();
        if let Correction::Seek { target } = report.sync.correction {
            events.push(SimEvent::info(format!("seek to {:.2}s", target)));
        }
        if let Some(src) = &report.reloaded {
            events.push(SimEvent::info(format!("reload {}", src)));
        }
        if let Some(no_video) = report.sync.no_video_changed {
            events.push(SimEvent::warn(format!("no video: {}", no_video)));
        }
        let player = view.player();
        export.add_frame(SimFrame {
            time_sec: now,
            offset_ms: report.offset_ms,
            player_time: player.state().current_time,
            drift: report.sync.drift,
            correction: correction_name(&report.sync.correction).to_string(),
            playback_rate: player.playback_rate(),
            show_fallback: report.sync.show_fallback.unwrap_or(false),
            no_video: view.no_video_available(),
            calibration: report.render.as_ref().map(|r| format!("{:?}", r.calibration)),
            redrawn: report
                .render
                .iter()
                .flat_map(|r| r.redrawn.iter().map(|k| k.to_string()))
                .collect(),
            events,
        });
    }
}

fn correction_name(correction: &Correction) -> &'static str {
    match correction {
        Correction::Skipped => "skipped",
        Correction::Idle => "idle",
        Correction::Unavailable => "unavailable",
        Correction::Seek { .. } => "seek",
        Correction::Rate { .. } => "rate",
        Correction::Nominal { .. } => "nominal",
    }
}

fn painted(view: &SimView) -> usize {
    LayerKind::all()
        .iter()
        .filter_map(|kind| view.renderer().surface(*kind))
        .map(|surface| surface.painted_count())
        .sum()
}

/// Runs playback scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Display refresh rate in Hz
    refresh_hz: u32,

    /// Requested duration in seconds
    duration_secs: f64,

    /// Export one frame every this many ticks
    export_every: u64,

    config: DriveViewConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            refresh_hz: 60,
            duration_secs: 20.0,
            export_every: 6,
            config: DriveViewConfig::default(),
        }
    }

    /// Sets the display refresh rate.
    pub fn with_refresh_rate(mut self, hz: u32) -> Self {
        self.refresh_hz = hz.max(1);
        self
    }

    /// Sets the duration; scenarios may extend it to their minimum.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Sets the view configuration.
    pub fn with_config(mut self, config: DriveViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario and records sampled frames for export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name(), self.seed);
        let result = self.execute(scenario, Some(&mut export));
        export.finalize(
            result.passed,
            result.failure_reason.clone(),
            result.metrics.sync.clone(),
            result.metrics.render.clone(),
        );
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let setup = scenario.setup();
        let duration = self.duration_secs.max(setup.min_duration_secs);
        let frames = (duration * self.refresh_hz as f64).ceil() as u64;

        let clock = SimClock::new(self.refresh_hz, frames);
        let timeline = Arc::new(SimTimeline::new(clock.clone(), setup.script.clone()));
        let player = SimPlayer::new(clock.clone(), setup.player.clone(), self.seed);
        let viewport = &self.config.viewport;
        let surfaces = OverlaySurfaces {
            lane: DisplayList::new(viewport.width, viewport.height),
            lead: DisplayList::new(viewport.width, viewport.height),
            car_state: DisplayList::new(viewport.width, viewport.height),
        };
        let props = ViewProps {
            dongle_id: setup.script.dongle_id.clone(),
            route: setup.script.route.clone(),
            should_show_ui: true,
        };
        let mut view: SimView = DriveView::new(self.config.clone(), props, timeline, player, ImageElement::new(), surfaces);
        let mut observer = Observer::new(setup, self.export_every);

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(SimError::Runtime)
        {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("{}", err);
                return ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    failure_reason: Some(err.to_string()),
                    metrics: ScenarioMetrics::default(),
                };
            }
        };

        view.mount(clock.wall_time_ms());
        runtime.block_on(async {
            while clock.next_frame().await.is_ok() {
                let Some(report) = view.tick(clock.wall_time_ms()) else {
                    break;
                };
                view.player_mut().observe();
                observer.record(&clock, &view, &report, export.as_deref_mut());

                // Only the paint state matters once a tick is observed
                for kind in LayerKind::all() {
                    if let Some(surface) = view.renderer_mut().surface_mut(*kind) {
                        surface.take_ops();
                    }
                }
            }
        });

        let mut metrics = observer.metrics;
        metrics.sync = view.sync_stats().clone();
        metrics.render = view.renderer().stats().clone();
        metrics.final_painted = painted(&view);
        metrics.no_video_at_end = view.no_video_available();
        metrics.fallback_visible_at_end = view.image().is_visible();
        let state = view.player().state();
        metrics.final_player_time = state.current_time;
        metrics.final_playback_rate = view.player().playback_rate();
        metrics.video_src = view.video_src().to_string();
        metrics.player = view.player().log().clone();
        debug!(
            "Scenario {} final offset {} ms, player at {:.3}s",
            scenario,
            view.store().current_offset(),
            state.current_time
        );

        let failure_reason = evaluate(scenario, &metrics).err();
        let passed = failure_reason.is_none();
        if passed {
            info!("Scenario {} passed ({} ticks)", scenario, view.tick_count());
        } else {
            warn!(
                "Scenario {} failed: {}",
                scenario,
                failure_reason.as_deref().unwrap_or("unknown")
            );
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: view.tick_count(),
            final_time_secs: clock.now_secs(),
            failure_reason,
            metrics,
        }
    }
}

fn settled(metrics: &ScenarioMetrics) -> Result<f64, String> {
    match metrics.final_drift {
        Some(drift) if drift.abs() <= SETTLED_DRIFT => Ok(drift),
        Some(drift) => Err(format!("final drift {:.3}s exceeds {:.1}s", drift, SETTLED_DRIFT)),
        None => Err("no drift was ever computed".to_string()),
    }
}

/// Checks a scenario's pass criterion.
fn evaluate(scenario: ScenarioId, m: &ScenarioMetrics) -> Result<(), String> {
    match scenario {
        ScenarioId::SteadyPlay => {
            if m.in_sync_ratio() < 0.9 {
                return Err(format!("in sync for only {:.1}% of ticks", m.in_sync_ratio() * 100.0));
            }
            if m.no_video_at_end {
                return Err("no-video flag raised during steady playback".to_string());
            }
            settled(m).map(|_| ())
        }
        ScenarioId::ScrubForward | ScenarioId::ScrubBackward => {
            if m.seeks_after_script == 0 {
                return Err("scrub did not trigger a seek".to_string());
            }
            settled(m).map(|_| ())
        }
        ScenarioId::DoubleSpeed => {
            if m.sync.nominal == 0 {
                return Err("never reached nominal 2x playback".to_string());
            }
            settled(m).map(|_| ())
        }
        ScenarioId::SegmentChange => {
            if m.reloads == 0 {
                return Err("segment change did not reload the player".to_string());
            }
            if !m.video_src.contains("--1/") {
                return Err(format!("unexpected final source {}", m.video_src));
            }
            settled(m).map(|_| ())
        }
        ScenarioId::CalibrationDropout => {
            if m.missing_calibration_ticks == 0 {
                return Err("calibration never went missing".to_string());
            }
            if m.painted_while_missing > 0 {
                return Err(format!(
                    "{} passes left overlay paint without calibration",
                    m.painted_while_missing
                ));
            }
            if m.render.calibration_changes < 2 {
                return Err("overlay did not pick calibration back up".to_string());
            }
            if m.final_painted == 0 {
                return Err("overlay blank after calibration returned".to_string());
            }
            Ok(())
        }
        ScenarioId::ShortVideo => {
            if !m.no_video_at_end {
                return Err("no-video flag not raised past the end of the video".to_string());
            }
            if m.sync.unavailable == 0 {
                return Err("no out-of-range correction was suppressed".to_string());
            }
            if !m.fallback_visible_at_end {
                return Err("still image not shown without video".to_string());
            }
            Ok(())
        }
        ScenarioId::LateStart => {
            if m.plays_before_start > 0 {
                return Err(format!("{} play requests before start", m.plays_before_start));
            }
            if m.offset_moved_before_start {
                return Err("offset moved before start".to_string());
            }
            settled(m).map(|_| ())
        }
        ScenarioId::Paused => {
            if !m.player.seeks.is_empty() {
                return Err(format!("{} seeks while paused", m.player.seeks.len()));
            }
            if m.player.plays > 0 {
                return Err("player started while paused".to_string());
            }
            if m.final_player_time != 0.0 {
                return Err(format!("player moved to {:.3}s", m.final_player_time));
            }
            Ok(())
        }
    }
}
