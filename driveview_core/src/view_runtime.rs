//! View Runtime - Orchestrates sync and overlay rendering per display frame.
//!
//! This module ties the sync controller and the overlay renderer to the
//! environment abstraction (`driveview_env`).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         DriveView                           │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              TimelineStore (snapshot reads)           │   │
//! │  │  • current_offset() → read once per tick             │   │
//! │  │  • playback()       → segments, speed, start time    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                              │                               │
//! │     ┌──────────────┐   ┌──────────────┐   ┌─────────────┐   │
//! │     │  video src   │ → │     SYNC     │ → │   OVERLAY   │   │
//! │     │  tracking    │   │  Controller  │   │  Renderer   │   │
//! │     └──────────────┘   └──────────────┘   └─────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use driveview_core::{DriveView, DriveViewConfig, ViewProps};
//! use driveview_env::TokioFrameClock;
//!
//! let clock = TokioFrameClock::new(60);
//! let mut view = DriveView::new(config, props, store, player, image, surfaces);
//! view.mount(clock.wall_time_ms());
//!
//! // Runs until unmounted through a MountHandle or the clock closes
//! view.run(&clock).await;
//! ```

use crate::config::DriveViewConfig;
use crate::driveview_sync::{SyncController, SyncInput, SyncOutcome};
use crate::metrics::SyncStats;
use crate::overlay::{OverlayRenderer, RenderReport};
use crate::sources;
use driveview_env::{FrameClock, StillImage, Surface, TimelineStore, VideoPlayer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Inputs owned by whoever hosts the view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewProps {
    /// Device that recorded the drive (part of the video URL)
    pub dongle_id: String,

    /// Route name used to look up calibration
    pub route: String,

    /// Overlay visibility; sync keeps running when hidden
    pub should_show_ui: bool,
}

/// Shared mounted flag. Clearing it stops the run loop before its next tick.
#[derive(Debug, Clone, Default)]
pub struct MountHandle(Arc<AtomicBool>);

impl MountHandle {
    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Requests teardown; takes effect on the next frame.
    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn set(&self, mounted: bool) {
        self.0.store(mounted, Ordering::SeqCst);
    }
}

/// One drawing surface per overlay layer.
#[derive(Debug, Clone)]
pub struct OverlaySurfaces<S> {
    pub lane: S,
    pub lead: S,
    pub car_state: S,
}

/// What happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub offset_ms: i64,
    pub sync: SyncOutcome,
    /// `None` when the overlay is hidden
    pub render: Option<RenderReport>,
    /// New video source, when it changed this tick
    pub reloaded: Option<String>,
}

/// A video view with synchronized telemetry overlay.
///
/// Generic over the player, store, image and surface implementations so
/// the same view runs against a real player or the simulation harness.
pub struct DriveView<P, T, I, S>
where
    P: VideoPlayer,
    T: TimelineStore + ?Sized,
    I: StillImage,
    S: Surface,
{
    pub props: ViewProps,
    config: DriveViewConfig,
    store: Arc<T>,
    player: P,
    image: I,
    sync: SyncController,
    renderer: OverlayRenderer<S>,
    mounted: MountHandle,
    video_src: String,
    sync_stats: SyncStats,
    tick_count: u64,
}

impl<P, T, I, S> DriveView<P, T, I, S>
where
    P: VideoPlayer,
    T: TimelineStore + ?Sized,
    I: StillImage,
    S: Surface,
{
    pub fn new(
        config: DriveViewConfig,
        props: ViewProps,
        store: Arc<T>,
        player: P,
        image: I,
        surfaces: OverlaySurfaces<S>,
    ) -> Self {
        let sync = SyncController::new(config.sync.clone(), config.sources.clone());
        let renderer = OverlayRenderer::new(&config, surfaces.lane, surfaces.lead, surfaces.car_state);
        Self {
            props,
            config,
            store,
            player,
            image,
            sync,
            renderer,
            mounted: MountHandle::default(),
            video_src: String::new(),
            sync_stats: SyncStats::default(),
            tick_count: 0,
        }
    }

    /// Attaches the view: loads the initial source and sets the starting rate.
    pub fn mount(&mut self, now_ms: i64) {
        let playback = self.store.playback();
        self.video_src = sources::video_url(&self.config.sources, &self.props.dongle_id, &playback);
        self.player.load(&self.video_src);

        // Nominal speed even before the start time; sync gates playback per tick
        let speed = playback.play_speed;
        self.player.set_playback_rate(if speed == 0.0 { 1.0 } else { speed });
        self.mounted.set(true);
        info!(
            "Mounted drive view for {} ({}), start in {} ms",
            self.props.route,
            self.video_src,
            playback.start_time_ms - now_ms
        );
    }

    /// Detaches the view and reloads the player to drop in-flight fetches.
    pub fn unmount(&mut self) {
        self.mounted.unmount();
        self.player.load(&self.video_src);
        info!("Unmounted drive view for {}", self.props.route);
    }

    /// Runs one frame: source tracking, then sync, then overlay.
    ///
    /// Returns `None` without touching anything once unmounted.
    pub fn tick(&mut self, now_ms: i64) -> Option<TickReport> {
        if !self.mounted.is_mounted() {
            return None;
        }
        self.tick_count += 1;

        let offset_ms = self.store.current_offset();
        let playback = self.store.playback();

        let src = sources::video_url(&self.config.sources, &self.props.dongle_id, &playback);
        let reloaded = if src != self.video_src {
            info!("Video source changed: {}", src);
            self.player.load(&src);
            self.video_src = src.clone();
            Some(src)
        } else {
            None
        };

        let input = SyncInput {
            offset_ms,
            playback: &playback,
            started: playback.start_time_ms < now_ms,
        };
        let sync = self.sync.tick(&input, &mut self.player, &mut self.image);
        self.sync_stats.record(&sync);

        let render = if self.props.should_show_ui {
            Some(self.renderer.render_pass(self.store.as_ref(), &self.props.route))
        } else {
            None
        };

        Some(TickReport {
            offset_ms,
            sync,
            render,
            reloaded,
        })
    }

    /// Ticks once per frame until unmounted or the clock stops.
    ///
    /// Returns the number of ticks run. A view torn down through its
    /// `MountHandle` reloads the player before returning.
    pub async fn run<C: FrameClock + ?Sized>(&mut self, clock: &C) -> u64 {
        let mut ticks = 0;
        if !self.mounted.is_mounted() {
            return ticks;
        }
        loop {
            if let Err(err) = clock.next_frame().await {
                debug!("Frame clock stopped after {} ticks: {}", ticks, err);
                return ticks;
            }
            if !self.mounted.is_mounted() {
                self.player.load(&self.video_src);
                info!("Drive view for {} torn down after {} ticks", self.props.route, ticks);
                return ticks;
            }
            self.tick(clock.wall_time_ms());
            ticks += 1;
        }
    }

    pub fn mount_handle(&self) -> MountHandle {
        self.mounted.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_mounted()
    }

    pub fn no_video_available(&self) -> bool {
        self.sync.no_video_available()
    }

    pub fn video_src(&self) -> &str {
        &self.video_src
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn renderer(&self) -> &OverlayRenderer<S> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut OverlayRenderer<S> {
        &mut self.renderer
    }

    pub fn store(&self) -> &Arc<T> {
        &self.store
    }

    pub fn sync_stats(&self) -> &SyncStats {
        &self.sync_stats
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::test_support::FixedStore;
    use crate::overlay::LayerKind;
    use async_trait::async_trait;
    use driveview_env::{
        BufferedRange, DisplayList, EnvError, ImageElement, PlaybackState, PlayerState, Segment,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPlayer {
        state: PlayerState,
        loads: Vec<String>,
        rates: Vec<f64>,
        seeks: Vec<f64>,
    }

    impl VideoPlayer for RecordingPlayer {
        fn state(&self) -> PlayerState {
            self.state.clone()
        }
        fn seek(&mut self, seconds: f64) {
            self.seeks.push(seconds);
        }
        fn play(&mut self) {
            self.state.paused = false;
        }
        fn pause(&mut self) {
            self.state.paused = true;
        }
        fn load(&mut self, src: &str) {
            self.loads.push(src.to_string());
        }
        fn set_playback_rate(&mut self, rate: f64) {
            self.rates.push(rate);
        }
    }

    /// Closes after a fixed number of frames; wall time advances 16 ms per frame.
    struct CountingClock {
        remaining: Mutex<u32>,
        now_ms: Mutex<i64>,
    }

    impl CountingClock {
        fn new(frames: u32) -> Self {
            Self {
                remaining: Mutex::new(frames),
                now_ms: Mutex::new(1_000),
            }
        }
    }

    #[async_trait]
    impl FrameClock for CountingClock {
        async fn next_frame(&self) -> Result<(), EnvError> {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                return Err(EnvError::SchedulerClosed);
            }
            *remaining -= 1;
            *self.now_ms.lock().unwrap() += 16;
            Ok(())
        }

        fn wall_time_ms(&self) -> i64 {
            *self.now_ms.lock().unwrap()
        }
    }

    type TestView = DriveView<RecordingPlayer, FixedStore, ImageElement, DisplayList>;

    fn segment(i: i64) -> Segment {
        Segment::new(format!("https://chffr.example/abc123/route--{}", i), i * 60_000)
    }

    fn store(offset_ms: i64, speed: f64) -> FixedStore {
        let mut store = FixedStore::with_all(100);
        store.offset_ms = offset_ms;
        store.playback = PlaybackState {
            current_segment: Some(segment(0)),
            next_segment: Some(segment(1)),
            play_speed: speed,
            start_time_ms: 0,
        };
        store
    }

    fn view(store: FixedStore) -> TestView {
        view_over(Arc::new(store))
    }

    fn view_over<T: TimelineStore>(store: Arc<T>) -> DriveView<RecordingPlayer, T, ImageElement, DisplayList> {
        let player = RecordingPlayer {
            state: PlayerState {
                current_time: 10.0,
                duration: Some(60.0),
                buffered: Some(vec![BufferedRange::new(0.0, 30.0)]),
                paused: false,
                seeking: false,
                waiting: false,
            },
            ..Default::default()
        };
        let surfaces = OverlaySurfaces {
            lane: DisplayList::new(1164.0, 874.0),
            lead: DisplayList::new(1164.0, 874.0),
            car_state: DisplayList::new(1164.0, 874.0),
        };
        let props = ViewProps {
            dongle_id: "abc123".into(),
            route: "abc123|route".into(),
            should_show_ui: true,
        };
        DriveView::new(DriveViewConfig::default(), props, store, player, ImageElement::new(), surfaces)
    }

    /// Store whose playback snapshot can be swapped while a view holds it.
    struct SwitchingStore {
        inner: FixedStore,
        playback: Mutex<PlaybackState>,
    }

    impl TimelineStore for SwitchingStore {
        fn current_offset(&self) -> i64 {
            self.inner.current_offset()
        }
        fn playback(&self) -> PlaybackState {
            self.playback.lock().unwrap().clone()
        }
        fn calibration(&self, route: &str) -> Option<driveview_env::Calibration> {
            self.inner.calibration(route)
        }
        fn latest(&self, query: driveview_env::EventQuery) -> Option<driveview_env::TelemetryEvent> {
            self.inner.latest(query)
        }
    }

    #[test]
    fn test_mount_loads_source_and_rate() {
        let mut v = view(store(10_000, 0.0));
        v.mount(1_000);
        assert!(v.is_mounted());
        assert_eq!(v.player().loads, vec!["//video.comma.ai/hls/abc123/route--0/index.m3u8"]);
        // Paused drive still starts the element at 1x
        assert_eq!(v.player().rates, vec![1.0]);
    }

    #[test]
    fn test_mount_before_start_uses_play_speed() {
        let mut s = store(10_000, 2.0);
        s.playback.start_time_ms = 60_000;
        let mut v = view(s);
        v.mount(1_000);
        assert_eq!(v.player().rates, vec![2.0]);
    }

    #[test]
    fn test_tick_before_mount_does_nothing() {
        let mut v = view(store(10_000, 1.0));
        assert!(v.tick(5_000).is_none());
        assert_eq!(v.tick_count(), 0);
        assert!(v.renderer().surface(LayerKind::CarState).unwrap().ops().is_empty());
    }

    #[test]
    fn test_tick_syncs_then_renders() {
        let mut v = view(store(10_000, 1.0));
        v.mount(1_000);
        let report = v.tick(5_000).unwrap();
        assert_eq!(report.offset_ms, 10_000);
        assert!(report.reloaded.is_none());
        assert_eq!(report.render.unwrap().redrawn.len(), 3);
        assert_eq!(v.sync_stats().nominal, 1);
    }

    #[test]
    fn test_hidden_ui_skips_renderer() {
        let mut v = view(store(10_000, 1.0));
        v.props.should_show_ui = false;
        v.mount(1_000);
        let report = v.tick(5_000).unwrap();
        assert!(report.render.is_none());
        assert!(v.renderer().surface(LayerKind::LaneAndPath).unwrap().ops().is_empty());
        assert_eq!(v.sync_stats().ticks, 1);
    }

    #[test]
    fn test_source_falls_back_to_next_segment() {
        let mut s = store(10_000, 1.0);
        s.playback.current_segment = None;
        let mut v = view(s);
        v.mount(1_000);
        assert_eq!(v.video_src(), "//video.comma.ai/hls/abc123/route--1/index.m3u8");

        // Same source on the next tick: no reload
        assert!(v.tick(5_000).unwrap().reloaded.is_none());
        assert_eq!(v.player().loads.len(), 1);
    }

    #[test]
    fn test_source_change_reloads_player() {
        let base = store(10_000, 1.0);
        let playback = base.playback.clone();
        let shared = Arc::new(SwitchingStore {
            inner: base,
            playback: Mutex::new(playback),
        });
        let mut v = view_over(Arc::clone(&shared));
        v.mount(1_000);
        assert!(v.tick(5_000).unwrap().reloaded.is_none());

        {
            let mut pb = shared.playback.lock().unwrap();
            pb.current_segment = Some(segment(1));
            pb.next_segment = Some(segment(2));
        }
        let report = v.tick(5_016).unwrap();
        let expected = "//video.comma.ai/hls/abc123/route--1/index.m3u8";
        assert_eq!(report.reloaded.as_deref(), Some(expected));
        assert_eq!(v.player().loads.last().map(String::as_str), Some(expected));
        assert!(v.tick(5_032).unwrap().reloaded.is_none());
    }

    #[test]
    fn test_unmount_reloads_and_stops_ticking() {
        let mut v = view(store(10_000, 1.0));
        v.mount(1_000);
        v.unmount();
        assert!(!v.is_mounted());
        assert_eq!(v.player().loads.len(), 2);
        assert!(v.tick(5_000).is_none());
    }

    #[tokio::test]
    async fn test_run_ticks_until_clock_closes() {
        let mut v = view(store(10_000, 1.0));
        let clock = CountingClock::new(5);
        v.mount(clock.wall_time_ms());
        let ticks = v.run(&clock).await;
        assert_eq!(ticks, 5);
        assert_eq!(v.tick_count(), 5);
        assert!(v.is_mounted());
    }

    #[tokio::test]
    async fn test_run_stops_when_handle_unmounts() {
        let mut v = view(store(10_000, 1.0));
        let clock = driveview_env::TokioFrameClock::new(500);
        v.mount(clock.wall_time_ms());
        let handle = v.mount_handle();

        let stopper = async {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            handle.unmount();
        };
        let (ticks, ()) = tokio::join!(v.run(&clock), stopper);
        assert!(ticks > 0);
        assert!(!v.is_mounted());
        // mount + teardown reload
        assert_eq!(v.player().loads.len(), 2);
    }

    #[tokio::test]
    async fn test_run_without_mount_returns_immediately() {
        let mut v = view(store(10_000, 1.0));
        let clock = CountingClock::new(5);
        assert_eq!(v.run(&clock).await, 0);
    }
}
