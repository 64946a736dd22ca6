//! Every scenario must pass on a spread of seeds.

use driveview_sim::{ScenarioId, ScenarioRunner};
use proptest::prelude::*;

fn assert_passes(scenario: ScenarioId, seed: u64) {
    let result = ScenarioRunner::new(seed).with_duration(15.0).run(scenario);
    assert!(
        result.passed,
        "{} seed={} failed: {:?}",
        scenario,
        seed,
        result.failure_reason
    );
}

#[test]
fn steady_play() {
    assert_passes(ScenarioId::SteadyPlay, 42);
}

#[test]
fn scrub_forward() {
    assert_passes(ScenarioId::ScrubForward, 42);
}

#[test]
fn scrub_backward() {
    assert_passes(ScenarioId::ScrubBackward, 42);
}

#[test]
fn double_speed() {
    assert_passes(ScenarioId::DoubleSpeed, 42);
}

#[test]
fn segment_change() {
    assert_passes(ScenarioId::SegmentChange, 42);
}

#[test]
fn calibration_dropout() {
    assert_passes(ScenarioId::CalibrationDropout, 42);
}

#[test]
fn short_video() {
    assert_passes(ScenarioId::ShortVideo, 42);
}

#[test]
fn late_start() {
    assert_passes(ScenarioId::LateStart, 42);
}

#[test]
fn paused() {
    assert_passes(ScenarioId::Paused, 42);
}

#[test]
fn same_seed_is_reproducible() {
    let runner = ScenarioRunner::new(7).with_duration(12.0);
    let a = runner.run(ScenarioId::ScrubBackward);
    let b = runner.run(ScenarioId::ScrubBackward);
    assert_eq!(a.total_ticks, b.total_ticks);
    assert_eq!(a.metrics.sync, b.metrics.sync);
    assert_eq!(a.metrics.player.seeks, b.metrics.player.seeks);
    assert_eq!(a.metrics.final_drift, b.metrics.final_drift);
}

#[test]
fn short_video_never_plays_past_the_end() {
    let result = ScenarioRunner::new(11).run(ScenarioId::ShortVideo);
    assert!(result.metrics.player.max_time <= 30.0);
    assert!(result.metrics.sync.no_video_transitions >= 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn steady_play_any_seed(seed in 1u64..u64::MAX) {
        let result = ScenarioRunner::new(seed).with_duration(10.0).run(ScenarioId::SteadyPlay);
        prop_assert!(result.passed, "seed={} {:?}", seed, result.failure_reason);
    }

    #[test]
    fn scrub_forward_any_seed(seed in 1u64..u64::MAX) {
        let result = ScenarioRunner::new(seed).run(ScenarioId::ScrubForward);
        prop_assert!(result.passed, "seed={} {:?}", seed, result.failure_reason);
    }
}
