use bevy::prelude::Color;
use stage_snapshots::blend::{lerp_hue, Blend, BlendState, Hsv, MIN_BLEND_SECONDS, SNAP_THRESHOLD_SECONDS};
use stage_snapshots::post_process::PostSnapshotTargets;

const EPSILON: f32 = 1e-4;

fn assert_color_eq(actual: Color, expected: Color) {
    let a = actual.as_linear_rgba_f32();
    let e = expected.as_linear_rgba_f32();
    for i in 0..4 {
        assert!((a[i] - e[i]).abs() < EPSILON, "channel {}: {:?} != {:?}", i, a, e);
    }
}

#[test]
fn test_blend_reaches_target_and_stops() {
    let mut state = BlendState::new(PostSnapshotTargets::default());
    let target = PostSnapshotTargets::new(0.8, 0.9, 0.35, 0.4, 1.0, 0.1, 0.2);

    assert!(state.begin(target, 1.0).is_none());
    assert!(state.is_active());

    for _ in 0..9 {
        assert!(state.step(0.1).is_some());
        assert!(state.is_active());
    }
    let last = state.step(0.2).expect("final step pushes a value");
    assert_eq!(last, target);
    assert_eq!(*state.current(), target);
    assert!(!state.is_active());
}

#[test]
fn test_short_blend_snaps_immediately() {
    let mut state = BlendState::new(Color::WHITE);
    let red = Color::rgb_linear(1.0, 0.0, 0.0);

    let snapped = state.begin(red, SNAP_THRESHOLD_SECONDS);
    assert_eq!(snapped, Some(red));
    assert_eq!(*state.current(), red);
    assert!(!state.is_active());

    // Non-positive durations are floored and snap too.
    let snapped = state.begin(Color::WHITE, -3.0);
    assert_eq!(snapped, Some(Color::WHITE));
    assert!(!state.is_active());
    assert_eq!(state.duration(), MIN_BLEND_SECONDS);
}

#[test]
fn test_blend_just_above_threshold_interpolates() {
    let mut state = BlendState::new(PostSnapshotTargets::default());
    let target = PostSnapshotTargets { saturation: 0.0, ..Default::default() };
    assert!(state.begin(target, 0.02).is_none());
    assert!(state.is_active());
    let mid = state.step(0.01).expect("blending");
    assert!((mid.saturation - 0.5).abs() < EPSILON);
}

#[test]
fn test_step_after_completion_is_noop() {
    let mut state = BlendState::new(PostSnapshotTargets::default());
    let target = PostSnapshotTargets { contrast: 1.5, ..Default::default() };
    state.begin(target, 0.5);
    state.step(1.0);
    assert!(!state.is_active());

    assert!(state.step(0.25).is_none());
    assert_eq!(*state.current(), target);
}

#[test]
fn test_alpha_is_monotonic_and_bounded() {
    let mut state = BlendState::new(PostSnapshotTargets::default());
    state.begin(PostSnapshotTargets { vignette: 1.0, ..Default::default() }, 0.75);

    let mut previous = state.alpha();
    for delta in [0.05, 0.2, 0.0, 0.13, 0.4, 0.3] {
        state.step(delta);
        let alpha = state.alpha();
        assert!(alpha >= previous);
        assert!((0.0..=1.0).contains(&alpha));
        previous = alpha;
    }
    assert_eq!(previous, 1.0);
}

#[test]
fn test_retrigger_starts_from_in_progress_value() {
    let mut state = BlendState::new(PostSnapshotTargets { saturation: 1.0, ..Default::default() });
    state.begin(PostSnapshotTargets { saturation: 0.0, ..Default::default() }, 1.0);
    state.step(0.5);
    let in_progress = *state.current();
    assert!((in_progress.saturation - 0.5).abs() < EPSILON);

    let replacement = PostSnapshotTargets { saturation: 2.0, ..Default::default() };
    state.begin(replacement, 1.0);
    assert_eq!(*state.start(), in_progress);
    assert_eq!(*state.target(), replacement);
    assert_eq!(state.elapsed(), 0.0);

    let next = state.step(0.5).expect("blending");
    assert!((next.saturation - 1.25).abs() < EPSILON);
}

#[test]
fn test_hue_takes_shorter_arc() {
    let hue = lerp_hue(350.0, 10.0, 0.5);
    assert!(hue < EPSILON || (360.0 - hue) < EPSILON, "hue was {}", hue);

    assert!((lerp_hue(10.0, 350.0, 0.25) - 5.0).abs() < EPSILON);
    assert!((lerp_hue(0.0, 120.0, 0.5) - 60.0).abs() < EPSILON);
}

#[test]
fn test_hsv_round_trip() {
    for rgb in [[1.0, 0.0, 0.0], [0.2, 0.7, 0.4], [0.85, 0.9, 1.0], [0.0, 0.0, 0.0], [0.5, 0.5, 0.5]] {
        let hsv = Hsv::from_linear_rgb(rgb[0], rgb[1], rgb[2]);
        let back = hsv.to_linear_rgb();
        for i in 0..3 {
            assert!((back[i] - rgb[i]).abs() < EPSILON, "{:?} -> {:?} -> {:?}", rgb, hsv, back);
        }
    }
}

#[test]
fn test_red_to_blue_passes_through_magenta() {
    let red = Color::rgb_linear(1.0, 0.0, 0.0);
    let blue = Color::rgb_linear(0.0, 0.0, 1.0);
    let mid = Color::blend(&red, &blue, 0.5).as_linear_rgba_f32();

    // Hue 300 at full saturation and value: magenta, not grey.
    assert!((mid[0] - 1.0).abs() < EPSILON);
    assert!(mid[1].abs() < EPSILON);
    assert!((mid[2] - 1.0).abs() < EPSILON);
}

#[test]
fn test_color_blend_endpoints() {
    let start = Color::rgb_linear(0.85, 0.90, 1.00);
    let end = Color::rgb_linear(1.00, 0.90, 0.70);
    assert_color_eq(Color::blend(&start, &end, 0.0), start);
    assert_color_eq(Color::blend(&start, &end, 1.0), end);
}

#[test]
fn test_post_targets_blend_per_channel() {
    let start = PostSnapshotTargets::new(1.0, 1.0, 0.2, 0.2, 1.0, 0.0, 0.0);
    let end = PostSnapshotTargets::new(0.8, 0.9, 0.4, 0.6, 1.2, 0.2, 0.1);
    let mid = PostSnapshotTargets::blend(&start, &end, 0.5);
    assert!((mid.saturation - 0.9).abs() < EPSILON);
    assert!((mid.contrast - 0.95).abs() < EPSILON);
    assert!((mid.vignette - 0.3).abs() < EPSILON);
    assert!((mid.bloom_intensity - 0.4).abs() < EPSILON);
    assert!((mid.bloom_threshold - 1.1).abs() < EPSILON);
    assert!((mid.scene_fringe - 0.1).abs() < EPSILON);
    assert!((mid.grain - 0.05).abs() < EPSILON);
}
