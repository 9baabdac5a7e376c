use bevy::{core_pipeline::bloom::BloomSettings, prelude::*, render::view::ColorGrading};
use std::time::Duration;
use stage_snapshots::camera_systems::MainCamera;
use stage_snapshots::post_process::{
    default_post_snapshot, select_target_volume, PostProcessSettings, PostProcessSnapshotManager,
    PostProcessSnapshotPlugin, PostProcessVolume, PostSnapshotTargets,
};
use stage_snapshots::snapshot::{AudioSnapshot, StageRequestEvent};

const EPSILON: f32 = 1e-4;

fn neutral_volume() -> PostProcessVolume {
    let mut volume = PostProcessVolume::default();
    PostSnapshotTargets::new(1.0, 1.0, 0.2, 0.2, 1.0, 0.0, 0.0).write_to(&mut volume.settings);
    volume
}

fn started_manager(volume: &mut PostProcessVolume) -> PostProcessSnapshotManager {
    let mut manager = PostProcessSnapshotManager::default();
    manager.begin_play(Some(volume));
    manager
}

#[test]
fn test_select_prefers_unbound_volume() {
    let a = Entity::from_raw(1);
    let b = Entity::from_raw(2);
    let c = Entity::from_raw(3);
    assert_eq!(select_target_volume([(a, false), (b, true), (c, true)]), Some(b));
    assert_eq!(select_target_volume([(a, false), (b, false)]), Some(a));
    assert_eq!(select_target_volume(std::iter::empty()), None);
}

#[test]
fn test_begin_play_snapshots_volume_and_forces_unbound() {
    let mut volume = neutral_volume();
    let manager = started_manager(&mut volume);

    assert!(volume.unbound);
    assert_eq!(manager.snapshot_table.len(), AudioSnapshot::ALL.len());
    assert_eq!(*manager.current(), PostSnapshotTargets::new(1.0, 1.0, 0.2, 0.2, 1.0, 0.0, 0.0));
    assert!(!manager.is_blending());
}

#[test]
fn test_begin_play_respects_force_unbound_off() {
    let mut volume = neutral_volume();
    let mut manager = PostProcessSnapshotManager::default();
    manager.force_unbound = false;
    manager.begin_play(Some(&mut volume));
    assert!(!volume.unbound);
}

#[test]
fn test_snapshot_read_averages_rgb_channels() {
    let mut settings = PostProcessSettings::default();
    settings.color_saturation = Vec4::new(0.6, 0.9, 1.2, 1.0);
    settings.color_contrast = Vec4::new(1.0, 1.0, 1.3, 0.5);

    let read = PostSnapshotTargets::from_settings(&settings);
    assert!((read.saturation - 0.9).abs() < EPSILON);
    assert!((read.contrast - 1.1).abs() < EPSILON);

    // Writing back is uniform across RGB, so non-uniform input does not survive.
    read.write_to(&mut settings);
    assert_eq!(settings.color_saturation, Vec4::new(read.saturation, read.saturation, read.saturation, 1.0));
    assert_eq!(settings.color_contrast.w, 1.0);
}

#[test]
fn test_push_sets_every_override_flag() {
    let mut settings = PostProcessSettings::default();
    default_post_snapshot(AudioSnapshot::Vice).write_to(&mut settings);

    assert!(settings.override_color_saturation);
    assert!(settings.override_color_contrast);
    assert!(settings.override_vignette_intensity);
    assert!(settings.override_bloom_intensity);
    assert!(settings.override_bloom_threshold);
    assert!(settings.override_scene_fringe_intensity);
    assert!(settings.override_film_grain_intensity);
    assert_eq!(settings.film_grain_intensity, 0.25);
    assert_eq!(settings.scene_fringe_intensity, 0.20);
}

#[test]
fn test_mourning_midpoint_is_linear() {
    let mut volume = neutral_volume();
    let mut manager = started_manager(&mut volume);

    manager.apply_post_snapshot(AudioSnapshot::Mourning, 1.0, Some(&mut volume));
    manager.tick(0.25, Some(&mut volume));
    manager.tick(0.25, Some(&mut volume));

    let current = *manager.current();
    assert!((current.saturation - 0.90).abs() < EPSILON);
    assert!((current.contrast - 0.95).abs() < EPSILON);
    let pushed = PostSnapshotTargets::from_settings(&volume.settings);
    assert!((pushed.saturation - 0.90).abs() < EPSILON);
    assert!((pushed.vignette - 0.275).abs() < EPSILON);

    manager.tick(0.5, Some(&mut volume));
    assert!(!manager.is_blending());
    assert_eq!(*manager.current(), default_post_snapshot(AudioSnapshot::Mourning));
}

#[test]
fn test_zero_blend_snaps_onto_volume() {
    let mut volume = neutral_volume();
    let mut manager = started_manager(&mut volume);

    manager.apply_post_snapshot(AudioSnapshot::Art, 0.0, Some(&mut volume));
    assert!(!manager.is_blending());
    let art = default_post_snapshot(AudioSnapshot::Art);
    assert_eq!(*manager.current(), art);
    assert_eq!(volume.settings.bloom_intensity, art.bloom_intensity);
}

#[test]
fn test_missing_snapshot_is_ignored() {
    let mut volume = neutral_volume();
    let mut manager = started_manager(&mut volume);
    manager.snapshot_table.remove(AudioSnapshot::Politics);
    let before = *manager.current();

    manager.apply_post_snapshot(AudioSnapshot::Politics, 1.0, Some(&mut volume));
    assert!(!manager.is_blending());
    assert_eq!(*manager.current(), before);
}

#[test]
fn test_no_volume_means_no_blend() {
    let mut manager = PostProcessSnapshotManager::default();
    manager.begin_play(None);
    assert_eq!(*manager.current(), PostSnapshotTargets::default());

    manager.apply_post_snapshot(AudioSnapshot::Conflict, 1.0, None);
    assert!(!manager.is_blending());
    manager.tick(1.0, None);
    assert_eq!(*manager.current(), PostSnapshotTargets::default());
}

#[test]
fn test_losing_volume_ends_blend() {
    let mut volume = neutral_volume();
    let mut manager = started_manager(&mut volume);

    manager.apply_post_snapshot(AudioSnapshot::Mourning, 1.0, Some(&mut volume));
    manager.tick(0.5, Some(&mut volume));
    let halfway = *manager.current();

    manager.tick(0.25, None);
    assert!(!manager.is_blending());
    assert_eq!(*manager.current(), halfway);
}

#[test]
fn test_retrigger_blends_from_in_progress_look() {
    let mut volume = neutral_volume();
    let mut manager = started_manager(&mut volume);

    manager.apply_post_snapshot(AudioSnapshot::Mourning, 1.0, Some(&mut volume));
    manager.tick(0.5, Some(&mut volume));
    let halfway = *manager.current();

    manager.apply_post_snapshot(AudioSnapshot::Art, 1.0, Some(&mut volume));
    assert_eq!(*manager.blend().start(), halfway);
}

// --- ECS wiring ---

fn advance(app: &mut App, seconds: f32) {
    app.world.resource_mut::<Time>().advance_by(Duration::from_secs_f32(seconds));
    app.update();
}

fn post_app() -> App {
    let mut app = App::new();
    app.init_resource::<Time>().add_plugins(PostProcessSnapshotPlugin);
    app
}

#[test]
fn test_plugin_discovers_unbound_volume() {
    let mut app = post_app();
    app.world.spawn(PostProcessVolume::default());
    let global = app.world.spawn(PostProcessVolume { unbound: true, ..default() }).id();
    advance(&mut app, 0.0);

    assert_eq!(app.world.resource::<PostProcessSnapshotManager>().target_volume, Some(global));
}

#[test]
fn test_plugin_blends_volume_and_mirrors_camera() {
    let mut app = post_app();
    let volume = app.world.spawn(neutral_volume()).id();
    let camera = app.world.spawn((ColorGrading::default(), BloomSettings::default(), MainCamera)).id();
    advance(&mut app, 0.0);

    app.world.send_event(StageRequestEvent::snapshot_over(AudioSnapshot::Celestial, 1.0));
    advance(&mut app, 0.5);
    let saturation = app.world.get::<PostProcessVolume>(volume).map(|v| v.settings.color_saturation.x);
    assert!(saturation.is_some_and(|s| (s - 1.025).abs() < EPSILON));

    advance(&mut app, 0.5);
    let celestial = default_post_snapshot(AudioSnapshot::Celestial);
    assert!(!app.world.resource::<PostProcessSnapshotManager>().is_blending());

    let grading = app.world.get::<ColorGrading>(camera).map(|g| g.post_saturation);
    assert_eq!(grading, Some(celestial.saturation));
    let bloom = app.world.get::<BloomSettings>(camera).map(|b| (b.intensity, b.prefilter_settings.threshold));
    assert_eq!(bloom, Some((celestial.bloom_intensity, celestial.bloom_threshold)));
}

#[test]
fn test_plugin_uses_default_blend_time() {
    let mut app = post_app();
    app.world.spawn(neutral_volume());
    advance(&mut app, 0.0);

    app.world.send_event(StageRequestEvent::snapshot(AudioSnapshot::Family));
    advance(&mut app, 0.1);
    let manager = app.world.resource::<PostProcessSnapshotManager>();
    assert!(manager.is_blending());
    assert_eq!(manager.blend().duration(), manager.default_blend_seconds);
}

#[test]
fn test_plugin_ignores_light_color_requests() {
    let mut app = post_app();
    app.world.spawn(neutral_volume());
    advance(&mut app, 0.0);

    app.world.send_event(StageRequestEvent::light_color(Color::rgb_linear(1.0, 0.0, 0.0), 1.0));
    advance(&mut app, 0.1);
    assert!(!app.world.resource::<PostProcessSnapshotManager>().is_blending());
}

#[test]
fn test_camera_spawned_after_blend_gets_current_look() {
    let mut app = post_app();
    app.world.spawn(neutral_volume());
    advance(&mut app, 0.0);

    app.world.send_event(StageRequestEvent::snapshot(AudioSnapshot::Vice));
    advance(&mut app, 1.0);
    advance(&mut app, 0.1);
    assert!(!app.world.resource::<PostProcessSnapshotManager>().is_blending());

    let camera = app.world.spawn((ColorGrading::default(), BloomSettings::default(), MainCamera)).id();
    advance(&mut app, 0.1);

    let vice = default_post_snapshot(AudioSnapshot::Vice);
    assert_eq!(app.world.get::<ColorGrading>(camera).map(|g| g.post_saturation), Some(vice.saturation));
    assert_eq!(app.world.get::<BloomSettings>(camera).map(|b| b.intensity), Some(vice.bloom_intensity));
}

#[test]
fn test_despawned_volume_mid_blend_clears_target() {
    let mut app = post_app();
    let volume = app.world.spawn(neutral_volume()).id();
    advance(&mut app, 0.0);

    app.world.send_event(StageRequestEvent::snapshot_over(AudioSnapshot::Art, 1.0));
    advance(&mut app, 0.25);
    assert!(app.world.resource::<PostProcessSnapshotManager>().is_blending());

    app.world.despawn(volume);
    advance(&mut app, 0.25);
    let manager = app.world.resource::<PostProcessSnapshotManager>();
    assert!(!manager.is_blending());
    assert_eq!(manager.target_volume, None);
}
