// src/post_process.rs
use bevy::{
    core_pipeline::bloom::BloomSettings,
    prelude::*,
    render::view::ColorGrading,
};
use crate::{
    blend::{Blend, BlendState},
    camera_systems::MainCamera,
    snapshot::{AudioSnapshot, SnapshotTable, StageRequestEvent},
};

pub const DEFAULT_POST_BLEND_SECONDS: f32 = 0.35;

/// Overridable look settings of a [`PostProcessVolume`]. A channel only takes
/// effect when its `override_*` flag is set.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct PostProcessSettings {
    pub override_color_saturation: bool,
    pub color_saturation: Vec4,
    pub override_color_contrast: bool,
    pub color_contrast: Vec4,
    pub override_vignette_intensity: bool,
    pub vignette_intensity: f32,
    pub override_bloom_intensity: bool,
    pub bloom_intensity: f32,
    pub override_bloom_threshold: bool,
    pub bloom_threshold: f32,
    pub override_scene_fringe_intensity: bool,
    pub scene_fringe_intensity: f32,
    pub override_film_grain_intensity: bool,
    pub film_grain_intensity: f32,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            override_color_saturation: false,
            color_saturation: Vec4::ONE,
            override_color_contrast: false,
            color_contrast: Vec4::ONE,
            override_vignette_intensity: false,
            vignette_intensity: 0.4,
            override_bloom_intensity: false,
            bloom_intensity: 0.675,
            override_bloom_threshold: false,
            bloom_threshold: -1.0,
            override_scene_fringe_intensity: false,
            scene_fringe_intensity: 0.0,
            override_film_grain_intensity: false,
            film_grain_intensity: 0.0,
        }
    }
}

#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct PostProcessVolume {
    /// Unbound volumes apply everywhere and define the global look.
    pub unbound: bool,
    pub settings: PostProcessSettings,
}

/// The channels a post snapshot tunes. Saturation and contrast are neutral
/// at 1.0, the rest are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PostSnapshotTargets {
    pub saturation: f32,
    pub contrast: f32,
    pub vignette: f32,
    pub bloom_intensity: f32,
    pub bloom_threshold: f32,
    pub scene_fringe: f32,
    pub grain: f32,
}

impl Default for PostSnapshotTargets {
    fn default() -> Self {
        Self {
            saturation: 1.0,
            contrast: 1.0,
            vignette: 0.2,
            bloom_intensity: 0.2,
            bloom_threshold: 1.0,
            scene_fringe: 0.0,
            grain: 0.0,
        }
    }
}

impl PostSnapshotTargets {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(saturation: f32, contrast: f32, vignette: f32, bloom_intensity: f32, bloom_threshold: f32, scene_fringe: f32, grain: f32) -> Self {
        Self { saturation, contrast, vignette, bloom_intensity, bloom_threshold, scene_fringe, grain }
    }

    /// Reads the current look off a volume. Saturation and contrast collapse
    /// their RGB components to one averaged scalar.
    pub fn from_settings(settings: &PostProcessSettings) -> Self {
        let average = |v: Vec4| (v.x + v.y + v.z) / 3.0;
        Self {
            saturation: average(settings.color_saturation),
            contrast: average(settings.color_contrast),
            vignette: settings.vignette_intensity,
            bloom_intensity: settings.bloom_intensity,
            bloom_threshold: settings.bloom_threshold,
            scene_fringe: settings.scene_fringe_intensity,
            grain: settings.film_grain_intensity,
        }
    }

    pub fn write_to(&self, settings: &mut PostProcessSettings) {
        settings.override_color_saturation = true;
        settings.override_color_contrast = true;
        settings.override_vignette_intensity = true;
        settings.override_bloom_intensity = true;
        settings.override_bloom_threshold = true;
        settings.override_scene_fringe_intensity = true;
        settings.override_film_grain_intensity = true;

        settings.color_saturation = Vec3::splat(self.saturation).extend(1.0);
        settings.color_contrast = Vec3::splat(self.contrast).extend(1.0);
        settings.vignette_intensity = self.vignette;
        settings.bloom_intensity = self.bloom_intensity;
        settings.bloom_threshold = self.bloom_threshold;
        settings.scene_fringe_intensity = self.scene_fringe;
        settings.film_grain_intensity = self.grain;
    }
}

impl Blend for PostSnapshotTargets {
    fn blend(start: &Self, target: &Self, alpha: f32) -> Self {
        let lerp = |a: f32, b: f32| a + (b - a) * alpha;
        Self {
            saturation: lerp(start.saturation, target.saturation),
            contrast: lerp(start.contrast, target.contrast),
            vignette: lerp(start.vignette, target.vignette),
            bloom_intensity: lerp(start.bloom_intensity, target.bloom_intensity),
            bloom_threshold: lerp(start.bloom_threshold, target.bloom_threshold),
            scene_fringe: lerp(start.scene_fringe, target.scene_fringe),
            grain: lerp(start.grain, target.grain),
        }
    }
}

pub fn default_post_snapshot(snapshot: AudioSnapshot) -> PostSnapshotTargets {
    //                                          sat   con   vig   bloom thresh fringe grain
    match snapshot {
        AudioSnapshot::Celestial => PostSnapshotTargets::new(1.05, 0.95, 0.10, 0.60, 0.80, 0.00, 0.00),
        AudioSnapshot::Terrestrial => PostSnapshotTargets::new(0.95, 1.00, 0.20, 0.20, 1.00, 0.00, 0.05),
        AudioSnapshot::Conflict => PostSnapshotTargets::new(1.00, 1.10, 0.30, 0.10, 1.20, 0.20, 0.15),
        AudioSnapshot::Mourning => PostSnapshotTargets::new(0.80, 0.90, 0.35, 0.40, 1.00, 0.10, 0.20),
        AudioSnapshot::Family => PostSnapshotTargets::new(1.05, 1.00, 0.15, 0.30, 0.95, 0.00, 0.05),
        AudioSnapshot::ScienceCrime => PostSnapshotTargets::new(1.00, 1.05, 0.20, 0.20, 1.10, 0.05, 0.05),
        AudioSnapshot::Art => PostSnapshotTargets::new(1.10, 1.05, 0.12, 0.70, 0.85, 0.00, 0.00),
        AudioSnapshot::Vice => PostSnapshotTargets::new(0.90, 1.10, 0.25, 0.15, 1.20, 0.20, 0.25),
        AudioSnapshot::Betrayal => PostSnapshotTargets::new(0.95, 1.00, 0.30, 0.10, 1.10, 0.10, 0.10),
        AudioSnapshot::Politics => PostSnapshotTargets::new(1.00, 1.00, 0.20, 0.20, 1.00, 0.00, 0.05),
        AudioSnapshot::Reflection => PostSnapshotTargets::new(0.85, 0.95, 0.33, 0.35, 1.05, 0.05, 0.15),
    }
}

/// Picks the volume to drive: the first unbound one, else the first one.
pub fn select_target_volume(candidates: impl IntoIterator<Item = (Entity, bool)>) -> Option<Entity> {
    let mut first = None;
    for (entity, unbound) in candidates {
        if unbound {
            return Some(entity);
        }
        first = first.or(Some(entity));
    }
    first
}

/// Blends the look of one [`PostProcessVolume`] between mood presets.
#[derive(Resource)]
pub struct PostProcessSnapshotManager {
    /// Discovered at startup when left unset.
    pub target_volume: Option<Entity>,
    /// Turn the driven volume into a global one.
    pub force_unbound: bool,
    pub default_blend_seconds: f32,
    /// Left empty, it is filled from [`default_post_snapshot`] at startup.
    pub snapshot_table: SnapshotTable<PostSnapshotTargets>,
    blend: BlendState<PostSnapshotTargets>,
}

impl Default for PostProcessSnapshotManager {
    fn default() -> Self {
        Self {
            target_volume: None,
            force_unbound: true,
            default_blend_seconds: DEFAULT_POST_BLEND_SECONDS,
            snapshot_table: SnapshotTable::default(),
            blend: BlendState::default(),
        }
    }
}

impl PostProcessSnapshotManager {
    pub fn current(&self) -> &PostSnapshotTargets { self.blend.current() }
    pub fn blend(&self) -> &BlendState<PostSnapshotTargets> { &self.blend }
    pub fn is_blending(&self) -> bool { self.blend.is_active() }

    pub fn begin_play(&mut self, volume: Option<&mut PostProcessVolume>) {
        if self.snapshot_table.is_empty() {
            self.snapshot_table = SnapshotTable::from_fn(default_post_snapshot);
        }

        let initial = match volume {
            Some(volume) => {
                if self.force_unbound {
                    volume.unbound = true;
                }
                PostSnapshotTargets::from_settings(&volume.settings)
            }
            None => {
                warn!("PostProcessSnapshotManager: no post process volume to drive");
                PostSnapshotTargets::default()
            }
        };
        self.blend.reset_to(initial);
    }

    pub fn apply_post_snapshot(&mut self, snapshot: AudioSnapshot, blend_seconds: f32, volume: Option<&mut PostProcessVolume>) {
        let Some(volume) = volume else {
            debug!("PostProcessSnapshotManager: no target volume, ignoring {:?}", snapshot);
            return;
        };
        let Some(target) = self.snapshot_table.get(snapshot).copied() else {
            warn!("PostProcessSnapshotManager: post snapshot {:?} not found", snapshot);
            return;
        };
        if let Some(snapped) = self.blend.begin(target, blend_seconds) {
            snapped.write_to(&mut volume.settings);
        }
    }

    /// Without a volume an active blend is dropped, leaving `current` at the
    /// last value pushed.
    pub fn tick(&mut self, delta_secs: f32, volume: Option<&mut PostProcessVolume>) {
        let Some(volume) = volume else {
            if self.blend.is_active() {
                debug!("PostProcessSnapshotManager: target volume lost, ending blend");
                let current = *self.blend.current();
                self.blend.reset_to(current);
            }
            return;
        };
        if let Some(blended) = self.blend.step(delta_secs) {
            blended.write_to(&mut volume.settings);
        }
    }
}

pub struct PostProcessSnapshotPlugin;

impl Plugin for PostProcessSnapshotPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PostProcessSettings>()
            .register_type::<PostProcessVolume>()
            .register_type::<PostSnapshotTargets>()
            .init_resource::<PostProcessSnapshotManager>()
            .add_event::<StageRequestEvent>()
            .add_systems(PostStartup, begin_post_process_snapshots)
            .add_systems(Update, (
                post_snapshot_request_system,
                post_blend_tick_system,
                mirror_global_volume_to_cameras,
            ).chain());
    }
}

fn begin_post_process_snapshots(
    mut manager: ResMut<PostProcessSnapshotManager>,
    mut volumes: Query<(Entity, &mut PostProcessVolume)>,
) {
    if manager.target_volume.is_none() {
        manager.target_volume = select_target_volume(volumes.iter().map(|(entity, volume)| (entity, volume.unbound)));
        if let Some(entity) = manager.target_volume {
            info!("PostProcessSnapshotManager: driving volume {:?}", entity);
        }
    }
    let mut target = manager
        .target_volume
        .and_then(|entity| volumes.get_mut(entity).ok())
        .map(|(_, volume)| volume);
    manager.begin_play(target.as_deref_mut());
}

fn post_snapshot_request_system(
    mut manager: ResMut<PostProcessSnapshotManager>,
    mut requests: EventReader<StageRequestEvent>,
    mut volumes: Query<&mut PostProcessVolume>,
) {
    for request in requests.read() {
        let StageRequestEvent::Snapshot { snapshot, blend_seconds } = *request else { continue; };
        let blend_seconds = blend_seconds.unwrap_or(manager.default_blend_seconds);
        let mut target = manager.target_volume.and_then(|entity| volumes.get_mut(entity).ok());
        manager.apply_post_snapshot(snapshot, blend_seconds, target.as_deref_mut());
    }
}

fn post_blend_tick_system(
    time: Res<Time>,
    mut manager: ResMut<PostProcessSnapshotManager>,
    mut volumes: Query<&mut PostProcessVolume>,
) {
    if !manager.is_blending() {
        return;
    }
    let mut target = manager.target_volume.and_then(|entity| volumes.get_mut(entity).ok());
    if target.is_none() {
        if let Some(entity) = manager.target_volume.take() {
            warn!("PostProcessSnapshotManager: target volume {:?} is gone", entity);
        }
    }
    manager.tick(time.delta_seconds(), target.as_deref_mut());
}

/// Bevy cameras have no volume concept, so the global look is copied onto
/// every main camera's grading and bloom when it changes, and onto cameras
/// spawned since.
fn mirror_global_volume_to_cameras(
    volumes: Query<Ref<PostProcessVolume>>,
    mut cameras: Query<(Ref<MainCamera>, Option<&mut ColorGrading>, Option<&mut BloomSettings>)>,
) {
    let Some(volume) = volumes.iter().find(|volume| volume.unbound) else { return; };
    let volume_changed = volume.is_changed();
    let settings = &volume.settings;
    let look = PostSnapshotTargets::from_settings(settings);

    for (marker, grading, bloom) in cameras.iter_mut() {
        if !volume_changed && !marker.is_added() {
            continue;
        }
        if let Some(mut grading) = grading {
            if settings.override_color_saturation {
                grading.post_saturation = look.saturation;
            }
        }
        if let Some(mut bloom) = bloom {
            if settings.override_bloom_intensity {
                bloom.intensity = look.bloom_intensity;
            }
            if settings.override_bloom_threshold {
                bloom.prefilter_settings.threshold = look.bloom_threshold.max(0.0);
            }
        }
    }
}
