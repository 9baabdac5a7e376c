// src/light_snapshot.rs
use bevy::prelude::*;
use crate::{
    blend::BlendState,
    snapshot::{AudioSnapshot, SnapshotTable, StageRequestEvent},
};

pub const DEFAULT_LIGHT_BLEND_SECONDS: f32 = 0.35;

/// A stage fixture. The beam color lives on the entity's `SpotLight`.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct StageLight;

/// Read/write access to fixture colors.
pub trait LightFixtures {
    /// `None` when the fixture no longer exists.
    fn light_color(&self, fixture: Entity) -> Option<Color>;
    /// Returns `false` when the fixture no longer exists.
    fn set_light_color(&mut self, fixture: Entity, color: Color) -> bool;
}

impl LightFixtures for Query<'_, '_, &mut SpotLight, With<StageLight>> {
    fn light_color(&self, fixture: Entity) -> Option<Color> {
        self.get(fixture).ok().map(|spot| spot.color)
    }

    fn set_light_color(&mut self, fixture: Entity, color: Color) -> bool {
        match self.get_mut(fixture) {
            Ok(mut spot) => {
                spot.color = color;
                true
            }
            Err(_) => false,
        }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageLightRegistrationEvent {
    Register(Entity),
    Unregister(Entity),
}

/// Drives the color of every registered [`StageLight`].
#[derive(Resource)]
pub struct LightSnapshotManager {
    /// Register every `StageLight` in the world at startup.
    pub auto_find_lights: bool,
    pub default_blend_seconds: f32,
    /// Left empty, it is filled from [`default_snapshot_color`] at startup.
    pub snapshot_colors: SnapshotTable<Color>,
    lights: Vec<Entity>,
    blend: BlendState<Color>,
}

impl Default for LightSnapshotManager {
    fn default() -> Self {
        Self {
            auto_find_lights: true,
            default_blend_seconds: DEFAULT_LIGHT_BLEND_SECONDS,
            snapshot_colors: SnapshotTable::default(),
            lights: Vec::new(),
            blend: BlendState::new(Color::WHITE),
        }
    }
}

impl LightSnapshotManager {
    pub fn lights(&self) -> &[Entity] { &self.lights }
    pub fn current_color(&self) -> Color { *self.blend.current() }
    pub fn blend(&self) -> &BlendState<Color> { &self.blend }
    pub fn is_blending(&self) -> bool { self.blend.is_active() }

    pub fn begin_play(
        &mut self,
        discovered: impl IntoIterator<Item = Entity>,
        fixtures: &mut impl LightFixtures,
    ) {
        // Lights are only collected here; the first one's color is sampled
        // before anything is pushed to it.
        if self.auto_find_lights {
            for light in discovered {
                if light != Entity::PLACEHOLDER && !self.lights.contains(&light) {
                    self.lights.push(light);
                }
            }
        }

        if self.snapshot_colors.is_empty() {
            self.snapshot_colors = SnapshotTable::from_fn(default_snapshot_color);
        }

        let initial = self
            .lights
            .first()
            .and_then(|light| fixtures.light_color(*light))
            .unwrap_or(Color::WHITE);
        self.blend.reset_to(initial);
        self.push_color_all(initial, fixtures);

        info!("LightSnapshotManager: driving {} stage light(s)", self.lights.len());
    }

    pub fn register_light(&mut self, light: Entity, fixtures: &mut impl LightFixtures) {
        if light == Entity::PLACEHOLDER {
            return;
        }
        if !self.lights.contains(&light) {
            self.lights.push(light);
        }
        fixtures.set_light_color(light, self.current_color());
    }

    pub fn unregister_light(&mut self, light: Entity) {
        self.lights.retain(|registered| *registered != light);
    }

    pub fn apply_light_color(&mut self, color: Color, blend_seconds: f32, fixtures: &mut impl LightFixtures) {
        let blend_seconds = if blend_seconds <= 0.0 { self.default_blend_seconds } else { blend_seconds };
        if let Some(snapped) = self.blend.begin(color, blend_seconds) {
            self.push_color_all(snapped, fixtures);
        }
    }

    pub fn apply_light_snapshot(&mut self, snapshot: AudioSnapshot, blend_seconds: f32, fixtures: &mut impl LightFixtures) {
        let Some(color) = self.snapshot_colors.get(snapshot).copied() else {
            warn!("LightSnapshotManager: no color for snapshot {:?}", snapshot);
            return;
        };
        self.apply_light_color(color, blend_seconds, fixtures);
    }

    pub fn tick(&mut self, delta_secs: f32, fixtures: &mut impl LightFixtures) {
        if let Some(color) = self.blend.step(delta_secs) {
            self.push_color_all(color, fixtures);
        }
    }

    fn push_color_all(&mut self, color: Color, fixtures: &mut impl LightFixtures) {
        for i in (0..self.lights.len()).rev() {
            if !fixtures.set_light_color(self.lights[i], color) {
                debug!("LightSnapshotManager: dropping stale light {:?}", self.lights[i]);
                self.lights.swap_remove(i);
            }
        }
    }
}

pub fn default_snapshot_color(snapshot: AudioSnapshot) -> Color {
    match snapshot {
        AudioSnapshot::Celestial => Color::rgb_linear(0.85, 0.90, 1.00),    // cool airy white
        AudioSnapshot::Terrestrial => Color::rgb_linear(1.00, 0.90, 0.70),  // warm amber
        AudioSnapshot::Conflict => Color::rgb_linear(0.70, 0.09, 0.11),     // deep red
        AudioSnapshot::Mourning => Color::rgb_linear(0.75, 0.75, 0.80),     // desaturated
        AudioSnapshot::Family => Color::rgb_linear(1.00, 0.92, 0.80),       // soft amber
        AudioSnapshot::ScienceCrime => Color::rgb_linear(0.70, 0.90, 1.00), // cool lab
        AudioSnapshot::Art => Color::rgb_linear(1.00, 0.98, 0.92),          // elegant warm white
        AudioSnapshot::Vice => Color::rgb_linear(0.90, 0.70, 0.90),         // dimmed magenta
        AudioSnapshot::Betrayal => Color::rgb_linear(0.85, 0.90, 1.00),     // chilly white
        AudioSnapshot::Politics => Color::rgb_linear(1.00, 1.00, 1.00),     // neutral
        AudioSnapshot::Reflection => Color::rgb_linear(0.90, 0.95, 1.00),   // quiet cool
    }
}

pub struct LightSnapshotPlugin;

impl Plugin for LightSnapshotPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<StageLight>()
            .init_resource::<LightSnapshotManager>()
            .add_event::<StageRequestEvent>()
            .add_event::<StageLightRegistrationEvent>()
            .add_systems(PostStartup, begin_light_snapshots)
            .add_systems(Update, (
                light_registration_system,
                light_request_system,
                light_blend_tick_system,
            ).chain());
    }
}

fn begin_light_snapshots(
    mut manager: ResMut<LightSnapshotManager>,
    found: Query<Entity, With<StageLight>>,
    mut fixtures: Query<&mut SpotLight, With<StageLight>>,
) {
    let discovered: Vec<Entity> = found.iter().collect();
    manager.begin_play(discovered, &mut fixtures);
}

fn light_registration_system(
    mut manager: ResMut<LightSnapshotManager>,
    mut registration_events: EventReader<StageLightRegistrationEvent>,
    mut fixtures: Query<&mut SpotLight, With<StageLight>>,
) {
    for event in registration_events.read() {
        match *event {
            StageLightRegistrationEvent::Register(light) => manager.register_light(light, &mut fixtures),
            StageLightRegistrationEvent::Unregister(light) => manager.unregister_light(light),
        }
    }
}

fn light_request_system(
    mut manager: ResMut<LightSnapshotManager>,
    mut requests: EventReader<StageRequestEvent>,
    mut fixtures: Query<&mut SpotLight, With<StageLight>>,
) {
    for request in requests.read() {
        match *request {
            StageRequestEvent::LightColor { color, blend_seconds } => {
                manager.apply_light_color(color, blend_seconds, &mut fixtures);
            }
            StageRequestEvent::Snapshot { snapshot, blend_seconds } => {
                manager.apply_light_snapshot(snapshot, blend_seconds.unwrap_or(-1.0), &mut fixtures);
            }
        }
    }
}

fn light_blend_tick_system(
    time: Res<Time>,
    mut manager: ResMut<LightSnapshotManager>,
    mut fixtures: Query<&mut SpotLight, With<StageLight>>,
) {
    if !manager.is_blending() {
        return;
    }
    manager.tick(time.delta_seconds(), &mut fixtures);
}
