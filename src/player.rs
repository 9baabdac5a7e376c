use bevy::prelude::*;
use rand::Rng;
use crate::{
    camera_systems::MainCamera,
    components::{Cooldown, Health, Velocity},
};

pub const INITIAL_PLAYER_HEALTH: f32 = 1.0;
pub const INTERACTION_COOLDOWN_SECS: f32 = 1.0;
pub const ATTACK_COOLDOWN_SECS: f32 = 2.25;
pub const ATTACK_REACH: f32 = 2.0;
pub const ARMED_MELEE_DAMAGE: f32 = 50.0;
pub const UNARMED_MELEE_DAMAGE: f32 = 10.0;
const GRAVITY: f32 = 9.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ItemType {
    Headphones,
    Axe,
}

/// Something the player can use when standing within `radius` of it.
#[derive(Component, Debug, Clone, Reflect)]
pub struct Interactable {
    pub item_type: ItemType,
    pub radius: f32,
}

#[derive(Component, Debug, Clone, Reflect)]
pub struct Enemy {
    pub hit_radius: f32,
}

/// Marker for the weapon mesh carried by the player.
#[derive(Component)]
pub struct PlayerWeapon;

/// Material swapped onto the weapon once it has drawn blood.
#[derive(Resource)]
pub struct BloodyWeaponMaterial(pub Handle<StandardMaterial>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum AttackSwing { Overhead, Sideways }

#[derive(Event, Debug, Clone, Copy)] pub struct InteractedEvent { pub interactable: Entity, pub item_type: ItemType }
#[derive(Event, Debug, Clone, Copy)] pub struct WeaponPickedUpEvent;
#[derive(Event, Debug, Clone, Copy)] pub struct BlinkEvent;
#[derive(Event, Debug, Clone, Copy)] pub struct AttackEvent { pub swing: AttackSwing }
#[derive(Event, Debug, Clone, Copy)] pub struct EnemyDamagedEvent { pub enemy: Entity, pub damage: f32 }
#[derive(Event, Debug, Clone, Copy)] pub struct EnemyDefeatedEvent(pub Entity);
#[derive(Event, Debug, Clone, Copy)] pub struct DamagePlayerEvent(pub f32);
#[derive(Event, Debug, Clone, Copy)] pub struct PlayerDiedEvent;

#[derive(Debug, Clone, Copy, Reflect)]
pub struct MovementSettings {
    pub max_walk_speed: f32,
    pub max_walk_speed_crouched: f32,
    pub max_acceleration: f32,
    pub braking_deceleration_walking: f32,
    pub braking_friction_factor: f32,
    pub ground_friction: f32,
    pub jump_z_velocity: f32,
    pub air_control: f32,
    pub gravity_scale: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            max_walk_speed: 3.0,
            max_walk_speed_crouched: 2.0,
            max_acceleration: 7.68,
            braking_deceleration_walking: 2.56,
            braking_friction_factor: 1.2,
            ground_friction: 7.5,
            jump_z_velocity: 4.5,
            air_control: 0.4,
            gravity_scale: 1.0,
        }
    }
}

#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct PlayerSettings {
    pub movement: MovementSettings,
    /// Radians per pixel of mouse motion.
    pub mouse_sensitivity: f32,
    pub camera_rotation_lag_speed: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self { movement: MovementSettings::default(), mouse_sensitivity: 0.002, camera_rotation_lag_speed: 20.0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementInput {
    /// Horizontal world-space direction, unit length or zero.
    pub wish_dir: Vec3,
    pub jump: bool,
    pub crouch: bool,
}

/// One step of walking/falling on a flat ground plane at `y = 0`.
/// Returns the new position and velocity.
pub fn integrate_movement(
    position: Vec3,
    velocity: Vec3,
    input: &MovementInput,
    settings: &MovementSettings,
    delta_secs: f32,
) -> (Vec3, Vec3) {
    let grounded = position.y <= 0.0 && velocity.y <= 0.0;
    let max_speed = if input.crouch { settings.max_walk_speed_crouched } else { settings.max_walk_speed };
    let mut horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
    let mut vertical = velocity.y;

    if input.wish_dir != Vec3::ZERO {
        let control = if grounded { 1.0 } else { settings.air_control };
        if grounded {
            // Friction bends existing velocity toward the wished direction.
            let turn = (delta_secs * settings.ground_friction).min(1.0);
            horizontal = horizontal.lerp(input.wish_dir * horizontal.length(), turn);
        }
        horizontal += input.wish_dir * settings.max_acceleration * control * delta_secs;
        horizontal = horizontal.clamp_length_max(max_speed);
    } else if grounded {
        let speed = horizontal.length();
        let friction = settings.ground_friction * settings.braking_friction_factor;
        let deceleration = friction * speed + settings.braking_deceleration_walking;
        let new_speed = (speed - deceleration * delta_secs).max(0.0);
        horizontal = horizontal.normalize_or_zero() * new_speed;
    }

    if grounded {
        vertical = if input.jump { settings.jump_z_velocity } else { 0.0 };
    } else {
        vertical -= GRAVITY * settings.gravity_scale * delta_secs;
    }

    let velocity = Vec3::new(horizontal.x, vertical, horizontal.z);
    let mut position = position + velocity * delta_secs;
    let mut velocity = velocity;
    if position.y < 0.0 {
        position.y = 0.0;
        velocity.y = 0.0;
    }
    (position, velocity)
}

/// Closest hit along a ray against enemy hit spheres `(entity, center, radius)`,
/// within `reach`. Returns the entity and the hit distance.
pub fn melee_trace(
    origin: Vec3,
    direction: Vec3,
    reach: f32,
    targets: impl IntoIterator<Item = (Entity, Vec3, f32)>,
) -> Option<(Entity, f32)> {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }

    let mut closest: Option<(Entity, f32)> = None;
    for (entity, center, radius) in targets {
        let offset = origin - center;
        let b = offset.dot(direction);
        let c = offset.length_squared() - radius * radius;
        if c > 0.0 && b > 0.0 {
            continue;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            continue;
        }
        let distance = (-b - discriminant.sqrt()).max(0.0);
        if distance > reach {
            continue;
        }
        if closest.map_or(true, |(_, best)| distance < best) {
            closest = Some((entity, distance));
        }
    }
    closest
}

/// Nearest interactable whose radius contains `position`.
pub fn nearest_interactable(
    position: Vec3,
    candidates: impl IntoIterator<Item = (Entity, Vec3, f32)>,
) -> Option<Entity> {
    candidates
        .into_iter()
        .map(|(entity, location, radius)| (entity, location.distance(position), radius))
        .filter(|(_, distance, radius)| distance <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _, _)| entity)
}

pub fn melee_damage(holding_weapon: bool) -> f32 {
    if holding_weapon { ARMED_MELEE_DAMAGE } else { UNARMED_MELEE_DAMAGE }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackAttempt {
    Unarmed,
    OnCooldown,
    Swing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionOutcome {
    pub interactable: Entity,
    pub item_type: ItemType,
    pub picked_up_weapon: bool,
}

#[derive(Component, Debug, Reflect)]
pub struct PlayerCharacter {
    pub yaw: f32,
    pub pitch: f32,
    pub crouched: bool,
    pub holding_weapon: bool,
    pub weapon_bloodied: bool,
    pub current_interactable: Option<Entity>,
    pub interaction_cooldown: Cooldown,
    pub attack_cooldown: Cooldown,
}

impl Default for PlayerCharacter {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            crouched: false,
            holding_weapon: false,
            weapon_bloodied: false,
            current_interactable: None,
            interaction_cooldown: Cooldown::from_seconds(INTERACTION_COOLDOWN_SECS),
            attack_cooldown: Cooldown::from_seconds(ATTACK_COOLDOWN_SECS),
        }
    }
}

impl PlayerCharacter {
    /// Uses the current interactable if the interaction cooldown allows it.
    pub fn try_interact(&mut self, item_type_of: impl FnOnce(Entity) -> Option<ItemType>) -> Option<InteractionOutcome> {
        if !self.interaction_cooldown.is_ready() {
            return None;
        }
        let interactable = self.current_interactable?;
        let item_type = item_type_of(interactable)?;

        let picked_up_weapon = match item_type {
            ItemType::Headphones => false,
            ItemType::Axe => {
                self.holding_weapon = true;
                true
            }
        };
        self.interaction_cooldown.trigger();
        Some(InteractionOutcome { interactable, item_type, picked_up_weapon })
    }

    pub fn try_attack(&mut self) -> AttackAttempt {
        if !self.holding_weapon {
            return AttackAttempt::Unarmed;
        }
        if !self.attack_cooldown.is_ready() {
            return AttackAttempt::OnCooldown;
        }
        self.attack_cooldown.trigger();
        AttackAttempt::Swing
    }

    pub fn tick_cooldowns(&mut self, delta: std::time::Duration) {
        self.interaction_cooldown.tick(delta);
        if self.attack_cooldown.tick(delta) {
            self.weapon_bloodied = true;
        }
    }
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PlayerCharacter>()
            .register_type::<PlayerSettings>()
            .register_type::<Interactable>()
            .register_type::<Enemy>()
            .init_resource::<PlayerSettings>()
            .add_event::<InteractedEvent>()
            .add_event::<WeaponPickedUpEvent>()
            .add_event::<BlinkEvent>()
            .add_event::<AttackEvent>()
            .add_event::<EnemyDamagedEvent>()
            .add_event::<EnemyDefeatedEvent>()
            .add_event::<DamagePlayerEvent>()
            .add_event::<PlayerDiedEvent>()
            .add_systems(Update, (
                player_movement_system,
                interactable_focus_system,
                player_interact_system,
                player_attack_system,
                enemy_damage_system,
                player_cooldown_system,
                weapon_presentation_system,
                player_damage_system,
            ).chain());
    }
}

fn player_movement_system(
    time: Res<Time>,
    keyboard_input: Res<ButtonInput<KeyCode>>,
    settings: Res<PlayerSettings>,
    mut query: Query<(&mut PlayerCharacter, &mut Transform, &mut Velocity)>,
) {
    for (mut player, mut transform, mut velocity) in query.iter_mut() {
        let mut local = Vec3::ZERO;
        if keyboard_input.pressed(KeyCode::KeyW) { local.z -= 1.0; }
        if keyboard_input.pressed(KeyCode::KeyS) { local.z += 1.0; }
        if keyboard_input.pressed(KeyCode::KeyA) { local.x -= 1.0; }
        if keyboard_input.pressed(KeyCode::KeyD) { local.x += 1.0; }

        player.crouched = keyboard_input.pressed(KeyCode::ControlLeft);
        let input = MovementInput {
            wish_dir: (Quat::from_rotation_y(player.yaw) * local).normalize_or_zero(),
            jump: keyboard_input.just_pressed(KeyCode::Space),
            crouch: player.crouched,
        };
        let (position, new_velocity) =
            integrate_movement(transform.translation, velocity.0, &input, &settings.movement, time.delta_seconds());
        transform.translation = position;
        velocity.0 = new_velocity;
    }
}

fn interactable_focus_system(
    mut player_query: Query<(&mut PlayerCharacter, &Transform)>,
    interactables: Query<(Entity, &GlobalTransform, &Interactable)>,
) {
    for (mut player, transform) in player_query.iter_mut() {
        let focus = nearest_interactable(
            transform.translation,
            interactables.iter().map(|(entity, global, item)| (entity, global.translation(), item.radius)),
        );
        if player.current_interactable != focus {
            player.current_interactable = focus;
        }
    }
}

fn player_interact_system(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut player_query: Query<&mut PlayerCharacter>,
    interactables: Query<&Interactable>,
    mut interacted_writer: EventWriter<InteractedEvent>,
    mut weapon_writer: EventWriter<WeaponPickedUpEvent>,
    mut blink_writer: EventWriter<BlinkEvent>,
) {
    if !keyboard_input.just_pressed(KeyCode::KeyE) {
        return;
    }
    for mut player in player_query.iter_mut() {
        let Some(interaction) = player.try_interact(|entity| interactables.get(entity).ok().map(|item| item.item_type)) else {
            continue;
        };
        if interaction.picked_up_weapon {
            weapon_writer.send(WeaponPickedUpEvent);
        }
        interacted_writer.send(InteractedEvent { interactable: interaction.interactable, item_type: interaction.item_type });
        blink_writer.send(BlinkEvent);
    }
}

fn player_attack_system(
    mouse_button_input: Res<ButtonInput<MouseButton>>,
    mut player_query: Query<&mut PlayerCharacter>,
    camera_query: Query<&GlobalTransform, With<MainCamera>>,
    enemies: Query<(Entity, &GlobalTransform, &Enemy)>,
    mut attack_writer: EventWriter<AttackEvent>,
    mut damage_writer: EventWriter<EnemyDamagedEvent>,
) {
    if !mouse_button_input.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok(mut player) = player_query.get_single_mut() else { return; };

    match player.try_attack() {
        AttackAttempt::Unarmed => return,
        AttackAttempt::OnCooldown => {
            warn!("Attack blocked due to cooldown.");
            return;
        }
        AttackAttempt::Swing => {}
    }

    let swing = if rand::thread_rng().gen_bool(0.5) { AttackSwing::Overhead } else { AttackSwing::Sideways };
    attack_writer.send(AttackEvent { swing });

    let Ok(camera) = camera_query.get_single() else { return; };
    let (_, rotation, origin) = camera.to_scale_rotation_translation();
    let hit = melee_trace(
        origin,
        rotation * Vec3::NEG_Z,
        ATTACK_REACH,
        enemies.iter().map(|(entity, global, enemy)| (entity, global.translation(), enemy.hit_radius)),
    );
    if let Some((enemy, distance)) = hit {
        debug!("Melee hit {:?} at {:.2}m", enemy, distance);
        damage_writer.send(EnemyDamagedEvent { enemy, damage: melee_damage(player.holding_weapon) });
    }
}

fn enemy_damage_system(
    mut commands: Commands,
    mut damage_events: EventReader<EnemyDamagedEvent>,
    mut enemies: Query<&mut Health, With<Enemy>>,
    mut defeated_writer: EventWriter<EnemyDefeatedEvent>,
) {
    for event in damage_events.read() {
        let Ok(mut health) = enemies.get_mut(event.enemy) else { continue; };
        if health.apply_damage(event.damage) {
            defeated_writer.send(EnemyDefeatedEvent(event.enemy));
            commands.entity(event.enemy).despawn_recursive();
        }
    }
}

fn player_cooldown_system(time: Res<Time>, mut query: Query<&mut PlayerCharacter>) {
    for mut player in query.iter_mut() {
        player.tick_cooldowns(time.delta());
    }
}

fn weapon_presentation_system(
    player_query: Query<&PlayerCharacter, Changed<PlayerCharacter>>,
    bloody_material: Option<Res<BloodyWeaponMaterial>>,
    mut weapons: Query<(&mut Visibility, Option<&mut Handle<StandardMaterial>>), With<PlayerWeapon>>,
) {
    let Ok(player) = player_query.get_single() else { return; };
    for (mut visibility, material) in weapons.iter_mut() {
        let wanted = if player.holding_weapon { Visibility::Visible } else { Visibility::Hidden };
        if *visibility != wanted {
            *visibility = wanted;
        }
        if let (true, Some(mut material), Some(bloody)) = (player.weapon_bloodied, material, bloody_material.as_ref()) {
            if *material != bloody.0 {
                *material = bloody.0.clone();
            }
        }
    }
}

fn player_damage_system(
    mut damage_events: EventReader<DamagePlayerEvent>,
    mut player_query: Query<&mut Health, With<PlayerCharacter>>,
    mut died_writer: EventWriter<PlayerDiedEvent>,
) {
    let Ok(mut health) = player_query.get_single_mut() else { return; };
    for DamagePlayerEvent(amount) in damage_events.read() {
        if health.apply_damage(*amount) {
            info!("Player died");
            died_writer.send(PlayerDiedEvent);
        }
    }
}
