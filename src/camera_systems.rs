use bevy::{input::mouse::MouseMotion, prelude::*};
use crate::player::{PlayerCharacter, PlayerSettings};

pub const HEAD_HEIGHT: f32 = 1.6;
const CROUCHED_HEAD_HEIGHT: f32 = 1.1;
const PITCH_LIMIT: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

#[derive(Component)]
pub struct MainCamera; // Marker component for the first-person camera

pub struct CameraSystemsPlugin;

impl Plugin for CameraSystemsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (player_look_system, first_person_camera_system).chain());
    }
}

pub fn look_rotation(yaw: f32, pitch: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0)
}

/// Moves `current` toward `target` the way a lagging camera arm does: faster
/// lag speeds close more of the gap each frame.
pub fn lagged_rotation(current: Quat, target: Quat, lag_speed: f32, delta_secs: f32) -> Quat {
    if lag_speed <= 0.0 {
        return target;
    }
    current.slerp(target, (lag_speed * delta_secs).min(1.0))
}

fn player_look_system(
    mut motion_events: EventReader<MouseMotion>,
    settings: Res<PlayerSettings>,
    mut player_query: Query<(&mut PlayerCharacter, &mut Transform)>,
) {
    let delta: Vec2 = motion_events.read().map(|motion| motion.delta).sum();
    let Ok((mut player, mut transform)) = player_query.get_single_mut() else { return; };
    if delta == Vec2::ZERO {
        return;
    }

    player.yaw -= delta.x * settings.mouse_sensitivity;
    player.pitch = (player.pitch - delta.y * settings.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    transform.rotation = Quat::from_rotation_y(player.yaw);
}

fn first_person_camera_system(
    time: Res<Time>,
    settings: Res<PlayerSettings>,
    player_query: Query<(&PlayerCharacter, &Transform), Without<MainCamera>>,
    mut camera_query: Query<&mut Transform, (With<MainCamera>, Without<PlayerCharacter>)>,
) {
    let Ok((player, player_transform)) = player_query.get_single() else { return; };
    let Ok(mut camera_transform) = camera_query.get_single_mut() else { return; };

    let head_height = if player.crouched { CROUCHED_HEAD_HEIGHT } else { HEAD_HEIGHT };
    camera_transform.translation = player_transform.translation + Vec3::Y * head_height;
    camera_transform.rotation = lagged_rotation(
        camera_transform.rotation,
        look_rotation(player.yaw, player.pitch),
        settings.camera_rotation_lag_speed,
        time.delta_seconds(),
    );
}
