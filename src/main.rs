use bevy::{
    core_pipeline::bloom::BloomSettings,
    prelude::*,
    window::{CursorGrabMode, PrimaryWindow},
};
use stage_snapshots::{
    camera_systems::{CameraSystemsPlugin, MainCamera, HEAD_HEIGHT},
    components::{Health, Velocity},
    light_snapshot::{LightSnapshotPlugin, StageLight},
    player::{BloodyWeaponMaterial, Enemy, Interactable, ItemType, PlayerCharacter, PlayerPlugin, PlayerWeapon, INITIAL_PLAYER_HEALTH},
    post_process::{PostProcessSnapshotPlugin, PostProcessVolume},
    snapshot::{AudioSnapshot, StageRequestEvent},
};

const MOOD_BLEND_SECONDS: f32 = 2.0;
const STAGE_LIGHT_POSITIONS: [Vec3; 4] = [
    Vec3::new(-6.0, 5.0, -6.0),
    Vec3::new(6.0, 5.0, -6.0),
    Vec3::new(-6.0, 5.0, 6.0),
    Vec3::new(6.0, 5.0, 6.0),
];

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Stage Snapshots".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            LightSnapshotPlugin,
            PostProcessSnapshotPlugin,
            PlayerPlugin,
            CameraSystemsPlugin,
        ))
        .insert_resource(AmbientLight { color: Color::WHITE, brightness: 20.0 })
        .add_systems(Startup, (setup_scene, grab_cursor))
        .add_systems(Update, cycle_mood_system)
        .run();
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cuboid::new(24.0, 0.1, 24.0)),
            material: materials.add(StandardMaterial { base_color: Color::rgb(0.2, 0.2, 0.22), ..default() }),
            transform: Transform::from_xyz(0.0, -0.05, 0.0),
            ..default()
        },
        Name::new("Stage Floor"),
    ));

    for (i, position) in STAGE_LIGHT_POSITIONS.iter().enumerate() {
        commands.spawn((
            SpotLightBundle {
                spot_light: SpotLight {
                    intensity: 400_000.0,
                    range: 30.0,
                    outer_angle: 0.6,
                    inner_angle: 0.4,
                    shadows_enabled: true,
                    ..default()
                },
                transform: Transform::from_translation(*position).looking_at(Vec3::ZERO, Vec3::Y),
                ..default()
            },
            StageLight,
            Name::new(format!("Stage Light {}", i)),
        ));
    }

    commands.spawn((PostProcessVolume { unbound: true, ..default() }, Name::new("Global Post Process")));

    let weapon_material = materials.add(StandardMaterial { base_color: Color::rgb(0.55, 0.55, 0.6), ..default() });
    commands.insert_resource(BloodyWeaponMaterial(
        materials.add(StandardMaterial { base_color: Color::rgb(0.45, 0.05, 0.05), ..default() }),
    ));

    commands.spawn((
        Camera3dBundle {
            camera: Camera { hdr: true, ..default() },
            transform: Transform::from_xyz(0.0, HEAD_HEIGHT, 8.0),
            ..default()
        },
        BloomSettings::default(),
        MainCamera,
        Name::new("First Person Camera"),
    )).with_children(|camera| {
        camera.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(0.06, 0.06, 0.7)),
                material: weapon_material,
                transform: Transform::from_xyz(0.3, -0.3, -0.6),
                visibility: Visibility::Hidden,
                ..default()
            },
            PlayerWeapon,
            Name::new("Axe (Held)"),
        ));
    });

    commands.spawn((
        TransformBundle::from_transform(Transform::from_xyz(0.0, 0.0, 8.0)),
        PlayerCharacter::default(),
        Health(INITIAL_PLAYER_HEALTH),
        Velocity::default(),
        Name::new("Player"),
    ));

    let pickups = [
        (ItemType::Axe, Vec3::new(2.0, 0.5, 4.0), Color::rgb(0.6, 0.4, 0.2)),
        (ItemType::Headphones, Vec3::new(-2.0, 0.5, 4.0), Color::rgb(0.1, 0.1, 0.1)),
    ];
    for (item_type, position, color) in pickups {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(0.4, 0.4, 0.4)),
                material: materials.add(StandardMaterial { base_color: color, ..default() }),
                transform: Transform::from_translation(position),
                ..default()
            },
            Interactable { item_type, radius: 1.5 },
            Name::new(format!("{:?}", item_type)),
        ));
    }

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Sphere::new(0.5)),
            material: materials.add(StandardMaterial { base_color: Color::rgb(0.3, 0.5, 0.3), ..default() }),
            transform: Transform::from_xyz(0.0, 1.0, 0.0),
            ..default()
        },
        Enemy { hit_radius: 0.5 },
        Health(100.0),
        Name::new("Enemy"),
    ));
}

fn grab_cursor(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    let Ok(mut window) = window_query.get_single_mut() else { return; };
    window.cursor.grab_mode = CursorGrabMode::Locked;
    window.cursor.visible = false;
}

fn cycle_mood_system(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut mood: Local<Option<AudioSnapshot>>,
    mut request_writer: EventWriter<StageRequestEvent>,
) {
    if !keyboard_input.just_pressed(KeyCode::KeyN) {
        return;
    }
    let next = mood.map_or(AudioSnapshot::Celestial, AudioSnapshot::next);
    *mood = Some(next);
    info!("Mood -> {:?}", next);
    request_writer.send(StageRequestEvent::snapshot_over(next, MOOD_BLEND_SECONDS));
}
