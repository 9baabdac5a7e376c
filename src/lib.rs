pub mod blend;
pub mod camera_systems;
pub mod components;
pub mod light_snapshot;
pub mod player;
pub mod post_process;
pub mod snapshot;
