use bevy::prelude::*;
use std::time::Duration;

#[derive(Component, Debug, Default, Deref, DerefMut, Reflect)]
pub struct Velocity(pub Vec3);

#[derive(Component, Debug, Reflect)]
pub struct Health(pub f32);

impl Health {
    pub fn is_alive(&self) -> bool { self.0 > 0.0 }

    /// Subtracts `amount` while alive. Returns `true` only for the hit that kills.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.0 -= amount;
        !self.is_alive()
    }
}

/// A one-shot cooldown that starts out ready.
#[derive(Debug, Clone, Reflect)]
pub struct Cooldown {
    timer: Timer,
}

impl Cooldown {
    pub fn from_seconds(seconds: f32) -> Self {
        let mut timer = Timer::from_seconds(seconds, TimerMode::Once);
        let duration = timer.duration();
        timer.tick(duration);
        Self { timer }
    }

    pub fn is_ready(&self) -> bool { self.timer.finished() }

    pub fn trigger(&mut self) { self.timer.reset(); }

    /// Returns `true` on the tick the cooldown runs out.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.timer.finished() {
            return false;
        }
        self.timer.tick(delta).just_finished()
    }
}
