// src/snapshot.rs
use bevy::prelude::*;
use bevy::utils::HashMap;

/// Mood states shared with the audio mix. Lighting and post-processing each
/// keep a preset per mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum AudioSnapshot {
    Celestial,
    Terrestrial,
    Conflict,
    Mourning,
    Family,
    ScienceCrime,
    Art,
    Vice,
    Betrayal,
    Politics,
    Reflection,
}

impl AudioSnapshot {
    pub const ALL: [AudioSnapshot; 11] = [
        AudioSnapshot::Celestial,
        AudioSnapshot::Terrestrial,
        AudioSnapshot::Conflict,
        AudioSnapshot::Mourning,
        AudioSnapshot::Family,
        AudioSnapshot::ScienceCrime,
        AudioSnapshot::Art,
        AudioSnapshot::Vice,
        AudioSnapshot::Betrayal,
        AudioSnapshot::Politics,
        AudioSnapshot::Reflection,
    ];

    /// The snapshot after this one, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Preset values keyed by mood.
#[derive(Debug, Clone)]
pub struct SnapshotTable<T> {
    entries: HashMap<AudioSnapshot, T>,
}

impl<T> Default for SnapshotTable<T> {
    fn default() -> Self {
        Self { entries: HashMap::default() }
    }
}

impl<T> SnapshotTable<T> {
    /// Builds a table with an entry for every snapshot.
    pub fn from_fn(mut preset: impl FnMut(AudioSnapshot) -> T) -> Self {
        Self {
            entries: AudioSnapshot::ALL.iter().map(|s| (*s, preset(*s))).collect(),
        }
    }

    pub fn get(&self, snapshot: AudioSnapshot) -> Option<&T> { self.entries.get(&snapshot) }
    pub fn insert(&mut self, snapshot: AudioSnapshot, value: T) -> Option<T> { self.entries.insert(snapshot, value) }
    pub fn remove(&mut self, snapshot: AudioSnapshot) -> Option<T> { self.entries.remove(&snapshot) }
    pub fn contains(&self, snapshot: AudioSnapshot) -> bool { self.entries.contains_key(&snapshot) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Requests for the stage managers, read in send order so the last request
/// of a frame wins.
#[derive(Event, Debug, Clone, Copy)]
pub enum StageRequestEvent {
    /// Mood change for both lighting and post-processing. `None` uses each
    /// manager's default blend time.
    Snapshot { snapshot: AudioSnapshot, blend_seconds: Option<f32> },
    /// Direct light color; post-processing ignores it. Values `<= 0` fall
    /// back to the light manager's default.
    LightColor { color: Color, blend_seconds: f32 },
}

impl StageRequestEvent {
    pub fn snapshot(snapshot: AudioSnapshot) -> Self {
        Self::Snapshot { snapshot, blend_seconds: None }
    }

    pub fn snapshot_over(snapshot: AudioSnapshot, blend_seconds: f32) -> Self {
        Self::Snapshot { snapshot, blend_seconds: Some(blend_seconds) }
    }

    pub fn light_color(color: Color, blend_seconds: f32) -> Self {
        Self::LightColor { color, blend_seconds }
    }
}
