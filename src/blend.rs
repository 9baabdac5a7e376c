// src/blend.rs
use bevy::prelude::*;

/// Durations are floored to this before any division.
pub const MIN_BLEND_SECONDS: f32 = 0.01;
/// Blends at or below this length skip interpolation and land on the target at once.
pub const SNAP_THRESHOLD_SECONDS: f32 = 0.015;

/// Interpolation law for a value that can be driven by a [`BlendState`].
pub trait Blend: Clone {
    /// `alpha` is already clamped to `[0, 1]`.
    fn blend(start: &Self, target: &Self, alpha: f32) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f32, // degrees, [0, 360)
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn from_linear_rgb(r: f32, g: f32, b: f32) -> Self {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let range = max - min;

        let hue = if range <= 0.0 {
            0.0
        } else if max == r {
            ((g - b) / range * 60.0 + 360.0) % 360.0
        } else if max == g {
            (b - r) / range * 60.0 + 120.0
        } else {
            (r - g) / range * 60.0 + 240.0
        };
        let saturation = if max == 0.0 { 0.0 } else { range / max };

        Self { hue, saturation, value: max }
    }

    pub fn to_linear_rgb(self) -> [f32; 3] {
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let sector = h.floor();
        let fraction = h - sector;
        let v = self.value;
        let p = v * (1.0 - self.saturation);
        let q = v * (1.0 - fraction * self.saturation);
        let t = v * (1.0 - (1.0 - fraction) * self.saturation);

        match sector as u32 % 6 {
            0 => [v, t, p],
            1 => [q, v, p],
            2 => [p, v, t],
            3 => [p, q, v],
            4 => [t, p, v],
            _ => [v, p, q],
        }
    }
}

/// Interpolates hue along the shorter arc of the color wheel.
pub fn lerp_hue(from: f32, to: f32, alpha: f32) -> f32 {
    let (mut from, mut to) = (from, to);
    if (from - to).abs() > 180.0 {
        if to > from {
            from += 360.0;
        } else {
            to += 360.0;
        }
    }
    (from + (to - from) * alpha).rem_euclid(360.0)
}

/// Light colors travel through HSV in linear space so that distant hues pass
/// through saturated intermediates instead of grey.
impl Blend for Color {
    fn blend(start: &Self, target: &Self, alpha: f32) -> Self {
        let [sr, sg, sb, sa] = start.as_linear_rgba_f32();
        let [tr, tg, tb, ta] = target.as_linear_rgba_f32();
        let from = Hsv::from_linear_rgb(sr, sg, sb);
        let to = Hsv::from_linear_rgb(tr, tg, tb);

        let mixed = Hsv {
            hue: lerp_hue(from.hue, to.hue, alpha),
            saturation: from.saturation + (to.saturation - from.saturation) * alpha,
            value: from.value + (to.value - from.value) * alpha,
        };
        let [r, g, b] = mixed.to_linear_rgb();
        Color::rgba_linear(r, g, b, sa + (ta - sa) * alpha)
    }
}

/// A one-shot timed interpolation from `start` to `target`.
#[derive(Debug, Clone)]
pub struct BlendState<T: Blend> {
    current: T,
    start: T,
    target: T,
    elapsed: f32,
    duration: f32,
    active: bool,
}

impl<T: Blend> BlendState<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial.clone(),
            start: initial.clone(),
            target: initial,
            elapsed: 0.0,
            duration: MIN_BLEND_SECONDS,
            active: false,
        }
    }

    pub fn current(&self) -> &T { &self.current }
    pub fn start(&self) -> &T { &self.start }
    pub fn target(&self) -> &T { &self.target }
    pub fn elapsed(&self) -> f32 { self.elapsed }
    pub fn duration(&self) -> f32 { self.duration }
    pub fn is_active(&self) -> bool { self.active }

    /// Blend progress in `[0, 1]`.
    pub fn alpha(&self) -> f32 {
        (self.elapsed / self.duration.max(f32::EPSILON)).clamp(0.0, 1.0)
    }

    /// Resets the blend to rest at `value` with nothing in flight.
    pub fn reset_to(&mut self, value: T) {
        *self = Self::new(value);
    }

    /// Starts blending from the current value toward `target`, dropping any
    /// blend in progress. Returns the value to push right away when the
    /// duration is short enough to snap.
    pub fn begin(&mut self, target: T, duration_secs: f32) -> Option<T> {
        self.start = self.current.clone();
        self.target = target;
        self.duration = duration_secs.max(MIN_BLEND_SECONDS);
        self.elapsed = 0.0;
        self.active = true;

        if self.duration <= SNAP_THRESHOLD_SECONDS {
            self.current = self.target.clone();
            self.active = false;
            return Some(self.current.clone());
        }
        None
    }

    /// Advances the blend by `delta_secs` and returns the value to push, or
    /// `None` when nothing is blending.
    pub fn step(&mut self, delta_secs: f32) -> Option<T> {
        if !self.active {
            return None;
        }

        self.elapsed += delta_secs.max(0.0);
        let alpha = self.alpha();

        if alpha >= 1.0 {
            self.current = self.target.clone();
            self.active = false;
        } else {
            self.current = T::blend(&self.start, &self.target, alpha);
        }
        Some(self.current.clone())
    }
}

impl<T: Blend + Default> Default for BlendState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
