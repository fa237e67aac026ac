//! Time-based interpolation with explicit retargeting.
//!
//! A tween always starts from the value it currently shows, so retargeting
//! mid-flight never snaps. There is no queue: the newest target wins.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Quadratic ease-out (slow end).
    QuadraticOut,
    /// Cubic ease-out.
    CubicOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::CubicOut => {
                let t1 = t - 1.0;
                t1 * t1 * t1 + 1.0
            }
        }
    }
}

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp(from: Self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        from.lerp(to, t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    duration: f32,
    elapsed: f32,
    easing: Easing,
    current: T,
}

impl<T: Lerp> Tween<T> {
    /// A settled tween resting at `value`.
    pub fn new(value: T) -> Self {
        Self {
            from: value,
            to: value,
            duration: 0.0,
            elapsed: 0.0,
            easing: Easing::Linear,
            current: value,
        }
    }

    pub fn value(&self) -> T {
        self.current
    }

    pub fn target(&self) -> T {
        self.to
    }

    pub fn is_active(&self) -> bool {
        self.elapsed < self.duration
    }

    /// Head toward `to` from the current value over `duration` seconds.
    pub fn retarget(&mut self, to: T, duration: f32, easing: Easing) {
        self.from = self.current;
        self.to = to;
        self.elapsed = 0.0;
        self.easing = easing;
        if duration <= 0.0 {
            self.duration = 0.0;
            self.current = to;
        } else {
            self.duration = duration;
        }
    }

    /// Advance by `dt` seconds and return the new value.
    pub fn advance(&mut self, dt: f32) -> T {
        if self.is_active() {
            self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
            let t = self.easing.apply(self.elapsed / self.duration);
            self.current = if self.is_active() {
                T::lerp(self.from, self.to, t)
            } else {
                self.to
            };
        }
        self.current
    }
}
