//! Pointer-driven noise excitation.
//!
//! Moving the pointer kicks the particles into noisy motion; once the pointer
//! rests, the effect fades out linearly. The value is shared by the position
//! pass and the particle pass so the motion and the shading agree.

use glam::Vec2;

/// Decaying scalar in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseMix {
    value: f32,
    decay_per_second: f32,
    threshold: f32,
}

impl NoiseMix {
    /// Default decay rate per second.
    pub const DEFAULT_DECAY: f32 = 0.7;
    /// Default L1 pointer movement, in pixels, that re-excites the mix.
    pub const DEFAULT_THRESHOLD: f32 = 1.0;

    /// Start fully excited.
    pub fn new(decay_per_second: f32, threshold: f32) -> Self {
        Self {
            value: 1.0,
            decay_per_second,
            threshold,
        }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advance by one frame.
    ///
    /// Pointer movement above the threshold resets the value to 1.0.
    /// Otherwise it drops by `dt * decay` and is floored at 0.0. The decay is
    /// linear in frame time, so a long stalled frame empties it in one go.
    pub fn update(&mut self, pointer_delta: Vec2, dt: f32) -> f32 {
        if pointer_delta.x.abs() + pointer_delta.y.abs() > self.threshold {
            self.value = 1.0;
        } else {
            self.value = (self.value - dt * self.decay_per_second).max(0.0);
        }
        self.value
    }
}

impl Default for NoiseMix {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DECAY, Self::DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_excited() {
        assert_eq!(NoiseMix::default().value(), 1.0);
    }

    #[test]
    fn test_reaches_zero_after_one_over_rate() {
        let mut mix = NoiseMix::default();
        let dt = 1.0 / 600.0;
        let mut elapsed = 0.0f32;
        while mix.value() > 0.0 {
            mix.update(Vec2::ZERO, dt);
            elapsed += dt;
            assert!(mix.value() >= 0.0);
            assert!(elapsed < 2.0, "decay never finished");
        }
        assert!((elapsed - 1.0 / 0.7).abs() < 0.01, "took {elapsed}s");
    }

    #[test]
    fn test_decay_is_monotonic() {
        let mut mix = NoiseMix::default();
        let mut last = mix.value();
        for _ in 0..200 {
            let v = mix.update(Vec2::new(0.3, 0.3), 0.016);
            assert!(v <= last);
            last = v;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_large_dt_floors_at_zero() {
        let mut mix = NoiseMix::default();
        assert_eq!(mix.update(Vec2::ZERO, 10.0), 0.0);
    }

    #[test]
    fn test_movement_resets() {
        let mut mix = NoiseMix::default();
        mix.update(Vec2::ZERO, 1.0);
        assert!(mix.value() < 0.5);
        assert_eq!(mix.update(Vec2::new(0.8, -0.4), 0.016), 1.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut mix = NoiseMix::default();
        mix.update(Vec2::ZERO, 1.0);
        let before = mix.value();
        mix.update(Vec2::new(0.5, 0.5), 0.0);
        assert_eq!(mix.value(), before);
    }
}
