//! Per-band exponential smoothing (one-pole low-pass).

use super::BandIntensities;
use crate::profile::Profile;

/// `prev * factor + incoming * (1 - factor)`; `factor = 0` passes input through
pub fn smooth(prev: f32, incoming: f32, factor: f32) -> f32 {
    prev * factor + incoming * (1.0 - factor)
}

/// Frames for a step response to reach half its target.
///
/// `factor` weights the previous value, so after `n` frames of a unit step the
/// state is `1 - factor^n`; it crosses one half at `n = -1 / log2(factor)`.
/// Using `1 - factor` here instead would undershoot for any factor above 0.5.
pub fn half_life_frames(factor: f32) -> f32 {
    if factor <= 0.0 {
        return 0.0;
    }
    -1.0 / factor.log2()
}

/// Smoothed band state, initial value zero
#[derive(Debug, Clone)]
pub struct FeatureSmoother {
    state: BandIntensities,
    low_factor: f32,
    mid_factor: f32,
    high_factor: f32,
}

impl FeatureSmoother {
    pub fn new(profile: &Profile) -> Self {
        Self::with_factors(
            profile.low_band.smoothing,
            profile.mid_band.smoothing,
            profile.high_band.smoothing,
        )
    }

    pub fn with_factors(low: f32, mid: f32, high: f32) -> Self {
        Self {
            state: BandIntensities::ZERO,
            low_factor: low,
            mid_factor: mid,
            high_factor: high,
        }
    }

    /// Fold one frame of intensities into the state and return it
    pub fn update(&mut self, incoming: &BandIntensities) -> BandIntensities {
        self.state = BandIntensities {
            low: smooth(self.state.low, incoming.low, self.low_factor),
            mid: smooth(self.state.mid, incoming.mid, self.mid_factor),
            high: smooth(self.state.high, incoming.high, self.high_factor),
        };
        self.state
    }

    pub fn state(&self) -> BandIntensities {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = BandIntensities::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn low_only(low: f32) -> BandIntensities {
        BandIntensities {
            low,
            ..BandIntensities::ZERO
        }
    }

    #[test]
    fn test_zero_factor_disables_smoothing() {
        let mut smoother = FeatureSmoother::with_factors(0.0, 0.0, 0.0);
        let input = BandIntensities {
            low: 0.4,
            mid: 0.7,
            high: 1.0,
        };
        assert_eq!(smoother.update(&input), input);
    }

    #[test]
    fn test_impulse_decays_geometrically() {
        // Pulse of 1.0 on the first frame, silence after, factor 0.7
        let mut smoother = FeatureSmoother::with_factors(0.7, 0.7, 0.7);

        let s1 = smoother.update(&low_only(1.0)).low;
        let s2 = smoother.update(&low_only(0.0)).low;
        let s3 = smoother.update(&low_only(0.0)).low;

        assert!((s1 - 0.3).abs() < 1e-6);
        assert!((s2 - 0.21).abs() < 1e-6);
        assert!((s3 - 0.147).abs() < 1e-6);

        for _ in 0..56 {
            let prev = smoother.state().low;
            let next = smoother.update(&low_only(0.0)).low;
            assert!((next - prev * 0.7).abs() < 1e-7);
        }
    }

    #[test]
    fn test_half_life_reaches_half_of_step() {
        for factor in [0.3f32, 0.5, 0.7, 0.9, 0.95] {
            let n = (half_life_frames(factor).ceil() as usize).max(1);
            let mut smoother = FeatureSmoother::with_factors(factor, factor, factor);

            let mut value = 0.0;
            for _ in 0..n {
                value = smoother.update(&low_only(1.0)).low;
            }
            assert!(value >= 0.5 - 1e-6, "factor {factor}: {value} after {n} frames");
        }
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut smoother = FeatureSmoother::with_factors(0.5, 0.5, 0.5);
        smoother.update(&low_only(1.0));
        smoother.reset();
        assert_eq!(smoother.state(), BandIntensities::ZERO);
    }

    proptest! {
        #[test]
        fn prop_converges_monotonically_without_overshoot(
            factor in 0.0f32..0.99,
            start in 0.0f32..=1.0,
            target in 0.0f32..=1.0,
        ) {
            let mut prev = start;
            for _ in 0..200 {
                let next = smooth(prev, target, factor);
                let before = (target - prev).abs();
                let after = (target - next).abs();

                prop_assert!(after <= before + 1e-6);
                // never crosses the target
                prop_assert!((next - target) * (prev - target) >= -1e-9);
                prev = next;
            }
        }
    }
}
