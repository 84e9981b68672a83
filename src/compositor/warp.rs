//! Fixed catalog of coordinate perturbations, phase-driven by the
//! distortion clock.
//!
//! Coordinates are aspect-corrected and centered: y spans [-0.5, 0.5].
//! Phase is measured in cycles (one unit of distortion clock = one turn).

use std::f32::consts::TAU;

use glam::{Mat2, Vec2};
use noise::{NoiseFn, Perlin};

use crate::params::ParamsError;

/// Fixed seed so exports are reproducible
const TURBULENCE_SEED: u32 = 7;

/// Warp variant selected per job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DistortionType {
    #[default]
    None,
    Wave,
    Ripple,
    Swirl,
    Glitch,
    Turbulence,
}

impl DistortionType {
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Wave,
        Self::Ripple,
        Self::Swirl,
        Self::Glitch,
        Self::Turbulence,
    ];

    /// Job-facing index
    pub fn index(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Wave => 1,
            Self::Ripple => 2,
            Self::Swirl => 3,
            Self::Glitch => 4,
            Self::Turbulence => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Wave => "wave",
            Self::Ripple => "ripple",
            Self::Swirl => "swirl",
            Self::Glitch => "glitch",
            Self::Turbulence => "turbulence",
        }
    }
}

impl TryFrom<u8> for DistortionType {
    type Error = ParamsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ParamsError::UnknownDistortion(value))
    }
}

/// Coordinate warp for one distortion type
#[derive(Debug, Clone)]
pub struct Warp {
    kind: DistortionType,
    perlin: Perlin,
}

impl Warp {
    pub fn new(kind: DistortionType) -> Self {
        Self {
            kind,
            perlin: Perlin::new(TURBULENCE_SEED),
        }
    }

    pub fn kind(&self) -> DistortionType {
        self.kind
    }

    /// Displace a point. `amplitude` is a fraction of the frame height.
    pub fn apply(&self, p: Vec2, phase: f64, amplitude: f32) -> Vec2 {
        if amplitude == 0.0 {
            return p;
        }

        // Keep the phase small before narrowing to f32
        let turn = (phase.rem_euclid(1.0) as f32) * TAU;

        match self.kind {
            DistortionType::None => p,
            DistortionType::Wave => {
                let dx = (p.y * 12.0 + turn).sin();
                let dy = (p.x * 9.0 - turn).sin() * 0.5;
                p + Vec2::new(dx, dy) * amplitude
            }
            DistortionType::Ripple => {
                let r = p.length();
                if r < 1e-6 {
                    return p;
                }
                p + p / r * (r * 28.0 - turn).sin() * amplitude
            }
            DistortionType::Swirl => {
                let r = p.length();
                let falloff = (1.0 - r / 0.75).max(0.0);
                let angle = amplitude * 10.0 * falloff * falloff * turn.sin();
                Mat2::from_angle(angle) * p
            }
            DistortionType::Glitch => {
                // Horizontal slices jump sideways; the pattern reshuffles 8x per cycle
                let slice = (p.y * 24.0).floor() as i64;
                let step = (phase * 8.0).floor() as i64;
                let jitter = hash_unit(slice, step);
                if jitter.abs() > 0.5 {
                    p + Vec2::new(jitter * amplitude * 2.0, 0.0)
                } else {
                    p
                }
            }
            DistortionType::Turbulence => {
                // Phase moves through the third noise dimension, no wrap
                let z = phase * 0.5;
                let x = p.x as f64 * 3.0;
                let y = p.y as f64 * 3.0;
                let dx = self.perlin.get([x, y, z]) as f32;
                let dy = self.perlin.get([x + 17.3, y - 5.1, z]) as f32;
                p + Vec2::new(dx, dy) * amplitude * 1.5
            }
        }
    }
}

/// Deterministic value in [-1, 1] for an integer pair
fn hash_unit(a: i64, b: i64) -> f32 {
    let mut h = (a as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (b as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    (h >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip_and_unknown_type() {
        for kind in DistortionType::ALL {
            assert_eq!(DistortionType::try_from(kind.index()).unwrap(), kind);
        }
        assert!(matches!(
            DistortionType::try_from(6),
            Err(ParamsError::UnknownDistortion(6))
        ));
        assert_eq!(DistortionType::default(), DistortionType::None);
    }

    #[test]
    fn test_zero_amplitude_is_identity() {
        let p = Vec2::new(0.2, -0.1);
        for kind in DistortionType::ALL {
            assert_eq!(Warp::new(kind).apply(p, 3.7, 0.0), p);
        }
    }

    #[test]
    fn test_displacement_is_bounded_by_amplitude() {
        let amplitude = 0.05;
        for kind in DistortionType::ALL {
            let warp = Warp::new(kind);
            for i in 0..50 {
                let p = Vec2::new(i as f32 / 50.0 - 0.5, 0.3 - i as f32 / 80.0);
                let q = warp.apply(p, i as f64 * 0.13, amplitude);
                assert!(q.is_finite(), "{:?}", kind);
                // Swirl rotates rather than translates; everything else stays close
                if kind != DistortionType::Swirl {
                    assert!((q - p).length() <= amplitude * 2.5, "{:?}", kind);
                }
            }
        }
    }

    #[test]
    fn test_warps_animate_with_phase() {
        let p = Vec2::new(0.1, 0.2);
        for kind in [DistortionType::Wave, DistortionType::Ripple, DistortionType::Turbulence] {
            let warp = Warp::new(kind);
            assert_ne!(warp.apply(p, 0.0, 0.05), warp.apply(p, 0.3, 0.05), "{:?}", kind);
        }
    }

    #[test]
    fn test_hash_unit_range() {
        for a in -20..20 {
            for b in 0..20 {
                let h = hash_unit(a, b);
                assert!((-1.0..=1.0).contains(&h));
            }
        }
    }
}
