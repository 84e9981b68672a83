//! Parameter mapping: smoothed audio features and clock ticks in, one
//! read-only parameter record per frame out.

mod invert;

// Re-export public types
pub use invert::{FlashTiming, InvertPhase, InvertState, InvertTransition};

use crate::audio::BandIntensities;
use crate::clock::ClockTick;
use crate::profile::Profile;

/// Upper bound on loudness-modulated trail retention
pub const MAX_MODULATED_TRAIL_DECAY: f32 = 0.98;

/// The single mutable record of a session, updated once per frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// Rotation accumulator (degrees, always in [0, 360))
    pub rotation_degrees: f32,

    /// Unbounded warp phase accumulator
    pub distortion_clock: f64,

    /// Flash/invert FSM
    pub invert: InvertState,

    /// Trail half read this frame (0 or 1); toggled by the compositor
    pub trail_buffer_index: usize,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            rotation_degrees: 0.0,
            distortion_clock: 0.0,
            invert: InvertState::default(),
            trail_buffer_index: 0,
        }
    }
}

/// Everything the compositor needs for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Inverse zoom factor
    pub scale: f32,

    /// Subject rotation (degrees, [0, 360))
    pub rotation_degrees: f32,

    /// Warp phase
    pub distortion_clock: f64,

    /// Warp strength in [0, 1]
    pub distortion_intensity: f32,

    /// Hue rotation applied to the tint (degrees)
    pub hue_shift_degrees: f32,

    /// Flash active this frame
    pub invert: bool,

    /// Subject glow, raw low intensity
    pub glow_intensity: f32,

    /// Trail retention this frame
    pub trail_decay: f32,
}

impl Default for FrameParams {
    fn default() -> Self {
        // Untransformed subject, no trail
        Self {
            scale: 1.0,
            rotation_degrees: 0.0,
            distortion_clock: 0.0,
            distortion_intensity: 0.0,
            hue_shift_degrees: 0.0,
            invert: false,
            glow_intensity: 0.0,
            trail_decay: 0.0,
        }
    }
}

/// Audio features for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperInput {
    pub smoothed: BandIntensities,
    pub raw: BandIntensities,

    /// RMS of the analysis window, [0, 1]
    pub loudness: f32,
}

impl MapperInput {
    pub const SILENT: Self = Self {
        smoothed: BandIntensities::ZERO,
        raw: BandIntensities::ZERO,
        loudness: 0.0,
    };
}

/// Turns features into frame parameters and drives the flash FSM
#[derive(Debug, Clone)]
pub struct ParameterMapper {
    scale_min: f32,
    scale_range: f32,
    rotation_speed: f32,
    distortion_threshold: f32,
    distortion_base_speed: f32,
    distortion_speed_multiplier: f32,
    hue_shift_multiplier: f32,
    trail_decay: f32,
    trail_decay_loudness_modulation: bool,
    trail_decay_loudness_gain: f32,
    flash: FlashTiming,
}

impl ParameterMapper {
    pub fn new(profile: &Profile) -> Self {
        Self {
            scale_min: profile.scale_min,
            scale_range: profile.scale_range,
            rotation_speed: profile.rotation_speed,
            distortion_threshold: profile.distortion_threshold,
            distortion_base_speed: profile.distortion_base_speed,
            distortion_speed_multiplier: profile.distortion_speed_multiplier,
            hue_shift_multiplier: profile.hue_shift_multiplier,
            trail_decay: profile.trail_decay,
            trail_decay_loudness_modulation: profile.trail_decay_loudness_modulation,
            trail_decay_loudness_gain: profile.trail_decay_loudness_gain,
            flash: FlashTiming {
                threshold: profile.inversion_bass_threshold,
                cooldown: profile.inversion_cooldown,
                duration: profile.inversion_duration,
            },
        }
    }

    /// Map one frame, advancing the rotation, distortion clock and flash FSM
    /// (in that order)
    pub fn map(&self, state: &mut RenderState, input: &MapperInput, tick: ClockTick) -> FrameParams {
        let smoothed = sanitize_bands(input.smoothed);
        let raw = sanitize_bands(input.raw);
        let delta = if tick.delta_frames.is_finite() {
            tick.delta_frames.max(0.0)
        } else {
            0.0
        };

        let scale = self.scale_min + smoothed.low * self.scale_range;

        state.rotation_degrees =
            wrap_degrees(state.rotation_degrees + raw.high * self.rotation_speed * delta);

        let distortion_intensity = self.distortion_intensity(smoothed.mid);
        let clock_speed =
            self.distortion_base_speed + distortion_intensity * self.distortion_speed_multiplier;
        state.distortion_clock += (clock_speed * delta) as f64;

        if state.invert.step(&self.flash, smoothed.low, tick.now) == InvertTransition::Started {
            tracing::debug!(
                at = tick.now,
                low = smoothed.low,
                "Invert flash started"
            );
        }

        FrameParams {
            scale,
            rotation_degrees: state.rotation_degrees,
            distortion_clock: state.distortion_clock,
            distortion_intensity,
            hue_shift_degrees: raw.high * self.hue_shift_multiplier,
            invert: state.invert.is_active(),
            glow_intensity: raw.low,
            trail_decay: self.trail_decay(sanitize_unit(input.loudness)),
        }
    }

    /// `clamp01(max(0, mid - threshold) / (1 - threshold))`
    pub fn distortion_intensity(&self, smoothed_mid: f32) -> f32 {
        let headroom = 1.0 - self.distortion_threshold;
        if headroom <= 0.0 {
            return 0.0;
        }
        ((smoothed_mid - self.distortion_threshold).max(0.0) / headroom).clamp(0.0, 1.0)
    }

    fn trail_decay(&self, loudness: f32) -> f32 {
        if self.trail_decay_loudness_modulation {
            (self.trail_decay + loudness * self.trail_decay_loudness_gain)
                .clamp(0.0, MAX_MODULATED_TRAIL_DECAY)
        } else {
            self.trail_decay
        }
    }
}

/// Wrap an angle into [0, 360)
pub fn wrap_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn sanitize_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn sanitize_bands(bands: BandIntensities) -> BandIntensities {
    BandIntensities {
        low: sanitize_unit(bands.low),
        mid: sanitize_unit(bands.mid),
        high: sanitize_unit(bands.high),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrameClock;
    use crate::profile::{presets, Environment};
    use proptest::prelude::*;

    fn profile(environment: Environment) -> Profile {
        presets::classic().resolve(environment).unwrap()
    }

    fn input(smoothed: BandIntensities, raw: BandIntensities) -> MapperInput {
        MapperInput {
            smoothed,
            raw,
            loudness: 0.0,
        }
    }

    fn bands(low: f32, mid: f32, high: f32) -> BandIntensities {
        BandIntensities { low, mid, high }
    }

    #[test]
    fn test_silence_keeps_everything_at_rest() {
        let profile = profile(Environment::FrameIndexed);
        let mapper = ParameterMapper::new(&profile);
        let mut clock = FrameClock::frame_indexed();
        let mut state = RenderState::default();

        for i in 0..60 {
            let params = mapper.map(&mut state, &MapperInput::SILENT, clock.tick(i as f64));
            assert_eq!(params.scale, profile.scale_min);
            assert_eq!(params.rotation_degrees, 0.0);
            assert!(!params.invert);
            assert_eq!(params.distortion_intensity, 0.0);
        }

        assert_eq!(state.rotation_degrees, 0.0);
        assert_eq!(state.invert.last_trigger, None);
        // Base speed keeps the warp phase moving
        assert!((state.distortion_clock - 60.0 * profile.distortion_base_speed as f64).abs() < 1e-5);
    }

    #[test]
    fn test_scale_and_hue_follow_features() {
        let profile = profile(Environment::FrameIndexed);
        let mapper = ParameterMapper::new(&profile);
        let mut state = RenderState::default();
        let tick = ClockTick {
            delta_frames: 1.0,
            now: 0.0,
        };

        let params = mapper.map(&mut state, &input(bands(1.0, 0.0, 0.0), bands(0.0, 0.0, 0.5)), tick);

        assert!((params.scale - (profile.scale_min + profile.scale_range)).abs() < 1e-6);
        assert!((params.hue_shift_degrees - 0.5 * profile.hue_shift_multiplier).abs() < 1e-6);
        assert!((params.rotation_degrees - 0.5 * profile.rotation_speed).abs() < 1e-6);
        assert_eq!(params.glow_intensity, 0.0);
    }

    #[test]
    fn test_rotation_reads_raw_high_and_distortion_reads_smoothed_mid() {
        let profile = profile(Environment::FrameIndexed);
        let mapper = ParameterMapper::new(&profile);
        let tick = ClockTick {
            delta_frames: 1.0,
            now: 0.0,
        };

        // Mid everywhere, high nowhere: no rotation, full distortion
        let mut state = RenderState::default();
        let params = mapper.map(&mut state, &input(bands(0.0, 1.0, 0.0), bands(0.0, 1.0, 0.0)), tick);
        assert_eq!(params.rotation_degrees, 0.0);
        assert!((params.distortion_intensity - 1.0).abs() < 1e-6);

        // High everywhere, mid nowhere: rotation only
        let mut state = RenderState::default();
        let params = mapper.map(&mut state, &input(bands(0.0, 0.0, 1.0), bands(0.0, 0.0, 1.0)), tick);
        assert!((params.rotation_degrees - profile.rotation_speed).abs() < 1e-6);
        assert_eq!(params.distortion_intensity, 0.0);
        assert!((state.distortion_clock - profile.distortion_base_speed as f64).abs() < 1e-6);

        // Smoothed high alone does not rotate
        let mut state = RenderState::default();
        let params = mapper.map(&mut state, &input(bands(0.0, 0.0, 1.0), BandIntensities::ZERO), tick);
        assert_eq!(params.rotation_degrees, 0.0);
    }

    #[test]
    fn test_distortion_intensity_formula() {
        let mapper = ParameterMapper::new(&profile(Environment::Continuous));

        // classic threshold is 0.3
        assert_eq!(mapper.distortion_intensity(0.0), 0.0);
        assert_eq!(mapper.distortion_intensity(0.3), 0.0);
        assert!((mapper.distortion_intensity(0.65) - 0.5).abs() < 1e-6);
        assert!((mapper.distortion_intensity(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_distortion_clock_scales_with_delta() {
        let profile = profile(Environment::Continuous);
        let mapper = ParameterMapper::new(&profile);
        let full_mid = input(bands(0.0, 1.0, 0.0), BandIntensities::ZERO);

        let mut one = RenderState::default();
        mapper.map(&mut one, &full_mid, ClockTick { delta_frames: 1.0, now: 0.0 });
        mapper.map(&mut one, &full_mid, ClockTick { delta_frames: 1.0, now: 33.0 });

        let mut two = RenderState::default();
        mapper.map(&mut two, &full_mid, ClockTick { delta_frames: 2.0, now: 66.0 });

        let per_frame = (profile.distortion_base_speed + profile.distortion_speed_multiplier) as f64;
        assert!((one.distortion_clock - 2.0 * per_frame).abs() < 1e-6);
        assert!((one.distortion_clock - two.distortion_clock).abs() < 1e-6);
    }

    #[test]
    fn test_flash_follows_smoothed_low_in_frames() {
        let profile = profile(Environment::FrameIndexed);
        let mapper = ParameterMapper::new(&profile);
        let mut clock = FrameClock::frame_indexed();
        let mut state = RenderState::default();
        let loud = input(bands(0.9, 0.0, 0.0), bands(0.9, 0.0, 0.0));

        let active: Vec<bool> = (0..20)
            .map(|i| mapper.map(&mut state, &loud, clock.tick(i as f64)).invert)
            .collect();

        // 3 frame flash, 15 frame cooldown
        let expected: Vec<bool> = (0..20).map(|i| i < 3 || (15..18).contains(&i)).collect();
        assert_eq!(active, expected);
    }

    #[test]
    fn test_trail_decay_modulation() {
        let mut profile = profile(Environment::FrameIndexed);
        let tick = ClockTick { delta_frames: 1.0, now: 0.0 };
        let mut loud = MapperInput::SILENT;
        loud.loudness = 1.0;

        let plain = ParameterMapper::new(&profile);
        let params = plain.map(&mut RenderState::default(), &loud, tick);
        assert_eq!(params.trail_decay, profile.trail_decay);

        profile.trail_decay_loudness_modulation = true;
        profile.trail_decay_loudness_gain = 0.5;
        let modulated = ParameterMapper::new(&profile);
        let params = modulated.map(&mut RenderState::default(), &loud, tick);
        assert_eq!(params.trail_decay, MAX_MODULATED_TRAIL_DECAY);

        let params = modulated.map(&mut RenderState::default(), &MapperInput::SILENT, tick);
        assert_eq!(params.trail_decay, profile.trail_decay);
    }

    #[test]
    fn test_non_finite_input_never_reaches_state() {
        let mapper = ParameterMapper::new(&profile(Environment::Continuous));
        let mut state = RenderState::default();
        let nan = bands(f32::NAN, f32::INFINITY, f32::NAN);
        let mut input = input(nan, nan);
        input.loudness = f32::NAN;

        let params = mapper.map(
            &mut state,
            &input,
            ClockTick {
                delta_frames: f32::NAN,
                now: 0.0,
            },
        );

        assert!(state.rotation_degrees.is_finite());
        assert!(state.distortion_clock.is_finite());
        assert!(params.scale.is_finite());
        assert!(params.trail_decay.is_finite());
        assert!(params.hue_shift_degrees.is_finite());
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-10.0), 350.0);
        assert_eq!(wrap_degrees(720.0), 0.0);
        assert_eq!(wrap_degrees(-1e-9), 0.0);
        assert_eq!(wrap_degrees(f32::NAN), 0.0);
    }

    proptest! {
        #[test]
        fn prop_rotation_stays_in_range(
            highs in proptest::collection::vec(0.0f32..=1.0, 1..400),
            deltas in proptest::collection::vec(0.0f32..=4.0, 1..400),
            speed in -50.0f32..50.0,
        ) {
            let mut profile = profile(Environment::Continuous);
            profile.rotation_speed = speed;
            let mapper = ParameterMapper::new(&profile);
            let mut state = RenderState::default();

            for (i, (&high, &delta)) in highs.iter().zip(deltas.iter().cycle()).enumerate() {
                let input = input(BandIntensities::ZERO, bands(0.0, 0.0, high));
                let tick = ClockTick { delta_frames: delta, now: i as f64 * 33.0 };
                let params = mapper.map(&mut state, &input, tick);

                prop_assert!(state.rotation_degrees >= 0.0 && state.rotation_degrees < 360.0);
                prop_assert_eq!(params.rotation_degrees, state.rotation_degrees);
            }
        }
    }
}
