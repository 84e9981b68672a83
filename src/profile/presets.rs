//! Built-in profiles.

use super::{Environment, ProfileError, ProfileSource};

/// Names accepted by [`by_name`]
pub const NAMES: &[&str] = &["classic", "legacy-server", "mellow"];

/// The reference look: punchy bass flash, pink trails, moderate warp
pub fn classic() -> ProfileSource {
    ProfileSource::new("classic")
        .with_shared("target_frame_rate", 30.0)
        .with_shared("fft_size", 2048.0)
        // Bands (Hz)
        .with_shared("low_min_hz", 20.0)
        .with_shared("low_max_hz", 140.0)
        .with_shared("low_exponent", 2.0)
        .with_shared("low_smoothing", 0.7)
        .with_shared("mid_min_hz", 140.0)
        .with_shared("mid_max_hz", 2000.0)
        .with_shared("mid_exponent", 1.2)
        .with_shared("mid_smoothing", 0.6)
        .with_shared("high_min_hz", 2000.0)
        .with_shared("high_max_hz", 8000.0)
        .with_shared("high_exponent", 1.0)
        .with_shared("high_smoothing", 0.5)
        // Mapping
        .with_shared("scale_min", 0.85)
        .with_shared("scale_range", 0.35)
        .with_shared("rotation_speed", 2.0)
        .with_shared("distortion_threshold", 0.3)
        .with_shared("distortion_base_speed", 0.02)
        .with_shared("distortion_speed_multiplier", 0.15)
        .with_shared("warp_amplitude", 0.04)
        .with_shared("hue_shift_multiplier", 120.0)
        .with_shared("inversion_bass_threshold", 0.6)
        .with_shared("trail_decay", 0.88)
        .with_flag("trail_decay_loudness_modulation", false)
        .with_shared("trail_decay_loudness_gain", 0.08)
        .with_shared("max_frame_delta", 4.0)
        // Compositing
        .with_shared("glow_strength", 0.6)
        .with_shared("edge_strength", 0.8)
        .with_shared("saturation_boost", 0.2)
        .with_shared("value_boost", 0.1)
        .with_shared("invert_luma_floor", 0.04)
        // Flash: 500ms = 15 frames, 100ms = 3 frames @ 30fps
        .with_duration_ms("inversion_cooldown", 500.0)
        .with_duration_ms("inversion_duration", 100.0)
        .with_calibration_both("source_max_energy", 255.0)
        .with_calibration_both("analysis_gain", 1.0)
        .with_calibration_both("min_decibels", -100.0)
        .with_calibration_both("max_decibels", -30.0)
}

/// The export server's look: classic with loudness-driven trails and
/// hotter offline analysis
pub fn legacy_server() -> ProfileSource {
    let mut source = classic()
        .with_flag("trail_decay_loudness_modulation", true)
        .with_shared("trail_decay", 0.85)
        .with_shared("edge_strength", 1.0)
        // WAV analysis reads quieter than the live analyser
        .with_calibration(Environment::FrameIndexed, "analysis_gain", 1.15);
    source.name = "legacy-server".to_string();
    source
}

/// Slow, smeared variant for ambient material
pub fn mellow() -> ProfileSource {
    let mut source = classic()
        .with_shared("low_smoothing", 0.85)
        .with_shared("mid_smoothing", 0.8)
        .with_shared("high_smoothing", 0.75)
        .with_shared("scale_range", 0.2)
        .with_shared("rotation_speed", 0.75)
        .with_shared("distortion_threshold", 0.45)
        .with_shared("hue_shift_multiplier", 60.0)
        .with_shared("inversion_bass_threshold", 0.8)
        .with_shared("trail_decay", 0.94)
        .with_shared("glow_strength", 0.35)
        .with_shared("edge_strength", 0.4)
        .with_duration_ms("inversion_cooldown", 1500.0)
        .with_duration_ms("inversion_duration", 200.0);
    source.name = "mellow".to_string();
    source
}

/// Every built-in profile
pub fn all() -> Vec<ProfileSource> {
    vec![classic(), legacy_server(), mellow()]
}

/// Look up a built-in profile
pub fn by_name(name: &str) -> Result<ProfileSource, ProfileError> {
    match name {
        "classic" => Ok(classic()),
        "legacy-server" | "legacy_server" => Ok(legacy_server()),
        "mellow" => Ok(mellow()),
        other => Err(ProfileError::UnknownPreset(other.to_string())),
    }
}

impl ProfileSource {
    fn with_calibration_both(self, key: &str, value: f64) -> Self {
        self.with_calibration(Environment::Continuous, key, value)
            .with_calibration(Environment::FrameIndexed, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_resolves_in_both_environments() {
        for name in NAMES {
            let source = by_name(name).unwrap();
            assert_eq!(&source.name, name);

            let set = source.compile().unwrap();
            set.resolve(Environment::Continuous).unwrap();
            set.resolve(Environment::FrameIndexed).unwrap();
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            by_name("disco"),
            Err(ProfileError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_legacy_server_calibration_differs_only_offline() {
        let source = legacy_server();
        let live = source.resolve(Environment::Continuous).unwrap();
        let offline = source.resolve(Environment::FrameIndexed).unwrap();

        assert_eq!(live.calibration.analysis_gain, 1.0);
        assert!((offline.calibration.analysis_gain - 1.15).abs() < 1e-6);
        assert!(offline.trail_decay_loudness_modulation);
    }

    #[test]
    fn test_mellow_durations_convert_to_frames() {
        let offline = mellow().resolve(Environment::FrameIndexed).unwrap();
        assert_eq!(offline.inversion_cooldown, 45.0);
        assert_eq!(offline.inversion_duration, 6.0);
    }
}
