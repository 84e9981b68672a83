//! Profiles: tunable look constants, resolved per runtime environment.
//!
//! A profile is authored once ([`ProfileSource`]) and compiled into a
//! continuous view (`*_ms` durations) and a frame-indexed view (`*_frames`
//! durations). Only analysis calibration may differ between the two; every
//! other key must agree, which [`validate_parity`] enforces for both
//! generated and hand-written view pairs.

mod loader;
pub mod presets;
mod schema;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export public types
pub use loader::{load_profile, parse_profile, LegacyPair};
pub use schema::{
    field, ms_to_frames, validate_parity, view_key, CalibrationTables, FieldSpec, ProfileSource,
    ProfileValue, ProfileView, Unit, ValueKind, FIELDS,
};

/// Runtime environment a profile view is resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Live display, variable frame rate, wall-clock milliseconds
    Continuous,

    /// Offline export, fixed frame rate, frame indices
    FrameIndexed,
}

impl Environment {
    /// Suffix of duration keys in this environment's view
    pub fn duration_suffix(self) -> &'static str {
        match self {
            Self::Continuous => "ms",
            Self::FrameIndexed => "frames",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::FrameIndexed => write!(f, "frame_indexed"),
        }
    }
}

/// Profile loading, validation and parity errors
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Missing key '{key}' in {environment} view")]
    MissingKey { environment: Environment, key: String },

    #[error("Unknown profile key '{0}'")]
    UnknownKey(String),

    #[error("Key '{key}' has the wrong unit suffix for the {environment} view")]
    UnitSuffixMismatch { environment: Environment, key: String },

    #[error("Key '{key}' has no counterpart in the {environment} view")]
    MissingCounterpart { key: String, environment: Environment },

    #[error("Shared key '{key}' diverges: continuous={continuous}, frame_indexed={frame_indexed}")]
    Divergent {
        key: String,
        continuous: ProfileValue,
        frame_indexed: ProfileValue,
    },

    #[error("Duration '{field}': {ms}ms should be {expected} frames, found {frames}")]
    InconsistentDuration {
        field: String,
        ms: f64,
        frames: f64,
        expected: f64,
    },

    #[error("Key '{key}' must be a {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Key '{key}' = {value} is out of range: {reason}")]
    OutOfRange {
        key: String,
        value: f64,
        reason: &'static str,
    },

    #[error("Unknown preset '{0}' (available: classic, legacy-server, mellow)")]
    UnknownPreset(String),

    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Malformed profile: {0}")]
    MalformedFile(String),
}

/// Spectral band definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSettings {
    /// Lower edge (Hz)
    pub min_hz: f32,

    /// Upper edge (Hz)
    pub max_hz: f32,

    /// Power-curve exponent applied after normalization
    pub exponent: f32,

    /// Smoothing factor (weight of the previous value)
    pub smoothing: f32,
}

/// Analysis calibration (the only environment-specific profile values)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Energy of a full-scale bin as reported by the analysis source
    pub source_max_energy: f32,

    /// Multiplier applied after normalization
    pub analysis_gain: f32,

    /// Magnitude mapped to zero energy (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to full-scale energy (dBFS)
    pub max_decibels: f32,
}

/// A profile resolved for one environment
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub environment: Environment,

    /// Nominal frame rate (fps); also the frame-indexed export rate
    pub target_frame_rate: f32,

    /// FFT window size (samples, power of 2)
    pub fft_size: usize,

    pub low_band: BandSettings,
    pub mid_band: BandSettings,
    pub high_band: BandSettings,

    /// Base scale (multiplier)
    pub scale_min: f32,

    /// Scale added at full low intensity
    pub scale_range: f32,

    /// Rotation per frame at full raw high intensity (degrees)
    pub rotation_speed: f32,

    /// Smoothed mid intensity below which distortion is off
    pub distortion_threshold: f32,

    /// Distortion clock advance per frame
    pub distortion_base_speed: f32,

    /// Extra distortion clock advance per frame at full distortion intensity (from smoothed mid)
    pub distortion_speed_multiplier: f32,

    /// Warp displacement at zero intensity (fraction of frame size)
    pub warp_amplitude: f32,

    /// Hue shift at full raw high intensity (degrees, below 360)
    pub hue_shift_multiplier: f32,

    /// Smoothed low intensity that triggers the flash
    pub inversion_bass_threshold: f32,

    /// Trail retention per frame
    pub trail_decay: f32,

    /// Modulate trail retention by loudness
    pub trail_decay_loudness_modulation: bool,

    /// Retention added at full loudness when modulation is on
    pub trail_decay_loudness_gain: f32,

    /// Largest per-tick delta the continuous clock reports (frames)
    pub max_frame_delta: f32,

    /// Subject glow at full low intensity
    pub glow_strength: f32,

    /// Edge accent weight
    pub edge_strength: f32,

    /// Saturation added during recolor
    pub saturation_boost: f32,

    /// Value added during recolor
    pub value_boost: f32,

    /// Pixels darker than this are left alone by the flash
    pub invert_luma_floor: f32,

    /// Minimum gap between flash starts, in the environment's native unit
    pub inversion_cooldown: f64,

    /// Flash length, in the environment's native unit
    pub inversion_duration: f64,

    pub calibration: Calibration,
}

impl Profile {
    /// Build a typed profile from a validated view
    pub fn from_view(name: &str, view: &ProfileView) -> Result<Self, ProfileError> {
        view.check_complete()?;

        let env = view.environment;
        let num = |key: &str| view.number(key).map(|v| v as f32);
        let duration = |name: &str| -> Result<f64, ProfileError> {
            let spec = schema::field(name).ok_or_else(|| ProfileError::UnknownKey(name.into()))?;
            view.number(&view_key(spec, env))
        };
        let band = |prefix: &str| -> Result<BandSettings, ProfileError> {
            Ok(BandSettings {
                min_hz: num(&format!("{}_min_hz", prefix))?,
                max_hz: num(&format!("{}_max_hz", prefix))?,
                exponent: num(&format!("{}_exponent", prefix))?,
                smoothing: num(&format!("{}_smoothing", prefix))?,
            })
        };

        let profile = Self {
            name: name.to_string(),
            environment: env,
            target_frame_rate: num("target_frame_rate")?,
            fft_size: view.number("fft_size")? as usize,
            low_band: band("low")?,
            mid_band: band("mid")?,
            high_band: band("high")?,
            scale_min: num("scale_min")?,
            scale_range: num("scale_range")?,
            rotation_speed: num("rotation_speed")?,
            distortion_threshold: num("distortion_threshold")?,
            distortion_base_speed: num("distortion_base_speed")?,
            distortion_speed_multiplier: num("distortion_speed_multiplier")?,
            warp_amplitude: num("warp_amplitude")?,
            hue_shift_multiplier: num("hue_shift_multiplier")?,
            inversion_bass_threshold: num("inversion_bass_threshold")?,
            trail_decay: num("trail_decay")?,
            trail_decay_loudness_modulation: view.flag("trail_decay_loudness_modulation")?,
            trail_decay_loudness_gain: num("trail_decay_loudness_gain")?,
            max_frame_delta: num("max_frame_delta")?,
            glow_strength: num("glow_strength")?,
            edge_strength: num("edge_strength")?,
            saturation_boost: num("saturation_boost")?,
            value_boost: num("value_boost")?,
            invert_luma_floor: num("invert_luma_floor")?,
            inversion_cooldown: duration("inversion_cooldown")?,
            inversion_duration: duration("inversion_duration")?,
            calibration: Calibration {
                source_max_energy: num("source_max_energy")?,
                analysis_gain: num("analysis_gain")?,
                min_decibels: num("min_decibels")?,
                max_decibels: num("max_decibels")?,
            },
        };

        // fft_size must be an integral power of two
        let fft = view.number("fft_size")?;
        if fft.fract() != 0.0 || !profile.fft_size.is_power_of_two() || profile.fft_size < 32 {
            return Err(out_of_range("fft_size", fft, "must be a power of 2 >= 32"));
        }

        profile.validate()?;
        Ok(profile)
    }

    /// Range checks on every tunable
    pub fn validate(&self) -> Result<(), ProfileError> {
        let check = |key: &str, value: f32, ok: bool, reason: &'static str| {
            if ok && value.is_finite() {
                Ok(())
            } else {
                Err(out_of_range(key, value as f64, reason))
            }
        };
        let unit = |v: f32| (0.0..=1.0).contains(&v);

        check("target_frame_rate", self.target_frame_rate, self.target_frame_rate > 0.0, "must be > 0")?;

        for (prefix, band) in [
            ("low", &self.low_band),
            ("mid", &self.mid_band),
            ("high", &self.high_band),
        ] {
            check(&format!("{}_min_hz", prefix), band.min_hz, band.min_hz >= 0.0, "must be >= 0")?;
            check(
                &format!("{}_max_hz", prefix),
                band.max_hz,
                band.max_hz > band.min_hz,
                "must exceed the band's min_hz",
            )?;
            check(&format!("{}_exponent", prefix), band.exponent, band.exponent > 0.0, "must be > 0")?;
            check(
                &format!("{}_smoothing", prefix),
                band.smoothing,
                (0.0..1.0).contains(&band.smoothing),
                "must be in [0, 1)",
            )?;
        }

        check("scale_min", self.scale_min, self.scale_min > 0.0, "must be > 0")?;
        check("scale_range", self.scale_range, self.scale_range >= 0.0, "must be >= 0")?;
        check("rotation_speed", self.rotation_speed, true, "must be finite")?;
        check(
            "distortion_threshold",
            self.distortion_threshold,
            (0.0..1.0).contains(&self.distortion_threshold),
            "must be in [0, 1)",
        )?;
        check("distortion_base_speed", self.distortion_base_speed, self.distortion_base_speed >= 0.0, "must be >= 0")?;
        check(
            "distortion_speed_multiplier",
            self.distortion_speed_multiplier,
            self.distortion_speed_multiplier >= 0.0,
            "must be >= 0",
        )?;
        check("warp_amplitude", self.warp_amplitude, self.warp_amplitude >= 0.0, "must be >= 0")?;
        check(
            "hue_shift_multiplier",
            self.hue_shift_multiplier,
            self.hue_shift_multiplier.abs() < 360.0,
            "must stay below 360 degrees",
        )?;
        check(
            "inversion_bass_threshold",
            self.inversion_bass_threshold,
            unit(self.inversion_bass_threshold),
            "must be in [0, 1]",
        )?;
        check("trail_decay", self.trail_decay, (0.0..1.0).contains(&self.trail_decay), "must be in [0, 1)")?;
        check(
            "trail_decay_loudness_gain",
            self.trail_decay_loudness_gain,
            self.trail_decay_loudness_gain >= 0.0,
            "must be >= 0",
        )?;
        check("max_frame_delta", self.max_frame_delta, self.max_frame_delta >= 1.0, "must be >= 1")?;
        check("glow_strength", self.glow_strength, self.glow_strength >= 0.0, "must be >= 0")?;
        check("edge_strength", self.edge_strength, self.edge_strength >= 0.0, "must be >= 0")?;
        check("saturation_boost", self.saturation_boost, unit(self.saturation_boost), "must be in [0, 1]")?;
        check("value_boost", self.value_boost, unit(self.value_boost), "must be in [0, 1]")?;
        check("invert_luma_floor", self.invert_luma_floor, unit(self.invert_luma_floor), "must be in [0, 1]")?;

        for (key, value) in [
            ("inversion_cooldown", self.inversion_cooldown),
            ("inversion_duration", self.inversion_duration),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(out_of_range(key, value, "must be >= 0"));
            }
        }

        let cal = &self.calibration;
        check("source_max_energy", cal.source_max_energy, cal.source_max_energy > 0.0, "must be > 0")?;
        check("analysis_gain", cal.analysis_gain, cal.analysis_gain > 0.0, "must be > 0")?;
        check("min_decibels", cal.min_decibels, true, "must be finite")?;
        check(
            "max_decibels",
            cal.max_decibels,
            cal.max_decibels > cal.min_decibels,
            "must exceed min_decibels",
        )?;

        Ok(())
    }
}

fn out_of_range(key: &str, value: f64, reason: &'static str) -> ProfileError {
    ProfileError::OutOfRange {
        key: key.to_string(),
        value,
        reason,
    }
}

/// A profile compiled into both environment views, parity-checked
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSet {
    pub name: String,
    pub continuous: ProfileView,
    pub frame_indexed: ProfileView,
}

impl ProfileSet {
    /// Pair two views; fails unless they pass [`validate_parity`]
    pub fn new(
        name: impl Into<String>,
        continuous: ProfileView,
        frame_indexed: ProfileView,
    ) -> Result<Self, ProfileError> {
        validate_parity(&continuous, &frame_indexed)?;
        Ok(Self {
            name: name.into(),
            continuous,
            frame_indexed,
        })
    }

    pub fn view(&self, environment: Environment) -> &ProfileView {
        match environment {
            Environment::Continuous => &self.continuous,
            Environment::FrameIndexed => &self.frame_indexed,
        }
    }

    /// Resolve the typed profile for one environment
    pub fn resolve(&self, environment: Environment) -> Result<Profile, ProfileError> {
        let profile = Profile::from_view(&self.name, self.view(environment))?;
        tracing::debug!(
            profile = %self.name,
            %environment,
            cooldown = profile.inversion_cooldown,
            duration = profile.inversion_duration,
            "Resolved profile"
        );
        Ok(profile)
    }

    /// Serialize as a legacy `[continuous]` / `[frame_indexed]` pair
    pub fn to_legacy_toml(&self) -> Result<String, ProfileError> {
        let pair = LegacyPair {
            name: Some(self.name.clone()),
            continuous: self.continuous.values.clone(),
            frame_indexed: self.frame_indexed.values.clone(),
        };
        Ok(toml::to_string_pretty(&pair)?)
    }
}
