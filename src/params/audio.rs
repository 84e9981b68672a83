//! Audio analysis configuration and constants.

use crate::profile::Profile;

use super::ParamsError;

/// Spectrum analysis configuration
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Audio sample rate (Hz), taken from the source
    pub sample_rate_hz: u32,

    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Live analysis update interval (milliseconds)
    pub update_interval_ms: u64,

    /// Magnitude mapped to zero energy (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to full-scale energy (dBFS)
    pub max_decibels: f32,

    /// Energy reported for a full-scale bin
    pub source_max_energy: f32,
}

impl AnalysisConfig {
    /// Analysis settings for a profile's environment and a source sample rate
    pub fn from_profile(profile: &Profile, sample_rate_hz: u32, update_interval_ms: u64) -> Self {
        Self {
            sample_rate_hz,
            fft_size: profile.fft_size,
            update_interval_ms,
            min_decibels: profile.calibration.min_decibels,
            max_decibels: profile.calibration.max_decibels,
            source_max_energy: profile.calibration.source_max_energy,
        }
    }

    /// Frequency resolution (Hz per bin)
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz as f32 / self.fft_size as f32
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(ParamsError::Analysis(format!(
                "FFT size must be a power of 2 >= 32, got {}",
                self.fft_size
            )));
        }
        if self.sample_rate_hz == 0 {
            return Err(ParamsError::Analysis("Sample rate must be > 0".to_string()));
        }
        if self.max_decibels <= self.min_decibels {
            return Err(ParamsError::Analysis(format!(
                "Decibel range is empty: [{}, {}]",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// Audio constants (compile-time, match Glicol engine setup)
pub mod audio_constants {
    /// Audio block size (samples per buffer)
    /// 128 = 2.9ms @ 44.1kHz
    pub const BLOCK_SIZE: usize = 128;

    /// Live analysis update interval (milliseconds), ~60 Hz
    pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 16;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{presets, Environment};

    fn config() -> AnalysisConfig {
        let profile = presets::classic().resolve(Environment::Continuous).unwrap();
        AnalysisConfig::from_profile(&profile, 44100, 16)
    }

    #[test]
    fn test_bin_width_follows_profile_fft_size() {
        // 44100 Hz / 2048 bins ≈ 21.53 Hz per bin
        assert!((config().bin_width_hz() - 21.533).abs() < 1e-3);
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.fft_size = 1000;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.sample_rate_hz = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.max_decibels = bad.min_decibels;
        assert!(bad.validate().is_err());
    }
}
