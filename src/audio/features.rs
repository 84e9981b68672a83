//! Banded feature extraction from one analysis window.

use std::ops::Range;

use super::{AnalysisWindow, BandIntensities};
use crate::profile::{BandSettings, Calibration, Profile};

/// Stateless extractor: range summation, normalization, power curve
#[derive(Debug, Clone)]
pub struct AudioFeatureExtractor {
    low: BandSettings,
    mid: BandSettings,
    high: BandSettings,
    calibration: Calibration,
}

impl AudioFeatureExtractor {
    pub fn new(profile: &Profile) -> Self {
        Self {
            low: profile.low_band,
            mid: profile.mid_band,
            high: profile.high_band,
            calibration: profile.calibration,
        }
    }

    /// Extract low/mid/high intensities.
    ///
    /// Empty or malformed windows yield zeros; the result is always finite.
    pub fn extract(&self, window: &AnalysisWindow) -> BandIntensities {
        if window.is_empty() || !(window.bin_width_hz > 0.0) {
            return BandIntensities::ZERO;
        }

        BandIntensities {
            low: self.band_intensity(window, &self.low),
            mid: self.band_intensity(window, &self.mid),
            high: self.band_intensity(window, &self.high),
        }
    }

    /// Overall loudness: RMS of the normalized window, in [0, 1]
    pub fn loudness(&self, window: &AnalysisWindow) -> f32 {
        if window.is_empty() {
            return 0.0;
        }

        let sum_sq: f32 = window
            .bins
            .iter()
            .map(|&e| {
                let n = self.normalize(sanitize(e));
                n * n
            })
            .sum();

        finite_or_zero((sum_sq / window.len() as f32).sqrt()).clamp(0.0, 1.0)
    }

    fn band_intensity(&self, window: &AnalysisWindow, band: &BandSettings) -> f32 {
        let bins = bin_range(band, window.bin_width_hz, window.len());
        if bins.is_empty() {
            return 0.0;
        }

        let count = bins.len() as f32;
        let mean = window.bins[bins].iter().map(|&e| sanitize(e)).sum::<f32>() / count;
        let normalized = self.normalize(mean);

        finite_or_zero(normalized.powf(band.exponent)).clamp(0.0, 1.0)
    }

    /// Scale a raw energy onto [0, 1] using the source's known maximum
    fn normalize(&self, energy: f32) -> f32 {
        let max = self.calibration.source_max_energy;
        if !(max > 0.0) || !max.is_finite() {
            return 0.0;
        }

        finite_or_zero(energy / max * self.calibration.analysis_gain).clamp(0.0, 1.0)
    }
}

/// Convert a band's Hz range to window bin indices (end exclusive)
pub(crate) fn bin_range(band: &BandSettings, bin_width_hz: f32, len: usize) -> Range<usize> {
    let start = ((band.min_hz / bin_width_hz) as usize).min(len);
    let end = ((band.max_hz / bin_width_hz) as usize).min(len);

    // A band narrower than one bin still reads the bin it falls in
    if end <= start && start < len {
        return start..start + 1;
    }

    start..end
}

fn sanitize(energy: f32) -> f32 {
    if energy.is_finite() {
        energy.max(0.0)
    } else {
        0.0
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
