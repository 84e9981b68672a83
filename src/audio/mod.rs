//! Audio analysis and feature extraction.
//!
//! The analysis collaborator (live FFT thread or offline WAV analysis)
//! produces one [`AnalysisWindow`] per rendered frame; the extractor and
//! smoother turn it into the banded intensities the parameter mapper reads.

mod features;
mod fft;
mod smoothing;
mod source;
mod synthesis;
mod system;

// Re-export public types
pub use features::AudioFeatureExtractor;
pub use fft::{spawn_fft_thread, SpectrumAnalyzer};
pub use smoothing::{half_life_frames, smooth, FeatureSmoother};
pub use source::{decode_wav, AudioClip};
pub use synthesis::GLICOL_COMPOSITION;
pub use system::{AudioInput, AudioSystem};

use thiserror::Error;

/// Errors raised by audio sources and devices
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV decode failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio clip is empty")]
    EmptyClip,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Synth engine error: {0}")]
    Synth(String),
}

/// One frequency-domain analysis window (one per rendered frame)
///
/// Bins are non-negative energies on the analysis source's scale
/// (`0..=source_max_energy`), ordered by frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisWindow {
    /// Energy per frequency bin
    pub bins: Vec<f32>,

    /// Frequency resolution (Hz per bin)
    pub bin_width_hz: f32,
}

impl AnalysisWindow {
    pub fn new(bins: Vec<f32>, bin_width_hz: f32) -> Self {
        Self { bins, bin_width_hz }
    }

    /// All-zero window with `len` bins
    pub fn silent(len: usize, bin_width_hz: f32) -> Self {
        Self::new(vec![0.0; len], bin_width_hz)
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }
}

/// Per-frame banded intensities, each in [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandIntensities {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl BandIntensities {
    pub const ZERO: Self = Self {
        low: 0.0,
        mid: 0.0,
        high: 0.0,
    };
}
