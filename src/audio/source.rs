//! Offline audio source: WAV decoding for the frame-indexed runtime.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::info;

use super::AudioError;

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,

    /// Sample rate (Hz)
    pub sample_rate_hz: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    /// Clip duration (seconds)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }

    /// Number of whole frames the clip covers at `fps`
    pub fn frame_count(&self, fps: f32) -> u64 {
        (self.duration_secs() * fps as f64).floor() as u64
    }

    /// Index one past the last sample belonging to frame `frame` at `fps`
    pub fn sample_position(&self, frame: u64, fps: f32) -> usize {
        let pos = (frame as f64 * self.sample_rate_hz as f64 / fps as f64).round() as usize;
        pos.min(self.samples.len())
    }
}

/// Decode a WAV file and downmix to mono
pub fn decode_wav(path: impl AsRef<Path>) -> Result<AudioClip, AudioError> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioError::UnsupportedFormat(format!(
            "{} channels @ {}Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{}-bit integer PCM",
                    spec.bits_per_sample
                )));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels as usize;
    let samples: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    if samples.is_empty() {
        return Err(AudioError::EmptyClip);
    }

    let clip = AudioClip::new(samples, spec.sample_rate);
    info!(
        "Audio: {} ({} ch @ {}Hz, {:.1}s)",
        path.display(),
        spec.channels,
        spec.sample_rate,
        clip.duration_secs()
    );

    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    #[test]
    fn test_frame_accounting() {
        let clip = AudioClip::new(vec![0.0; 44100 * 2], 44100);
        assert_eq!(clip.frame_count(30.0), 60);
        assert_eq!(clip.sample_position(0, 30.0), 0);
        assert_eq!(clip.sample_position(30, 30.0), 44100);
        assert_eq!(clip.sample_position(10_000, 30.0), 88200);
    }

    #[test]
    fn test_decode_stereo_int_wav_downmixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..800 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = decode_wav(&path).unwrap();
        assert_eq!(clip.sample_rate_hz, 8000);
        assert_eq!(clip.samples.len(), 800);
        assert!((clip.samples[0] - 0.5).abs() < 1e-3);
        assert!((clip.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_missing_file_is_error() {
        assert!(decode_wav("/nonexistent/clip.wav").is_err());
    }
}
