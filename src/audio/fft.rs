//! Spectrum analysis: sample block -> analysis window.
//!
//! Magnitudes are mapped to decibels and then linearly onto
//! `[0, source_max_energy]` between the profile's decibel bounds, the same
//! "byte frequency data" scale the live analyser reports.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::AnalysisWindow;
use crate::params::AnalysisConfig;

/// Windowed FFT analyzer producing one [`AnalysisWindow`] per call
pub struct SpectrumAnalyzer {
    config: AnalysisConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let window = hann_table(config.fft_size);

        debug!(
            "SpectrumAnalyzer: sample_rate={}Hz fft_size={} dB range [{}, {}]",
            config.sample_rate_hz, config.fft_size, config.min_decibels, config.max_decibels
        );

        Self {
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse the most recent `fft_size` samples of `samples`.
    ///
    /// Shorter input is zero-padded at the front; non-finite samples count as
    /// silence.
    pub fn analyze(&mut self, samples: &[f32]) -> AnalysisWindow {
        let size = self.config.fft_size;
        let tail = &samples[samples.len().saturating_sub(size)..];
        let pad = size - tail.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let bins = self.buffer[..size / 2]
            .iter()
            .map(|c| self.to_energy(c.norm() / size as f32))
            .collect();

        AnalysisWindow::new(bins, self.config.bin_width_hz())
    }

    /// Magnitude -> dB -> `[0, source_max_energy]`
    fn to_energy(&self, magnitude: f32) -> f32 {
        let AnalysisConfig {
            min_decibels,
            max_decibels,
            source_max_energy,
            ..
        } = self.config;

        if magnitude <= 0.0 || !magnitude.is_finite() || max_decibels <= min_decibels {
            return 0.0;
        }

        let db = 20.0 * magnitude.log10();
        let t = ((db - min_decibels) / (max_decibels - min_decibels)).clamp(0.0, 1.0);
        t * source_max_energy
    }
}

/// Spawn the live analysis thread.
///
/// Every `update_interval_ms` the newest `fft_size` samples are analysed and
/// published to `latest`; half the buffer is drained for 50% overlap. The
/// thread exits once `stop` is set, or when the sample buffer is poisoned.
pub fn spawn_fft_thread(
    config: AnalysisConfig,
    sample_buffer: Arc<Mutex<Vec<f32>>>,
    latest: Arc<Mutex<AnalysisWindow>>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let interval = Duration::from_millis(config.update_interval_ms);
        let fft_size = config.fft_size;
        let mut analyzer = SpectrumAnalyzer::new(config);
        let mut block = Vec::with_capacity(fft_size);
        let mut windows: u64 = 0;

        while !stop.load(Ordering::Acquire) {
            thread::sleep(interval);

            {
                let Ok(mut samples) = sample_buffer.lock() else {
                    warn!("Sample buffer poisoned, stopping analysis thread");
                    break;
                };
                if samples.len() < fft_size {
                    continue;
                }

                // Keep the newest samples; drop any backlog beyond one window
                let excess = samples.len() - fft_size;
                samples.drain(..excess);
                block.clear();
                block.extend_from_slice(&samples);
                samples.drain(..fft_size / 2);
            }

            let window = analyzer.analyze(&block);
            if let Ok(mut slot) = latest.lock() {
                *slot = window;
            }

            windows += 1;
            if windows % 200 == 0 {
                trace!("fft thread: {} windows analysed", windows);
            }
        }

        debug!("fft thread stopped after {} windows", windows);
    })
}

/// Symmetric Hann taper of `size` points
fn hann_table(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let span = (size - 1) as f32;
    (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / span;
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate_hz: 44100,
            fft_size: 2048,
            update_interval_ms: 16,
            min_decibels: -100.0,
            max_decibels: -30.0,
            source_max_energy: 255.0,
        }
    }

    #[test]
    fn test_hann_table_tapers_to_zero_and_is_symmetric() {
        let table = hann_table(9);

        assert_eq!(table.len(), 9);
        assert!(table[0].abs() < 1e-6 && table[8].abs() < 1e-6);
        assert!((table[4] - 1.0).abs() < 1e-6);
        for i in 0..9 {
            assert!((table[i] - table[8 - i]).abs() < 1e-6);
        }

        // Coherent gain of a Hann window is one half
        let gain = hann_table(2048).iter().sum::<f32>() / 2048.0;
        assert!((gain - 0.5).abs() < 1e-3);

        assert_eq!(hann_table(1), vec![1.0]);
        assert!(hann_table(0).is_empty());
    }

    fn spawn(
        sample_buffer: &Arc<Mutex<Vec<f32>>>,
    ) -> (Arc<Mutex<AnalysisWindow>>, Arc<AtomicBool>, thread::JoinHandle<()>) {
        let mut cfg = config();
        cfg.update_interval_ms = 1;
        let latest = Arc::new(Mutex::new(AnalysisWindow::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_fft_thread(
            cfg,
            Arc::clone(sample_buffer),
            Arc::clone(&latest),
            Arc::clone(&stop),
        );
        (latest, stop, handle)
    }

    #[test]
    fn test_fft_thread_publishes_and_stops_on_request() {
        let sample_buffer = Arc::new(Mutex::new(vec![0.25f32; 4096]));
        let (latest, stop, handle) = spawn(&sample_buffer);

        // Wait for the first published window
        for _ in 0..2000 {
            if !latest.lock().unwrap().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(latest.lock().unwrap().len(), 1024);

        stop.store(true, Ordering::Release);
        handle.join().unwrap();

        // The thread released its handles to both buffers
        assert_eq!(Arc::strong_count(&sample_buffer), 1);
        assert_eq!(Arc::strong_count(&latest), 1);
    }

    #[test]
    fn test_fft_thread_exits_on_poisoned_buffer() {
        let sample_buffer = Arc::new(Mutex::new(Vec::<f32>::new()));

        let poisoner = Arc::clone(&sample_buffer);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the sample buffer");
        })
        .join();
        assert!(sample_buffer.is_poisoned());

        // Never asked to stop: it must leave on its own
        let (_latest, stop, handle) = spawn(&sample_buffer);
        handle.join().unwrap();
        assert!(!stop.load(Ordering::Acquire));
    }

    #[test]
    fn test_silence_produces_zero_window() {
        let mut analyzer = SpectrumAnalyzer::new(config());
        let window = analyzer.analyze(&[0.0; 2048]);

        assert_eq!(window.len(), 1024);
        assert!(window.bins.iter().all(|&e| e == 0.0));
        assert!((window.bin_width_hz - 44100.0 / 2048.0).abs() < 1e-4);
    }

    #[test]
    fn test_sine_peaks_in_its_bin() {
        let cfg = config();
        let mut analyzer = SpectrumAnalyzer::new(cfg.clone());

        let freq = 1000.0;
        let samples: Vec<f32> = (0..cfg.fft_size)
            .map(|i| (2.0 * PI * freq * i as f32 / cfg.sample_rate_hz as f32).sin() * 0.5)
            .collect();

        let window = analyzer.analyze(&samples);
        let peak = window
            .bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        let expected = (freq / window.bin_width_hz).round() as usize;
        assert!(peak.abs_diff(expected) <= 1, "peak {peak}, expected {expected}");
        assert!(window.bins[peak] <= cfg.source_max_energy);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(config());
        let window = analyzer.analyze(&[0.1; 100]);
        assert_eq!(window.len(), 1024);
        assert!(window.bins.iter().all(|e| e.is_finite()));
    }
}
