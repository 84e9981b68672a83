//! Live audio: synth playback or device capture, analysed on a background
//! thread. The render loop polls the newest analysis window once per frame.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{info, warn};

use super::fft::spawn_fft_thread;
use super::synthesis::GLICOL_COMPOSITION;
use super::{AnalysisWindow, AudioError};
use crate::params::{audio_constants::BLOCK_SIZE, AnalysisConfig};
use crate::profile::Profile;

/// Where live audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioInput {
    /// Play the built-in glicol composition and analyse it
    Synth,

    /// Capture the default input device
    Device,
}

/// Audio system feeding the continuous runtime
pub struct AudioSystem {
    /// Newest analysis window (written by the FFT thread)
    latest: Arc<Mutex<AnalysisWindow>>,

    /// Audio stream (kept alive)
    _stream: cpal::Stream,

    /// FFT analysis thread handle, joined on drop
    fft_thread: Option<thread::JoinHandle<()>>,

    /// Set to stop the FFT thread
    stop: Arc<AtomicBool>,
}

impl AudioSystem {
    /// Open the audio device, start the stream and the analysis thread
    pub fn start(
        input: AudioInput,
        profile: &Profile,
        update_interval_ms: u64,
    ) -> Result<Self, AudioError> {
        let sample_buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let host = cpal::default_host();

        let (stream, sample_rate) = match input {
            AudioInput::Synth => build_synth_stream(&host, Arc::clone(&sample_buffer))?,
            AudioInput::Device => build_capture_stream(&host, Arc::clone(&sample_buffer))?,
        };

        stream
            .play()
            .map_err(|e| AudioError::Device(format!("Failed to start audio stream: {}", e)))?;

        let config = AnalysisConfig::from_profile(profile, sample_rate, update_interval_ms);
        config
            .validate()
            .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

        let bin_width = config.bin_width_hz();
        let latest = Arc::new(Mutex::new(AnalysisWindow::silent(
            config.fft_size / 2,
            bin_width,
        )));
        let stop = Arc::new(AtomicBool::new(false));
        let fft_thread = spawn_fft_thread(
            config,
            sample_buffer,
            Arc::clone(&latest),
            Arc::clone(&stop),
        );

        Ok(Self {
            latest,
            _stream: stream,
            fft_thread: Some(fft_thread),
            stop,
        })
    }

    /// Newest analysis window; silence if the analysis thread is unavailable
    pub fn latest_window(&self) -> AnalysisWindow {
        match self.latest.lock() {
            Ok(window) => window.clone(),
            Err(_) => AnalysisWindow::default(),
        }
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.fft_thread.take() {
            if handle.join().is_err() {
                warn!("FFT thread panicked");
            }
        }
    }
}

fn build_synth_stream(
    host: &cpal::Host,
    sample_buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::Device("No audio output device found".to_string()))?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Device(format!("Failed to get audio config: {}", e)))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    info!(
        "Audio (synth): {} @ {}Hz",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate
    );

    let mut engine = Engine::<BLOCK_SIZE>::new();
    engine.set_sr(sample_rate as usize);
    engine.update_with_code(GLICOL_COMPOSITION);
    engine
        .update()
        .map_err(|e| AudioError::Synth(format!("{:?}", e)))?;

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames_needed = data.len() / channels.max(1);
                let mut frame_idx = 0;
                let mut captured = Vec::with_capacity(frames_needed);

                // Generate multiple blocks if needed to fill the entire buffer
                while frame_idx < frames_needed {
                    let (buffers, _) = engine.next_block(vec![]);
                    let samples_to_copy = (frames_needed - frame_idx).min(BLOCK_SIZE);

                    for i in 0..samples_to_copy {
                        // Safety limiter: hard clip to ±0.5
                        let left = buffers[0][i].clamp(-0.5, 0.5);
                        let right = buffers[1][i].clamp(-0.5, 0.5);

                        let out_idx = (frame_idx + i) * channels;
                        for c in 0..channels {
                            data[out_idx + c] = if c % 2 == 0 { left } else { right };
                        }
                        captured.push(0.5 * (left + right));
                    }

                    frame_idx += samples_to_copy;
                }

                if let Ok(mut buf) = sample_buffer.lock() {
                    buf.extend_from_slice(&captured);
                }
            },
            |err| warn!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Device(format!("Failed to build audio stream: {}", e)))?;

    Ok((stream, sample_rate))
}

fn build_capture_stream(
    host: &cpal::Host,
    sample_buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::Device("No audio input device found".to_string()))?;

    let config = device
        .default_input_config()
        .map_err(|e| AudioError::Device(format!("Failed to get input config: {}", e)))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    info!(
        "Audio (capture): {} @ {}Hz, {} ch",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate,
        channels
    );

    let stream = device
        .build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let Ok(mut buf) = sample_buffer.lock() else {
                    return;
                };
                // Downmix interleaved frames to mono
                buf.extend(
                    data.chunks_exact(channels.max(1))
                        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                );
            },
            |err| warn!("Audio capture error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Device(format!("Failed to build capture stream: {}", e)))?;

    Ok((stream, sample_rate))
}
