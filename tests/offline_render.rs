//! End-to-end export: WAV on disk in, PNG sequence on disk out.

use std::f32::consts::TAU;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use pulsetrail::audio::decode_wav;
use pulsetrail::params::{JobParams, RecordingConfig};
use pulsetrail::profile::{presets, Environment};
use pulsetrail::runtime::{
    ring_subject, CancelPolicy, CancelToken, OfflineRenderer, PngSequenceSink,
};

/// One second of 55 Hz kick-like bursts at 8 kHz, 16-bit mono
fn write_kick_wav(path: &Path) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..8000 {
        let t = i as f32 / 8000.0;
        let envelope = (-(t * 4.0).fract() * 12.0).exp();
        let sample = (TAU * 55.0 * t).sin() * envelope * 0.8;
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn renderer(recording: &RecordingConfig) -> OfflineRenderer {
    let profile = presets::legacy_server()
        .resolve(Environment::FrameIndexed)
        .unwrap();
    let max_frames = recording.max_frames(profile.target_frame_rate);
    OfflineRenderer::new(
        profile,
        JobParams::from_raw(4, 330.0, 100.0, 65.0).unwrap(),
        ring_subject(18),
        recording.frame_width,
        recording.frame_height,
    )
    .unwrap()
    .with_max_frames(max_frames)
}

#[test]
fn test_wav_renders_to_png_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("kick.wav");
    write_kick_wav(&wav);

    let recording = RecordingConfig::new(dir.path().join("out"), 32, 18);
    let clip = decode_wav(&wav).unwrap();
    let mut sink = PngSequenceSink::new(recording.frames_dir()).unwrap();

    let summary = renderer(&recording)
        .render(&clip, &mut sink, &CancelToken::new(), CancelPolicy::Flush)
        .unwrap();

    assert_eq!(summary.frames_rendered, 30);
    assert!(!summary.cancelled);
    assert_eq!(sink.written().len(), 30);

    let last = RecordingConfig::frame_path(&recording.frames_dir(), 29);
    let frame = image::open(&last).unwrap().to_rgba8();
    assert_eq!(frame.dimensions(), (32, 18));
    assert!(frame.pixels().all(|p| p.0[3] == 255));
}

#[test]
fn test_duration_cap_limits_frames() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("kick.wav");
    write_kick_wav(&wav);

    let mut recording = RecordingConfig::new(dir.path().join("out"), 16, 9);
    recording.max_duration_secs = Some(0.5);

    let clip = decode_wav(&wav).unwrap();
    let mut sink = PngSequenceSink::new(recording.frames_dir()).unwrap();
    let summary = renderer(&recording)
        .render(&clip, &mut sink, &CancelToken::new(), CancelPolicy::Flush)
        .unwrap();

    assert_eq!(summary.frames_rendered, 15);
    assert!(!RecordingConfig::frame_path(&recording.frames_dir(), 15).exists());
}

#[test]
fn test_cancelled_before_start_discards_nothing_written() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("kick.wav");
    write_kick_wav(&wav);

    let recording = RecordingConfig::new(dir.path().join("out"), 16, 9);
    let clip = decode_wav(&wav).unwrap();
    let mut sink = PngSequenceSink::new(recording.frames_dir()).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let summary = renderer(&recording)
        .render(&clip, &mut sink, &token, CancelPolicy::Discard)
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_rendered, 0);
    assert_eq!(summary.frames_planned, 30);
    assert_eq!(std::fs::read_dir(recording.frames_dir()).unwrap().count(), 0);
}
