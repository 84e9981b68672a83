//! Window and export configuration.

use std::path::{Path, PathBuf};

/// Live window configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Compositor resolution (pixels); frames are scaled to the window
    pub frame_width: u32,

    /// Compositor resolution (pixels)
    pub frame_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            frame_width: 640,
            frame_height: 360,
        }
    }
}

/// Frame-indexed export configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Output directory for the PNG sequence
    pub output_dir: PathBuf,

    /// Frame size (pixels)
    pub frame_width: u32,

    /// Frame size (pixels)
    pub frame_height: u32,

    /// Stop after this many seconds even if audio remains
    pub max_duration_secs: Option<f32>,
}

impl RecordingConfig {
    pub fn new(output_dir: impl Into<PathBuf>, frame_width: u32, frame_height: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            frame_width,
            frame_height,
            max_duration_secs: None,
        }
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join("frames")
    }

    /// Path of one frame in the sequence
    pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("frame_{:05}.png", index))
    }

    /// Frame budget at `fps` from the duration cap, if any
    pub fn max_frames(&self, fps: f32) -> Option<u64> {
        self.max_duration_secs
            .map(|secs| (secs.max(0.0) as f64 * fps as f64).ceil() as u64)
    }
}
