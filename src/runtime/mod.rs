//! Runtimes driving a render session.
//!
//! - [`offline`]: frame-indexed export, synchronous, one WAV per job
//! - [`live`]: continuous display, one cooperative callback per redraw

pub mod live;
pub mod offline;
mod sink;

use std::path::{Path, PathBuf};

use image::{Rgba, Rgba32FImage};
use thiserror::Error;

use crate::audio::AudioError;
use crate::compositor::{subject_from_rgba8, CompositorError};
use crate::params::ParamsError;
use crate::profile::{Environment, ProfileError};
use crate::rendering::RenderError;

// Re-export public types
pub use live::{run_live, FrameCallback, FrameLoop, LiveOptions};
pub use offline::{CancelPolicy, CancelToken, OfflineRenderer, RenderSummary};
pub use sink::{FrameSink, MemorySink, PngSequenceSink};

/// Errors surfaced by the runtimes
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Compositor(#[from] CompositorError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile resolved for {actual} cannot drive the {expected} runtime")]
    WrongEnvironment {
        expected: Environment,
        actual: Environment,
    },

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Load a subject image, or draw the built-in ring when no path is given
pub fn load_subject(path: Option<&Path>, size: u32) -> Result<Rgba32FImage, RuntimeError> {
    match path {
        Some(path) => {
            let image = image::open(path)?.to_rgba8();
            tracing::info!(
                path = %path.display(),
                width = image.width(),
                height = image.height(),
                "Loaded subject"
            );
            Ok(subject_from_rgba8(&image))
        }
        None => Ok(ring_subject(size.max(1))),
    }
}

/// White anti-aliased ring on transparent background
pub fn ring_subject(size: u32) -> Rgba32FImage {
    let center = size as f32 / 2.0;
    let outer = size as f32 * 0.42;
    let inner = size as f32 * 0.30;

    Rgba32FImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let r = (dx * dx + dy * dy).sqrt();

        // One-pixel soft edges on both rims
        let alpha = ((outer - r).clamp(0.0, 1.0)) * ((r - inner).clamp(0.0, 1.0));
        Rgba([1.0, 1.0, 1.0, alpha])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_subject_shape() {
        let ring = ring_subject(64);
        // Center and corners are empty, the rim is opaque
        assert_eq!(ring.get_pixel(32, 32).0[3], 0.0);
        assert_eq!(ring.get_pixel(0, 0).0[3], 0.0);
        assert_eq!(ring.get_pixel(32, 32 + 23).0[3], 1.0);
    }

    #[test]
    fn test_missing_subject_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_subject(Some(&dir.path().join("missing.png")), 64);
        assert!(matches!(result, Err(RuntimeError::Image(_))));
    }
}
