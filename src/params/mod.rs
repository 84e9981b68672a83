//! Parameter definitions with physical units and documented semantics.
//!
//! Units ride in field names (`_hz`, `_ms`, `_deg`, `_pct`). Tunable look
//! constants live in profiles; this module holds per-job and per-run settings.

mod audio;
mod job;
mod render;

use thiserror::Error;

// Re-export all types
pub use audio::{audio_constants, AnalysisConfig};
pub use job::{JobParams, TintColor};
pub use render::{RecordingConfig, RenderConfig};

/// Invalid job or run parameters
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Unknown distortion type {0} (expected 0-5)")]
    UnknownDistortion(u8),

    #[error("Tint out of range: {0}")]
    Tint(String),

    #[error("Invalid analysis config: {0}")]
    Analysis(String),
}
