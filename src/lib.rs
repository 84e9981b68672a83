//! Pulsetrail library - Audio-reactive trail compositor
//!
//! One frame: audio window -> banded intensities -> smoothing -> frame
//! parameters -> composite into a ping-pong trail buffer. The same
//! pipeline runs live (wall-clock milliseconds) and offline (frame
//! indices), with profiles keeping the two in step.

pub mod audio;
pub mod cli;
pub mod clock;
pub mod compositor;
pub mod mapping;
pub mod params;
pub mod profile;
pub mod rendering;
pub mod runtime;
pub mod session;
