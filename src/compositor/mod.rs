//! Stateful feedback compositor.
//!
//! Each frame reads the previous trail from one half of the ping-pong buffer,
//! decays it, adds the transformed and recolored subject plus an edge accent,
//! optionally inverts, and writes the result to the other half and to the
//! visible frame. The parity index lives in [`RenderState`] and is toggled
//! here, after the mapper has run.

mod color;
mod edge;
mod trail;
mod warp;

use glam::{Mat2, Vec2};
use image::{Rgba, Rgba32FImage, RgbaImage};
use thiserror::Error;

use crate::mapping::{FrameParams, RenderState};
use crate::params::JobParams;
use crate::profile::Profile;

// Re-export public types
pub use color::{hsl_to_rgb, hsv_to_rgb, luma, recolor, rgb_to_hsv, shift_hue, wrap_hue, Hsv};
pub use edge::sobel;
pub use trail::{alloc_image, TrailBuffer};
pub use warp::{DistortionType, Warp};

/// Compositor setup and allocation errors
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("Frame size must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Subject image is empty")]
    EmptySubject,

    #[error("Subject size changed from {expected:?} to {actual:?}")]
    SubjectSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to allocate {bytes} bytes of frame memory")]
    Allocation { bytes: usize },
}

/// Look constants the compositor reads from the profile
#[derive(Debug, Clone, Copy)]
struct LookSettings {
    warp_amplitude: f32,
    glow_strength: f32,
    edge_strength: f32,
    saturation_boost: f32,
    value_boost: f32,
    invert_luma_floor: f32,
}

/// Feedback compositor for one session
#[derive(Debug)]
pub struct Compositor {
    width: u32,
    height: u32,

    /// Pre-rasterized subject, linear RGBA in [0, 1]
    subject: Rgba32FImage,

    /// Base trail tint (linear RGB)
    tint: [f32; 3],

    warp: Warp,
    look: LookSettings,
    trail: TrailBuffer,

    /// Transformed subject coverage (alpha * luma), one value per pixel
    coverage: Vec<f32>,

    /// Visible frame
    output: Rgba32FImage,
}

impl Compositor {
    /// Allocate every buffer up front; compositing never allocates
    pub fn new(
        width: u32,
        height: u32,
        subject: Rgba32FImage,
        job: &JobParams,
        profile: &Profile,
    ) -> Result<Self, CompositorError> {
        if subject.width() == 0 || subject.height() == 0 {
            return Err(CompositorError::EmptySubject);
        }

        let trail = TrailBuffer::new(width, height)?;
        let output = alloc_image(width, height)?;

        let pixels = width as usize * height as usize;
        let mut coverage = Vec::new();
        coverage
            .try_reserve_exact(pixels)
            .map_err(|_| CompositorError::Allocation {
                bytes: pixels.saturating_mul(std::mem::size_of::<f32>()),
            })?;
        coverage.resize(pixels, 0.0);

        tracing::debug!(
            width,
            height,
            distortion = job.distortion.name(),
            "Compositor allocated"
        );

        Ok(Self {
            width,
            height,
            subject,
            tint: job.tint.to_rgb(),
            warp: Warp::new(job.distortion),
            look: LookSettings {
                warp_amplitude: profile.warp_amplitude,
                glow_strength: profile.glow_strength,
                edge_strength: profile.edge_strength,
                saturation_boost: profile.saturation_boost,
                value_boost: profile.value_boost,
                invert_luma_floor: profile.invert_luma_floor,
            },
            trail,
            coverage,
            output,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn distortion(&self) -> DistortionType {
        self.warp.kind()
    }

    /// Swap in a new subject of the same size
    pub fn replace_subject(&mut self, subject: Rgba32FImage) -> Result<(), CompositorError> {
        if subject.dimensions() != self.subject.dimensions() {
            return Err(CompositorError::SubjectSizeMismatch {
                expected: self.subject.dimensions(),
                actual: subject.dimensions(),
            });
        }
        self.subject = subject;
        Ok(())
    }

    /// Most recent frame
    pub fn frame(&self) -> &Rgba32FImage {
        &self.output
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    /// Composite one frame and toggle the trail parity
    pub fn composite(&mut self, params: &FrameParams, state: &mut RenderState) -> &Rgba32FImage {
        let (w, h) = (self.width as usize, self.height as usize);

        self.transform_subject(params);

        let color = recolor(
            self.tint,
            params.hue_shift_degrees,
            self.look.saturation_boost,
            self.look.value_boost,
        );
        let glow = 1.0 + params.glow_intensity.max(0.0) * self.look.glow_strength;
        let decay = params.trail_decay.max(0.0);

        let Self {
            trail,
            output,
            coverage,
            look,
            ..
        } = self;

        let (read, write) = trail.split(state.trail_buffer_index);
        let previous: &[f32] = read;
        let next: &mut [f32] = write;
        let visible: &mut [f32] = output;

        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let px = i * 4;

                let cover = coverage[i];
                let edge = sobel(coverage, w, h, x, y) * look.edge_strength;

                let mut rgb = [0.0f32; 3];
                for c in 0..3 {
                    rgb[c] = previous[px + c] * decay + color[c] * (cover * glow + edge);
                }

                if params.invert && luma(rgb) > look.invert_luma_floor {
                    for v in &mut rgb {
                        *v = 1.0 - v.clamp(0.0, 1.0);
                    }
                }

                let pixel = [rgb[0], rgb[1], rgb[2], 1.0];
                next[px..px + 4].copy_from_slice(&pixel);
                visible[px..px + 4].copy_from_slice(&pixel);
            }
        }

        state.trail_buffer_index ^= 1;
        &self.output
    }

    /// Rotate, scale and warp the subject into the coverage plane
    fn transform_subject(&mut self, params: &FrameParams) {
        let (w, h) = (self.width as usize, self.height as usize);
        let aspect = self.width as f32 / self.height as f32;

        // Inverse transform: frame point -> subject point
        let unrotate = Mat2::from_angle(-params.rotation_degrees.to_radians());
        let inv_scale = if params.scale > f32::EPSILON {
            1.0 / params.scale
        } else {
            0.0
        };
        let amplitude = self.look.warp_amplitude * (1.0 + params.distortion_intensity);

        for y in 0..h {
            for x in 0..w {
                // Centered, aspect-corrected: y in [-0.5, 0.5]
                let p = Vec2::new(
                    ((x as f32 + 0.5) / w as f32 - 0.5) * aspect,
                    (y as f32 + 0.5) / h as f32 - 0.5,
                );
                let p = self.warp.apply(p, params.distortion_clock, amplitude);
                let q = unrotate * p * inv_scale;

                let u = q.x / aspect + 0.5;
                let v = q.y + 0.5;

                let [r, g, b, a] = sample_bilinear(&self.subject, u, v);
                self.coverage[y * w + x] = (a * luma([r, g, b])).clamp(0.0, 1.0);
            }
        }
    }
}

/// Bilinear sample at normalized coordinates; transparent outside [0, 1]
fn sample_bilinear(image: &Rgba32FImage, u: f32, v: f32) -> [f32; 4] {
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return [0.0; 4];
    }

    let (w, h) = image.dimensions();
    let fx = (u * w as f32 - 0.5).clamp(0.0, (w - 1) as f32);
    let fy = (v * h as f32 - 0.5).clamp(0.0, (h - 1) as f32);

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let mut out = [0.0; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * tx;
        let bottom = p01[c] + (p11[c] - p01[c]) * tx;
        out[c] = top + (bottom - top) * ty;
    }
    out
}

/// Convert an 8-bit subject to linear f32
pub fn subject_from_rgba8(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0;
        Rgba(p.map(|c| c as f32 / 255.0))
    })
}

/// Quantize a composited frame for display or encoding (clamped to [0, 1])
pub fn frame_to_rgba8(frame: &Rgba32FImage) -> RgbaImage {
    RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        Rgba(p.map(|c| {
            let c = if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 };
            (c * 255.0).round() as u8
        }))
    })
}
