//! Ping-pong trail buffer: two equal-size halves and a parity index.

use image::Rgba32FImage;

use super::CompositorError;

/// Pair of trail images. Half `index` is read, the other half is written.
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    halves: [Rgba32FImage; 2],
}

impl TrailBuffer {
    /// Allocate both halves, cleared to transparent black
    pub fn new(width: u32, height: u32) -> Result<Self, CompositorError> {
        Ok(Self {
            halves: [alloc_image(width, height)?, alloc_image(width, height)?],
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.halves[0].dimensions()
    }

    /// Read half and write half for a parity index
    pub fn split(&mut self, index: usize) -> (&Rgba32FImage, &mut Rgba32FImage) {
        let (first, second) = self.halves.split_at_mut(1);
        if index & 1 == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    pub fn half(&self, index: usize) -> &Rgba32FImage {
        &self.halves[index & 1]
    }
}

/// Allocate a zeroed f32 RGBA image, failing instead of aborting on OOM
pub fn alloc_image(width: u32, height: u32) -> Result<Rgba32FImage, CompositorError> {
    if width == 0 || height == 0 {
        return Err(CompositorError::EmptyFrame { width, height });
    }

    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(CompositorError::Allocation { bytes: usize::MAX })?;

    let mut data: Vec<f32> = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| CompositorError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<f32>()),
        })?;
    data.resize(len, 0.0);

    Rgba32FImage::from_raw(width, height, data).ok_or(CompositorError::Allocation {
        bytes: len.saturating_mul(std::mem::size_of::<f32>()),
    })
}
