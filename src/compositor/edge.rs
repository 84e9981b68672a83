//! Edge accent: Sobel gradient magnitude over a single-channel plane.

/// Largest Sobel response to a unit step
const SOBEL_NORM: f32 = 4.0;

/// Gradient magnitude at (x, y), normalized so a hard 0 to 1 edge reads 1.0.
/// Samples beyond the border repeat the edge pixel.
pub fn sobel(plane: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    if width == 0 || height == 0 || plane.len() < width * height {
        return 0.0;
    }

    let at = |dx: isize, dy: isize| -> f32 {
        let sx = (x as isize + dx).clamp(0, width as isize - 1) as usize;
        let sy = (y as isize + dy).clamp(0, height as isize - 1) as usize;
        plane[sy * width + sx]
    };

    let gx = (at(1, -1) + 2.0 * at(1, 0) + at(1, 1)) - (at(-1, -1) + 2.0 * at(-1, 0) + at(-1, 1));
    let gy = (at(-1, 1) + 2.0 * at(0, 1) + at(1, 1)) - (at(-1, -1) + 2.0 * at(0, -1) + at(1, -1));

    ((gx * gx + gy * gy).sqrt() / SOBEL_NORM).min(1.0)
}
