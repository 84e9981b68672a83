//! Color space helpers. Hue in degrees, everything else in [0, 1].

use crate::mapping::wrap_degrees;

/// Hue/saturation/value triple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue_deg: f32,
    pub saturation: f32,
    pub value: f32,
}

pub fn rgb_to_hsv(rgb: [f32; 3]) -> Hsv {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    let hue = if chroma <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / chroma)
    } else if max == g {
        60.0 * ((b - r) / chroma + 2.0)
    } else {
        60.0 * ((r - g) / chroma + 4.0)
    };

    Hsv {
        hue_deg: wrap_hue(hue),
        saturation: if max > 0.0 { chroma / max } else { 0.0 },
        value: max,
    }
}

pub fn hsv_to_rgb(hsv: Hsv) -> [f32; 3] {
    let h = wrap_hue(hsv.hue_deg) / 60.0;
    let s = hsv.saturation.clamp(0.0, 1.0);
    let v = hsv.value.clamp(0.0, 1.0);

    let chroma = v * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - chroma;

    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [r + m, g + m, b + m]
}

/// HSL (as used for job tints) to RGB
pub fn hsl_to_rgb(hue_deg: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    // HSL -> HSV
    let value = l + s * l.min(1.0 - l);
    let saturation = if value > 0.0 {
        2.0 * (1.0 - l / value)
    } else {
        0.0
    };

    hsv_to_rgb(Hsv {
        hue_deg,
        saturation,
        value,
    })
}

/// Wrap a hue into one turn
pub fn wrap_hue(hue_deg: f32) -> f32 {
    wrap_degrees(hue_deg)
}

/// Rotate a hue, wrapping into [0, 360)
pub fn shift_hue(hue_deg: f32, shift_deg: f32) -> f32 {
    wrap_hue(hue_deg + shift_deg)
}

/// Rec. 709 luma
pub fn luma(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

/// Tint after the per-frame hue shift and boosts
pub fn recolor(tint: [f32; 3], hue_shift_deg: f32, saturation_boost: f32, value_boost: f32) -> [f32; 3] {
    let hsv = rgb_to_hsv(tint);
    hsv_to_rgb(Hsv {
        hue_deg: shift_hue(hsv.hue_deg, hue_shift_deg),
        saturation: (hsv.saturation + saturation_boost).clamp(0.0, 1.0),
        value: (hsv.value + value_boost).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_hue_wraps_the_short_way() {
        assert!((shift_hue(350.0, 30.0) - 20.0).abs() < 1e-4);
        assert!((shift_hue(10.0, -30.0) - 340.0).abs() < 1e-4);
        assert_eq!(shift_hue(0.0, 360.0), 0.0);
    }

    #[test]
    fn test_primary_conversions() {
        assert!(close(hsv_to_rgb(Hsv { hue_deg: 0.0, saturation: 1.0, value: 1.0 }), [1.0, 0.0, 0.0]));
        assert!(close(hsv_to_rgb(Hsv { hue_deg: 120.0, saturation: 1.0, value: 1.0 }), [0.0, 1.0, 0.0]));
        assert!(close(hsv_to_rgb(Hsv { hue_deg: 240.0, saturation: 1.0, value: 1.0 }), [0.0, 0.0, 1.0]));

        let hsv = rgb_to_hsv([0.0, 0.0, 1.0]);
        assert!((hsv.hue_deg - 240.0).abs() < 1e-4);
        assert_eq!(hsv.saturation, 1.0);
    }

    #[test]
    fn test_hsv_round_trip_on_tint() {
        let pink = hsl_to_rgb(330.0, 1.0, 0.65);
        let back = hsv_to_rgb(rgb_to_hsv(pink));
        assert!(close(pink, back));
        assert!((rgb_to_hsv(pink).hue_deg - 330.0).abs() < 1e-3);
    }

    #[test]
    fn test_hsl_greys_and_extremes() {
        assert!(close(hsl_to_rgb(123.0, 0.0, 0.5), [0.5, 0.5, 0.5]));
        assert!(close(hsl_to_rgb(0.0, 1.0, 1.0), [1.0, 1.0, 1.0]));
        assert!(close(hsl_to_rgb(0.0, 1.0, 0.0), [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_recolor_shifts_hue_across_zero() {
        // 350 deg + 30 deg lands on 20 deg, an orange-red
        let tint = hsv_to_rgb(Hsv { hue_deg: 350.0, saturation: 1.0, value: 1.0 });
        let shifted = recolor(tint, 30.0, 0.0, 0.0);
        assert!((rgb_to_hsv(shifted).hue_deg - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_luma_weights() {
        assert!((luma([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!(luma([0.0, 1.0, 0.0]) > luma([1.0, 0.0, 0.0]));
    }
}
