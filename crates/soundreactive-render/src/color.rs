//! HSV conversion and color grading

use crate::frame::to_u8;
use image::{Rgb, RgbImage};

/// RGB (0-255) to HSV with hue in degrees `[0, 360)` and saturation/value in `[0, 1]`
pub fn rgb_to_hsv(p: [u8; 3]) -> [f32; 3] {
    let r = p[0] as f32 / 255.0;
    let g = p[1] as f32 / 255.0;
    let b = p[2] as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= 0.0 { 0.0 } else { delta / max };
    [hue, saturation, max]
}

/// Inverse of [`rgb_to_hsv`]
pub fn hsv_to_rgb(hsv: [f32; 3]) -> [u8; 3] {
    let [h, s, v] = hsv;
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        to_u8((r + m) * 255.0),
        to_u8((g + m) * 255.0),
        to_u8((b + m) * 255.0),
    ]
}

/// HSV value (brightness) of a pixel, 0-255
#[inline]
pub fn value(p: &Rgb<u8>) -> u8 {
    p.0[0].max(p.0[1]).max(p.0[2])
}

/// Rotate hue by `hue_shift` degrees, then scale saturation and value, clamping both.
///
/// `(0, 1, 1)` returns the frame untouched.
pub fn color_grade(frame: &RgbImage, hue_shift: f32, saturation: f32, brightness: f32) -> RgbImage {
    if hue_shift == 0.0 && saturation == 1.0 && brightness == 1.0 {
        return frame.clone();
    }
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        let [h, s, v] = rgb_to_hsv(p.0);
        p.0 = hsv_to_rgb([
            h + hue_shift,
            (s * saturation).clamp(0.0, 1.0),
            (v * brightness).clamp(0.0, 1.0),
        ]);
    }
    out
}

/// Scale saturation only
pub fn scale_saturation(frame: &RgbImage, factor: f32) -> RgbImage {
    color_grade(frame, 0.0, factor, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0.0, 1.0, 1.0]);
        assert_eq!(rgb_to_hsv([0, 255, 0])[0], 120.0);
        assert_eq!(rgb_to_hsv([0, 0, 255])[0], 240.0);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_hsv_round_trip() {
        for p in [[12u8, 200, 77], [255, 255, 255], [3, 2, 1], [90, 90, 200]] {
            assert_eq!(hsv_to_rgb(rgb_to_hsv(p)), p);
        }
    }

    #[test]
    fn test_hue_shift_wraps() {
        let frame = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        let shifted = color_grade(&frame, 480.0, 1.0, 1.0);
        assert_eq!(shifted.get_pixel(0, 0).0, [0, 255, 0]);
    }

    #[test]
    fn test_brightness_clamps() {
        let frame = RgbImage::from_pixel(1, 1, Rgb([200, 100, 50]));
        let bright = color_grade(&frame, 0.0, 1.0, 2.0);
        assert_eq!(bright.get_pixel(0, 0).0[0], 255);
        let desaturated = scale_saturation(&frame, 0.0);
        let p = desaturated.get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }
}
