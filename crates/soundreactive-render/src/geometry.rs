//! Geometric transforms: zoom, rotation, resizing and letterboxing

use crate::frame::{remap, sample_bilinear, to_u8, Border};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Below this many degrees a rotation is skipped
pub const MIN_ROTATION_DEGREES: f32 = 0.01;

/// Center-crop `floor(h / factor) x floor(w / factor)` and scale back up.
///
/// Factors `<= 1.0` return the frame unchanged.
pub fn zoom(frame: &RgbImage, factor: f32) -> RgbImage {
    if factor.is_nan() || factor <= 1.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let crop_w = ((w as f32 / factor) as u32).max(1);
    let crop_h = ((h as f32 / factor) as u32).max(1);
    let x0 = (w - crop_w) / 2;
    let y0 = (h - crop_h) / 2;
    let cropped = imageops::crop_imm(frame, x0, y0, crop_w, crop_h).to_image();
    resize_bilinear(&cropped, w, h)
}

/// Rotate about the integer center `(w / 2, h / 2)` with a reflected border.
///
/// Positive angles turn the picture counter-clockwise.
pub fn rotate(frame: &RgbImage, degrees: f32) -> RgbImage {
    if degrees.abs() < MIN_ROTATION_DEGREES {
        return frame.clone();
    }
    let center = ((frame.width() / 2) as f32, (frame.height() / 2) as f32);
    rotate_about(frame, center, degrees, Border::Reflect)
}

/// Rotate about an arbitrary center with the given border mode
pub fn rotate_about(frame: &RgbImage, center: (f32, f32), degrees: f32, border: Border) -> RgbImage {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = center;
    remap(frame, border, |x, y| inverse_rotation(x, y, cx, cy, cos, sin))
}

/// Source position of destination pixel `(x, y)` for a rotation by `(cos, sin)`
#[inline]
pub(crate) fn inverse_rotation(x: f32, y: f32, cx: f32, cy: f32, cos: f32, sin: f32) -> (f32, f32) {
    let dx = x - cx;
    let dy = y - cy;
    (cx + cos * dx - sin * dy, cy + sin * dx + cos * dy)
}

/// Sample one rotated pixel without materializing the whole rotated frame
#[inline]
pub(crate) fn rotated_pixel(
    frame: &RgbImage,
    x: u32,
    y: u32,
    center: (f32, f32),
    cos: f32,
    sin: f32,
    border: Border,
) -> Rgb<u8> {
    let (sx, sy) = inverse_rotation(x as f32, y as f32, center.0, center.1, cos, sin);
    let p = sample_bilinear(frame, sx, sy, border);
    Rgb([to_u8(p[0]), to_u8(p[1]), to_u8(p[2])])
}

/// Bilinear resize
pub fn resize_bilinear(frame: &RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    imageops::resize(frame, width, height, FilterType::Triangle)
}

/// Nearest-neighbor resize; destination pixel `x` reads source `floor(x * w / width)`
pub fn resize_nearest(frame: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if (w, h) == (width, height) || w == 0 || h == 0 {
        return imageops::resize(frame, width, height, FilterType::Nearest);
    }
    RgbImage::from_fn(width, height, |x, y| {
        let sx = (x as u64 * w as u64 / width as u64) as u32;
        let sy = (y as u64 * h as u64 / height as u64) as u32;
        *frame.get_pixel(sx.min(w - 1), sy.min(h - 1))
    })
}

/// Scale to fit inside `width x height` keeping the aspect ratio, centered on black
pub fn fit_letterbox(frame: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if (w, h) == (width, height) {
        return frame.clone();
    }
    let mut canvas = RgbImage::new(width, height);
    if w == 0 || h == 0 || width == 0 || height == 0 {
        return canvas;
    }
    let scale = (width as f32 / w as f32).min(height as f32 / h as f32);
    let new_w = ((w as f32 * scale) as u32).clamp(1, width);
    let new_h = ((h as f32 * scale) as u32).clamp(1, height);
    let resized = imageops::resize(frame, new_w, new_h, FilterType::Lanczos3);
    let x = (width - new_w) / 2;
    let y = (height - new_h) / 2;
    imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 255 / w) as u8, (y * 255 / h) as u8, 128]))
    }

    #[test]
    fn test_zoom_neutral_is_identity() {
        let frame = gradient(16, 9);
        assert_eq!(zoom(&frame, 1.0), frame);
        assert_eq!(zoom(&frame, 0.5), frame);
    }

    #[test]
    fn test_zoom_keeps_size_and_center() {
        let mut frame = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        for y in 8..12 {
            for x in 8..12 {
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let zoomed = zoom(&frame, 2.0);
        assert_eq!(zoomed.dimensions(), (20, 20));
        assert_eq!(zoomed.get_pixel(10, 10).0, [255, 255, 255]);
        assert_eq!(zoomed.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_small_rotation_is_identity() {
        let frame = gradient(8, 8);
        assert_eq!(rotate(&frame, 0.005), frame);
    }

    #[test]
    fn test_rotation_is_counter_clockwise() {
        // A bright pixel right of center moves above center under +90 degrees
        let mut frame = RgbImage::new(11, 11);
        frame.put_pixel(8, 5, Rgb([255, 0, 0]));
        let rotated = rotate_about(&frame, (5.0, 5.0), 90.0, Border::Replicate);
        assert_eq!(rotated.get_pixel(5, 2).0[0], 255);
        assert_eq!(rotated.get_pixel(8, 5).0[0], 0);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let frame = gradient(9, 7);
        let rotated = rotate_about(&frame, (4.0, 3.0), 360.0, Border::Reflect);
        for (a, b) in rotated.pixels().zip(frame.pixels()) {
            for c in 0..3 {
                assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_letterbox_wide_image() {
        let frame = RgbImage::from_pixel(40, 10, Rgb([200, 200, 200]));
        let boxed = fit_letterbox(&frame, 40, 40);
        assert_eq!(boxed.dimensions(), (40, 40));
        assert_eq!(boxed.get_pixel(20, 0).0, [0, 0, 0]);
        assert_eq!(boxed.get_pixel(20, 39).0, [0, 0, 0]);
        let center = boxed.get_pixel(20, 20).0;
        assert!(center[0] > 150);
    }
}
