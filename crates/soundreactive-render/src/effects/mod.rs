//! Intensity-driven frame effects
//!
//! Every effect takes an intensity in `[0, 1]` and returns the input
//! unchanged at zero. Randomized effects draw from the generator passed in.

pub mod artistic;
pub mod corruption;
pub mod retro;
pub mod stylize;

pub use artistic::{kaleidoscope, pixel_sort, wave_distortion};
pub use corruption::{artifacts, data_corruption, glitch};
pub use retro::{crt_scan_lines, vhs};
pub use stylize::{edge_overlay, posterize};

use crate::filter::gaussian_blur;
use image::RgbImage;

/// Gaussian blur with kernel size `int(1 + intensity * 15)`, forced odd
pub fn blur(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let mut ksize = (1.0 + intensity * 15.0) as usize;
    if ksize % 2 == 0 {
        ksize += 1;
    }
    gaussian_blur(frame, ksize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_blur_tiny_intensity_is_identity() {
        let frame = RgbImage::from_fn(5, 5, |x, y| Rgb([(x * 50) as u8, (y * 50) as u8, 0]));
        assert_eq!(blur(&frame, 0.0), frame);
        // int(1 + 0.05 * 15) = 1
        assert_eq!(blur(&frame, 0.05), frame);
        assert_ne!(blur(&frame, 0.5), frame);
    }
}
