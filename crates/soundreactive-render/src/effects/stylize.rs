//! Posterization and edge overlay

use crate::filter::canny;
use crate::frame::mix;
use image::{imageops, Rgb, RgbImage};

/// Canny hysteresis thresholds for the edge overlay
const EDGE_LOW: f32 = 50.0;
const EDGE_HIGH: f32 = 150.0;

/// Floor every channel to a multiple of `256 / levels`, with
/// `levels = max(2, int(256 / (1 + 20i)))`
pub fn posterize(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let levels = ((256.0 / (1.0 + intensity * 20.0)) as u32).max(2);
    let step = 256.0 / levels as f32;
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        for v in p.0.iter_mut() {
            let q = (*v as f32 / step).floor() * step;
            *v = q.min(255.0) as u8;
        }
    }
    out
}

/// Mix in the inverted Canny edge map at weight `0.4i`
pub fn edge_overlay(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let gray = imageops::grayscale(frame);
    let edges = canny(&gray, EDGE_LOW, EDGE_HIGH);
    let inverted = RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let v = 255 - edges.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    });
    let weight = intensity * 0.4;
    mix(frame, 1.0 - weight, &inverted, weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posterize_full_intensity() {
        // levels = max(2, int(256 / 21)) = 12, step = 21.33
        let frame = RgbImage::from_pixel(2, 2, Rgb([0, 30, 255]));
        let out = posterize(&frame, 1.0);
        assert_eq!(out.get_pixel(0, 0).0, [0, 21, 234]);
    }

    #[test]
    fn test_posterize_limits_levels() {
        let frame = RgbImage::from_fn(256, 1, |x, _| Rgb([x as u8, 0, 0]));
        let out = posterize(&frame, 0.6);
        let mut reds: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        reds.dedup();
        // max(2, int(256 / 13)) = 19
        assert_eq!(reds.len(), 19);
    }

    #[test]
    fn test_edge_overlay_flat_frame_brightens_uniformly() {
        // No edges: everything mixes toward white
        let frame = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let out = edge_overlay(&frame, 1.0);
        // 100 * 0.6 + 255 * 0.4 = 162
        assert!(out.pixels().all(|p| p.0 == [162, 162, 162]));
    }

    #[test]
    fn test_edge_overlay_darkens_edges() {
        let frame = RgbImage::from_fn(12, 8, |x, _| if x < 6 { Rgb([0; 3]) } else { Rgb([255; 3]) });
        let out = edge_overlay(&frame, 1.0);
        // Far from the step both sides only move toward white
        assert_eq!(out.get_pixel(0, 4).0[0], 102);
        assert_eq!(out.get_pixel(11, 4).0[0], 255);
        // On the edge the white half is pulled down
        let edge_min = (5..=6).map(|x| out.get_pixel(x, 4).0[0]).min().unwrap_or(255);
        assert!(edge_min < 255);
    }
}
