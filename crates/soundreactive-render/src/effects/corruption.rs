//! Digital corruption: RGB glitch, data moshing and compression artifacts

use crate::frame::{shift_channel, FloatFrame};
use crate::geometry::resize_nearest;
use image::{Rgb, RgbImage};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::Normal;

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy)]
struct Region {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Region {
    /// Clip to the frame, returning `None` when nothing remains
    fn clip(self, w: u32, h: u32) -> Option<Region> {
        if self.x >= w || self.y >= h {
            return None;
        }
        let width = self.width.min(w - self.x);
        let height = self.height.min(h - self.y);
        (width > 0 && height > 0).then_some(Region {
            width,
            height,
            ..self
        })
    }
}

/// Copy `region` from `(src_x, src_y)` onto itself, reading before writing
fn copy_block(frame: &mut RgbImage, region: Region, src_x: u32, src_y: u32) {
    let (w, h) = frame.dimensions();
    let Some(dst) = region.clip(w, h) else {
        return;
    };
    let width = dst.width.min(w.saturating_sub(src_x));
    let height = dst.height.min(h.saturating_sub(src_y));
    let mut buf = Vec::with_capacity((width * height) as usize);
    for dy in 0..height {
        for dx in 0..width {
            buf.push(*frame.get_pixel(src_x + dx, src_y + dy));
        }
    }
    let mut it = buf.into_iter();
    for dy in 0..height {
        for dx in 0..width {
            if let Some(p) = it.next() {
                frame.put_pixel(dst.x + dx, dst.y + dy, p);
            }
        }
    }
}

/// RGB split, slice displacement and chromatic aberration
pub fn glitch<R: Rng + ?Sized>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();

    if intensity > 0.3 {
        let reach = (intensity * 20.0) as i64;
        let dx = rng.random_range(-reach..=reach);
        shift_channel(&mut out, 0, dx);
    }

    if intensity > 0.5 {
        let slices = (intensity * 10.0) as u32;
        let max_height = ((intensity * 20.0) as u32).max(1);
        for _ in 0..slices {
            let region = Region {
                y: rng.random_range(0..h),
                height: rng.random_range(1..=max_height),
                x: rng.random_range(0..w.saturating_sub(50).max(1)),
                width: rng.random_range(10..50),
            };
            if rng.random::<f32>() > 0.5 {
                let shift: i64 = rng.random_range(-20..=20);
                let src = region.x as i64 + shift;
                if src >= 0 && src < w as i64 - region.width as i64 {
                    copy_block(&mut out, region, src as u32, region.y);
                }
            } else {
                smear(&mut out, region);
            }
        }
    }

    if intensity > 0.4 {
        let aberration = (intensity * 5.0) as i64;
        shift_channel(&mut out, 1, -aberration);
        shift_channel(&mut out, 2, aberration);
    }
    out
}

/// Repeat the first row of `region` down the rest of it
fn smear(frame: &mut RgbImage, region: Region) {
    let (w, h) = frame.dimensions();
    let Some(r) = region.clip(w, h) else {
        return;
    };
    for dx in 0..r.width {
        let p = *frame.get_pixel(r.x + dx, r.y);
        for dy in 1..r.height {
            frame.put_pixel(r.x + dx, r.y + dy, p);
        }
    }
}

/// Noise blocks, displaced blocks, channel swaps and shifted lines
pub fn data_corruption<R: Rng + ?Sized>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let mut out = frame.clone();

    if intensity > 0.1 {
        let blocks = ((intensity * 20.0) as u32).max(1);
        let size = (10.0 + intensity * 40.0) as u32;
        for _ in 0..blocks {
            let region = Region {
                x: rng.random_range(0..w.saturating_sub(size).max(1)),
                y: rng.random_range(0..h.saturating_sub(size).max(1)),
                width: size,
                height: size,
            };
            let kind: f32 = rng.random();
            if kind < 0.3 {
                if let Some(r) = region.clip(w, h) {
                    for y in r.y..r.y + r.height {
                        for x in r.x..r.x + r.width {
                            out.put_pixel(x, y, Rgb(rng.random()));
                        }
                    }
                }
            } else if kind < 0.6 {
                let reach = size as i64;
                let sx = region.x as i64 + rng.random_range(-reach..reach);
                let sy = region.y as i64 + rng.random_range(-reach..reach);
                let sx = sx.clamp(0, (w as i64 - reach).max(0)) as u32;
                let sy = sy.clamp(0, (h as i64 - reach).max(0)) as u32;
                copy_block(&mut out, region, sx, sy);
            } else if let Some(r) = region.clip(w, h) {
                let mut order = [0usize, 1, 2];
                order.shuffle(rng);
                for y in r.y..r.y + r.height {
                    for x in r.x..r.x + r.width {
                        let p = out.get_pixel(x, y).0;
                        out.put_pixel(x, y, Rgb([p[order[0]], p[order[1]], p[order[2]]]));
                    }
                }
            }
        }
    }

    if intensity > 0.4 {
        let lines = (2.0 + intensity * 8.0) as u32;
        let height = ((intensity * 15.0) as u32).max(1);
        for _ in 0..lines {
            let y = rng.random_range(0..h);
            let width = rng.random_range(w / 4..w);
            let x = rng.random_range(0..w.saturating_sub(width).max(1));
            let shift: i64 = rng.random_range(-50..=50);
            let src = (x as i64 + shift).clamp(0, (w - width) as i64) as u32;
            copy_block(&mut out, Region { x, y, width, height }, src, y);
        }
    }
    out
}

/// Compression-style block quantization, noise, banding and pixelation
pub fn artifacts<R: Rng + ?Sized>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let mut work = FloatFrame::from_image(frame);

    if intensity > 0.2 {
        let block = ((4.0 + intensity * 12.0) as u32).max(1);
        let probability = 0.2 + intensity * 0.6;
        let levels = ((256.0 / (1.0 + intensity * 15.0)) as u32).max(2);
        let step = 256.0 / levels as f32;
        for by in (0..h).step_by(block as usize) {
            for bx in (0..w).step_by(block as usize) {
                if rng.random::<f32>() >= probability {
                    continue;
                }
                for y in by..(by + block).min(h) {
                    for x in bx..(bx + block).min(w) {
                        for v in work.pixel_mut(x, y) {
                            *v = ((*v / step).trunc() * step).clamp(0.0, 255.0);
                        }
                    }
                }
            }
        }
    }

    if intensity > 0.15 {
        if let Ok(noise) = Normal::new(0.0f32, intensity * 25.0) {
            work.map_in_place(|v| (v + rng.sample(noise)).clamp(0.0, 255.0));
        }
    }

    if intensity > 0.3 {
        let lines = (2.0 + intensity * 8.0) as u32;
        for _ in 0..lines {
            let y = rng.random_range(0..h.saturating_sub(3).max(1));
            let height = rng.random_range(1..4);
            if rng.random::<f32>() > 0.5 {
                work.scale_rows(y, y + height, 0.7);
            } else {
                for row in y..(y + height).min(h) {
                    for v in work.row_mut(row) {
                        *v = (*v * 1.3).min(255.0);
                    }
                }
            }
        }
    }

    if intensity > 0.4 {
        let levels = ((256.0 / (1.0 + intensity * 8.0)) as u32).max(8);
        let step = 256.0 / levels as f32;
        work.map_in_place(|v| (v / step).trunc() * step);
    }

    let out = work.to_image();
    if intensity > 0.7 {
        let px = (2.0 + (intensity - 0.7) * 2.0) as u32;
        if px > 1 {
            let small = resize_nearest(&out, (w / px).max(1), (h / px).max(1));
            return resize_nearest(&small, w, h);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FrameRng;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 128]))
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let frame = gradient(40, 30);
        let mut rng = FrameRng::new(1).for_frame(0);
        assert_eq!(glitch(&frame, 0.0, &mut rng), frame);
        assert_eq!(data_corruption(&frame, 0.0, &mut rng), frame);
        assert_eq!(artifacts(&frame, 0.0, &mut rng), frame);
    }

    #[test]
    fn test_glitch_below_thresholds_is_identity() {
        let frame = gradient(40, 30);
        let mut rng = FrameRng::new(1).for_frame(0);
        assert_eq!(glitch(&frame, 0.25, &mut rng), frame);
    }

    #[test]
    fn test_glitch_aberration_leaves_red_channel_alone() {
        // 0.45: aberration plus a red shift; green moves left by 2
        let frame = RgbImage::from_fn(20, 4, |x, _| Rgb([0, (x * 10) as u8, 0]));
        let mut rng = FrameRng::new(5).for_frame(0);
        let out = glitch(&frame, 0.45, &mut rng);
        let green: Vec<u8> = (0..20).map(|x| out.get_pixel(x, 0).0[1]).collect();
        assert_eq!(green[0], 20);
        assert_eq!(green[17], 190);
        assert_eq!(green[19], 190);
    }

    #[test]
    fn test_smear_repeats_first_row() {
        let mut frame = gradient(10, 10);
        smear(&mut frame, Region { x: 2, y: 3, width: 4, height: 20 });
        for y in 3..10 {
            assert_eq!(frame.get_pixel(4, y), &Rgb([12, 15, 128]));
        }
        assert_eq!(frame.get_pixel(4, 2), &Rgb([12, 10, 128]));
    }

    #[test]
    fn test_copy_block_clips_to_frame() {
        let mut frame = gradient(8, 8);
        copy_block(&mut frame, Region { x: 6, y: 6, width: 5, height: 5 }, 0, 0);
        assert_eq!(frame.get_pixel(7, 7), &Rgb([3, 5, 128]));
    }

    #[test]
    fn test_corruption_keeps_dimensions_and_changes_frame() {
        let frame = gradient(64, 48);
        let mut rng = FrameRng::new(2).for_frame(3);
        let out = data_corruption(&frame, 0.9, &mut rng);
        assert_eq!(out.dimensions(), frame.dimensions());
        assert_ne!(out, frame);
    }

    #[test]
    fn test_artifacts_high_intensity_pixelates() {
        let frame = gradient(32, 32);
        let mut rng = FrameRng::new(4).for_frame(1);
        let out = artifacts(&frame, 1.0, &mut rng);
        assert_eq!(out.dimensions(), (32, 32));
        // Pixelated in 2x2 blocks
        for y in (0..32).step_by(2) {
            for x in (0..32).step_by(2) {
                assert_eq!(out.get_pixel(x, y), out.get_pixel(x + 1, y + 1));
            }
        }
    }
}
