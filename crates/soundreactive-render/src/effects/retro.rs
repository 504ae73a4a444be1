//! Analog looks: VHS tape degradation and CRT scan lines

use crate::color::scale_saturation;
use crate::frame::{remap, Border, FloatFrame};
use image::RgbImage;
use rand::Rng;
use rand_distr::Normal;

/// Dark tape lines, red/blue bleed, tape noise and color loss
pub fn vhs<R: Rng + ?Sized>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let h = frame.height();
    let mut work = FloatFrame::from_image(frame);

    if intensity > 0.2 {
        let lines = (2.0 + intensity * 15.0) as u32;
        let spacing = h / (lines + 1);
        let height = ((intensity * 3.0) as u32).max(1);
        for i in 1..=lines {
            let y = i * spacing;
            work.scale_rows(y, y + height, 0.6);
        }
    }

    if intensity > 0.3 {
        let bleed = (intensity * 8.0) as i64;
        work.shift_channel(0, bleed);
        work.shift_channel(2, -bleed);
    }

    if intensity > 0.4 {
        if let Ok(noise) = Normal::new(0.0f32, intensity * 20.0) {
            work.map_in_place(|v| v + rng.sample(noise));
        }
    }

    let out = work.to_image();
    if intensity > 0.5 {
        return scale_saturation(&out, 1.0 - intensity * 0.3);
    }
    out
}

/// Darkened scan line pattern, plus barrel curvature above `0.5`
pub fn crt_scan_lines(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let mut work = FloatFrame::from_image(frame);

    let spacing = ((3.0 - intensity * 2.0) as u32).max(2);
    let factor = 0.7 - intensity * 0.3;
    for y in (0..h).step_by((spacing * 2) as usize) {
        work.scale_rows(y, y + spacing, factor);
    }
    let out = work.to_image();

    if intensity <= 0.5 {
        return out;
    }
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let max_r = (cx * cx + cy * cy).sqrt();
    remap(&out, Border::Replicate, |x, y| {
        let dx = x - cx;
        let dy = y - cy;
        let r = (dx * dx + dy * dy).sqrt() / max_r;
        let distortion = 1.0 + intensity * 0.1 * r * r;
        (dx / distortion + cx, dy / distortion + cy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FrameRng;
    use image::Rgb;

    #[test]
    fn test_vhs_low_intensity_only_darkens_lines() {
        // 0.25: 5 lines spaced 40 / 6 = 6 apart, no bleed or noise
        let frame = RgbImage::from_pixel(10, 40, Rgb([200, 200, 200]));
        let mut rng = FrameRng::new(0).for_frame(0);
        let out = vhs(&frame, 0.25, &mut rng);
        for y in 0..40 {
            let expected = if y > 0 && y % 6 == 0 && y <= 30 { 120 } else { 200 };
            assert_eq!(out.get_pixel(3, y).0, [expected; 3], "row {}", y);
        }
    }

    #[test]
    fn test_vhs_bleed_moves_red_right() {
        // 0.35: bleed of 2 pixels; row 1 sits between the dark lines
        let mut frame = RgbImage::from_pixel(12, 50, Rgb([0, 0, 0]));
        frame.put_pixel(4, 1, Rgb([255, 0, 255]));
        let mut rng = FrameRng::new(0).for_frame(0);
        let out = vhs(&frame, 0.35, &mut rng);
        assert_eq!(out.get_pixel(6, 1).0[0], 255);
        assert_eq!(out.get_pixel(2, 1).0[2], 255);
        assert_eq!(out.get_pixel(4, 1).0[1], 0);
    }

    #[test]
    fn test_vhs_tape_noise_spread() {
        // 0.45: 8 lines spaced 90 / 9 = 10 apart, noise sigma 9; green is never bled
        let frame = RgbImage::from_pixel(64, 90, Rgb([128, 128, 128]));
        let mut rng = FrameRng::new(3).for_frame(0);
        let out = vhs(&frame, 0.45, &mut rng);
        let greens: Vec<f32> = (0..90)
            .filter(|y| *y == 0 || *y % 10 != 0 || *y > 80)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .map(|(x, y)| out.get_pixel(x, y).0[1] as f32)
            .collect();
        let n = greens.len() as f32;
        let mean = greens.iter().sum::<f32>() / n;
        let std = (greens.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();
        assert!((mean - 128.0).abs() < 1.0, "mean {}", mean);
        assert!((std - 9.0).abs() < 1.0, "std {}", std);
    }

    #[test]
    fn test_crt_line_pattern() {
        // 0.2: spacing max(2, int(2.6)) = 2
        let frame = RgbImage::from_pixel(4, 8, Rgb([100, 100, 100]));
        let out = crt_scan_lines(&frame, 0.2);
        let dark = (100.0 * (0.7 - 0.2f32 * 0.3)) as u8;
        let column: Vec<u8> = (0..8).map(|y| out.get_pixel(0, y).0[0]).collect();
        assert_eq!(column, vec![dark, dark, 100, 100, dark, dark, 100, 100]);
    }

    #[test]
    fn test_crt_barrel_keeps_center() {
        let frame = RgbImage::from_fn(21, 21, |x, y| Rgb([(x * 12) as u8, (y * 12) as u8, 0]));
        let out = crt_scan_lines(&frame, 0.9);
        assert_eq!(out.dimensions(), (21, 21));
        // Row 10 is not a darkened row and the center barely moves
        assert_eq!(out.get_pixel(10, 10).0, [120, 120, 0]);
        // Row 20 is darkened and sampled from further in
        assert_ne!(out.get_pixel(0, 20), frame.get_pixel(0, 20));
    }
}
