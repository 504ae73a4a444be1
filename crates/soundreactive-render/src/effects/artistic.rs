//! Pixel sorting, kaleidoscope and wave distortion

use crate::color::value;
use crate::frame::{mix, remap, Border};
use crate::geometry::rotated_pixel;
use image::{Rgb, RgbImage};
use rand::seq::index;
use rand::Rng;
use std::f32::consts::PI;

/// Sort strips of pixels by HSV value.
///
/// Orientation is picked at random; at low intensity only a random subset
/// of the columns (or rows) inside each strip is sorted.
pub fn pixel_sort<R: Rng + ?Sized>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let strips = if intensity < 0.3 {
        ((intensity * 5.0) as u32).max(1)
    } else {
        ((intensity * 15.0) as u32).max(1)
    };
    let coverage = (intensity * 3.0).min(1.0);
    let horizontal = rng.random::<f32>() > 0.5;
    let mut out = frame.clone();

    // Sort along the strip's short axis, one line at a time
    let (strip_axis_len, line_count) = if horizontal { (h, w) } else { (w, h) };
    let strip_size = strip_axis_len / strips;
    let lines_to_sort = ((line_count as f32 * coverage) as usize).max(1);

    for s in 0..strips {
        let start = s * strip_size;
        let end = ((s + 1) * strip_size).min(strip_axis_len);
        if end < start + 2 {
            continue;
        }
        let lines: Vec<usize> = if lines_to_sort < line_count as usize {
            index::sample(rng, line_count as usize, lines_to_sort).into_vec()
        } else {
            (0..line_count as usize).collect()
        };
        for line in lines {
            let line = line as u32;
            let coord = |k: u32| if horizontal { (line, k) } else { (k, line) };
            let mut pixels: Vec<Rgb<u8>> = (start..end)
                .map(|k| {
                    let (x, y) = coord(k);
                    *frame.get_pixel(x, y)
                })
                .collect();
            pixels.sort_by_key(value);
            for (k, p) in (start..end).zip(pixels) {
                let (x, y) = coord(k);
                out.put_pixel(x, y, p);
            }
        }
    }
    out
}

/// Mirror rotated copies of the frame into `int(2 + 6i)` triangular
/// segments around the center, then blend at `0.7i`.
pub fn kaleidoscope(frame: &RgbImage, intensity: f32) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let (w, h) = frame.dimensions();
    let segments = (2.0 + intensity * 6.0) as u32;
    let segment_angle = 360.0 / segments as f32;
    let (cx, cy) = ((w / 2) as i64, (h / 2) as i64);
    let center = (cx as f32, cy as f32);
    let reach = w as f32;

    let mut kaleido = RgbImage::new(w, h);
    for i in 0..segments {
        let angle = i as f32 * segment_angle;
        let (sin, cos) = angle.to_radians().sin_cos();
        let edge = (angle + segment_angle).to_radians();
        let tri = [
            (cx, cy),
            (cx + w as i64, cy),
            (
                cx + (reach * edge.cos()) as i64,
                cy + (reach * edge.sin()) as i64,
            ),
        ];

        let min_x = tri.iter().map(|p| p.0).min().unwrap_or(0).max(0);
        let max_x = tri.iter().map(|p| p.0).max().unwrap_or(0).min(w as i64 - 1);
        let min_y = tri.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let max_y = tri.iter().map(|p| p.1).max().unwrap_or(0).min(h as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if in_triangle(&tri, (x, y)) {
                    let p = rotated_pixel(frame, x as u32, y as u32, center, cos, sin, Border::Replicate);
                    kaleido.put_pixel(x as u32, y as u32, p);
                }
            }
        }
    }

    let weight = intensity * 0.7;
    mix(frame, 1.0 - weight, &kaleido, weight)
}

fn in_triangle(tri: &[(i64, i64); 3], p: (i64, i64)) -> bool {
    let cross = |a: (i64, i64), b: (i64, i64)| (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    let d1 = cross(tri[0], tri[1]);
    let d2 = cross(tri[1], tri[2]);
    let d3 = cross(tri[2], tri[0]);
    (d1 >= 0 && d2 >= 0 && d3 >= 0) || (d1 <= 0 && d2 <= 0 && d3 <= 0)
}

/// Sine/cosine coordinate warp with random phases
pub fn wave_distortion<R: Rng + ?Sized>(frame: &RgbImage, intensity: f32, rng: &mut R) -> RgbImage {
    if intensity <= 0.0 {
        return frame.clone();
    }
    let amplitude = intensity * 30.0;
    let frequency = 0.02 + intensity * 0.05;
    let phase_x = rng.random::<f32>() * PI;
    let phase_y = rng.random::<f32>() * PI;
    remap(frame, Border::Replicate, |x, y| {
        (
            x + amplitude * (y * frequency + phase_x).sin(),
            y + amplitude * 0.5 * (x * frequency + phase_y).cos(),
        )
    })
}
