//! Convolution filters: separable Gaussian blur and Canny edge detection

use crate::frame::{to_u8, Border};
use image::{GrayImage, Luma, RgbImage};

/// Standard deviation used for a kernel of `ksize` taps when none is given
pub fn default_sigma(ksize: usize) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel
pub fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    let ksize = ksize.max(1);
    let half = (ksize / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f32> = (0..ksize)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

/// Gaussian blur with an odd `ksize` and [`default_sigma`], mirrored border
pub fn gaussian_blur(frame: &RgbImage, ksize: usize) -> RgbImage {
    if ksize <= 1 {
        return frame.clone();
    }
    let kernel = gaussian_kernel(ksize, default_sigma(ksize));
    let half = (ksize / 2) as i64;
    let (w, h) = frame.dimensions();

    // Horizontal pass into float storage
    let mut tmp = vec![0.0f32; (w * h * 3) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = Border::Reflect101.resolve(x as i64 + k as i64 - half, w);
                let p = frame.get_pixel(sx, y).0;
                for c in 0..3 {
                    acc[c] += p[c] as f32 * weight;
                }
            }
            let base = ((y * w + x) * 3) as usize;
            tmp[base..base + 3].copy_from_slice(&acc);
        }
    }

    // Vertical pass
    RgbImage::from_fn(w, h, |x, y| {
        let mut acc = [0.0f32; 3];
        for (k, weight) in kernel.iter().enumerate() {
            let sy = Border::Reflect101.resolve(y as i64 + k as i64 - half, h);
            let base = ((sy * w + x) * 3) as usize;
            for c in 0..3 {
                acc[c] += tmp[base + c] * weight;
            }
        }
        image::Rgb([to_u8(acc[0]), to_u8(acc[1]), to_u8(acc[2])])
    })
}

/// Canny edge map: 3x3 Sobel gradients, L1 magnitude, non-maximum
/// suppression and hysteresis between `low` and `high`. Edges are 255.
pub fn canny(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (wi, hi) = (w as usize, h as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }

    let px = |x: i64, y: i64| -> f32 {
        let xs = Border::Reflect101.resolve(x, w);
        let ys = Border::Reflect101.resolve(y, h);
        gray.get_pixel(xs, ys).0[0] as f32
    };

    let mut gx = vec![0.0f32; wi * hi];
    let mut gy = vec![0.0f32; wi * hi];
    let mut mag = vec![0.0f32; wi * hi];
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let dx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let dy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            let i = y as usize * wi + x as usize;
            gx[i] = dx;
            gy[i] = dy;
            mag[i] = dx.abs() + dy.abs();
        }
    }

    // Non-maximum suppression along the quantized gradient direction
    const STRONG: u8 = 2;
    const WEAK: u8 = 1;
    let tan22 = 0.414_213_56f32;
    let mut class = vec![0u8; wi * hi];
    let at = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0.0
        } else {
            mag[y as usize * wi + x as usize]
        }
    };
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let i = y as usize * wi + x as usize;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let (ax, ay) = (gx[i].abs(), gy[i].abs());
            let is_max = if ay <= ax * tan22 {
                m > at(x - 1, y) && m >= at(x + 1, y)
            } else if ay >= ax / tan22 {
                m > at(x, y - 1) && m >= at(x, y + 1)
            } else if (gx[i] > 0.0) == (gy[i] > 0.0) {
                m > at(x - 1, y - 1) && m >= at(x + 1, y + 1)
            } else {
                m > at(x + 1, y - 1) && m >= at(x - 1, y + 1)
            };
            if is_max {
                class[i] = if m > high { STRONG } else { WEAK };
            }
        }
    }

    // Hysteresis: grow strong edges through connected weak pixels
    let mut out = GrayImage::new(w, h);
    let mut stack: Vec<usize> = (0..class.len()).filter(|&i| class[i] == STRONG).collect();
    for &i in &stack {
        out.put_pixel((i % wi) as u32, (i / wi) as u32, Luma([255]));
    }
    while let Some(i) = stack.pop() {
        let (x, y) = ((i % wi) as i64, (i / wi) as i64);
        for ny in (y - 1)..=(y + 1) {
            for nx in (x - 1)..=(x + 1) {
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let j = ny as usize * wi + nx as usize;
                if class[j] == WEAK {
                    class[j] = STRONG;
                    out.put_pixel(nx as u32, ny as u32, Luma([255]));
                    stack.push(j);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_default_sigma() {
        assert!((default_sigma(3) - 0.8).abs() < 1e-6);
        assert!((default_sigma(9) - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        let k = gaussian_kernel(7, default_sigma(7));
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(k[0], k[6]);
        assert!(k[3] > k[2]);
    }

    #[test]
    fn test_blur_preserves_flat_frame() {
        let frame = RgbImage::from_pixel(6, 5, Rgb([80, 120, 200]));
        assert_eq!(gaussian_blur(&frame, 5), frame);
    }

    #[test]
    fn test_blur_softens_step() {
        let frame = RgbImage::from_fn(10, 1, |x, _| if x < 5 { Rgb([0; 3]) } else { Rgb([255; 3]) });
        let blurred = gaussian_blur(&frame, 5);
        let v4 = blurred.get_pixel(4, 0).0[0];
        let v5 = blurred.get_pixel(5, 0).0[0];
        assert!(v4 > 0 && v4 < 128);
        assert!(v5 > 128 && v5 < 255);
    }

    #[test]
    fn test_canny_finds_vertical_edge() {
        let gray = GrayImage::from_fn(12, 8, |x, _| if x < 6 { Luma([0]) } else { Luma([255]) });
        let edges = canny(&gray, 50.0, 150.0);
        let edge_columns: Vec<u32> = (0..12)
            .filter(|&x| edges.get_pixel(x, 4).0[0] == 255)
            .collect();
        assert!(!edge_columns.is_empty());
        assert!(edge_columns.iter().all(|&x| x == 5 || x == 6));
        assert_eq!(edges.get_pixel(0, 4).0[0], 0);
        assert_eq!(edges.get_pixel(11, 4).0[0], 0);
    }

    #[test]
    fn test_canny_flat_has_no_edges() {
        let gray = GrayImage::from_pixel(8, 8, Luma([90]));
        assert!(canny(&gray, 50.0, 150.0).pixels().all(|p| p.0[0] == 0));
    }
}
