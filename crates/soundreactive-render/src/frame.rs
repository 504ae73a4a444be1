//! Pixel-level helpers shared by every stage: border handling, bilinear
//! sampling, coordinate remapping and weighted channel arithmetic.

use crate::{RenderError, Result};
use image::{Rgb, RgbImage};

/// How coordinates outside the frame are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// Mirror including the edge pixel: `cba|abc|cba`
    Reflect,
    /// Mirror around the edge pixel: `dcb|abcd|cba`
    Reflect101,
    /// Repeat the edge pixel
    Replicate,
}

impl Border {
    /// Map a possibly out-of-range index into `0..n`
    pub fn resolve(self, i: i64, n: u32) -> u32 {
        let n = n as i64;
        if n <= 1 {
            return 0;
        }
        let idx = match self {
            Border::Replicate => i.clamp(0, n - 1),
            Border::Reflect => {
                let period = 2 * n;
                let m = i.rem_euclid(period);
                if m < n {
                    m
                } else {
                    period - 1 - m
                }
            }
            Border::Reflect101 => {
                let period = 2 * n - 2;
                let m = i.rem_euclid(period);
                if m < n {
                    m
                } else {
                    period - m
                }
            }
        };
        idx as u32
    }
}

/// Reject frames with a zero dimension
pub fn check_frame(frame: &RgbImage) -> Result<()> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(RenderError::InvalidFrame(format!(
            "frame has zero size {}x{}",
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}

/// Saturating conversion used wherever float results return to 8 bits
#[inline]
pub fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Bilinear sample at a fractional position
pub fn sample_bilinear(frame: &RgbImage, x: f32, y: f32, border: Border) -> [f32; 3] {
    let (w, h) = frame.dimensions();
    let x0f = x.floor();
    let y0f = y.floor();
    let fx = x - x0f;
    let fy = y - y0f;
    let x0 = x0f as i64;
    let y0 = y0f as i64;

    let xa = border.resolve(x0, w);
    let xb = border.resolve(x0 + 1, w);
    let ya = border.resolve(y0, h);
    let yb = border.resolve(y0 + 1, h);

    let p00 = frame.get_pixel(xa, ya).0;
    let p10 = frame.get_pixel(xb, ya).0;
    let p01 = frame.get_pixel(xa, yb).0;
    let p11 = frame.get_pixel(xb, yb).0;

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Build a same-size frame where each output pixel samples `map(x, y)` in the source
pub fn remap<F>(frame: &RgbImage, border: Border, map: F) -> RgbImage
where
    F: Fn(f32, f32) -> (f32, f32),
{
    let (w, h) = frame.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let (sx, sy) = map(x as f32, y as f32);
        let p = sample_bilinear(frame, sx, sy, border);
        Rgb([to_u8(p[0]), to_u8(p[1]), to_u8(p[2])])
    })
}

/// `a * wa + b * wb`, rounded and saturated per channel
pub fn add_weighted(a: &RgbImage, wa: f32, b: &RgbImage, wb: f32) -> Result<RgbImage> {
    if a.dimensions() != b.dimensions() {
        return Err(RenderError::DimensionMismatch {
            expected: a.dimensions(),
            actual: b.dimensions(),
        });
    }
    Ok(mix(a, wa, b, wb))
}

/// [`add_weighted`] for frames already known to share dimensions
pub(crate) fn mix(a: &RgbImage, wa: f32, b: &RgbImage, wb: f32) -> RgbImage {
    let (w, h) = a.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let pa = a.get_pixel(x, y).0;
        let pb = b.get_pixel(x, y).0;
        Rgb(std::array::from_fn(|c| {
            to_u8(pa[c] as f32 * wa + pb[c] as f32 * wb)
        }))
    })
}

/// Translate one channel horizontally by `dx` pixels with a replicated border.
///
/// Positive `dx` moves content to the right.
pub fn shift_channel(frame: &mut RgbImage, channel: usize, dx: i64) {
    if dx == 0 {
        return;
    }
    let (w, h) = frame.dimensions();
    let mut row = vec![0u8; w as usize];
    for y in 0..h {
        for x in 0..w {
            row[x as usize] = frame.get_pixel(x, y).0[channel];
        }
        for x in 0..w {
            let src = Border::Replicate.resolve(x as i64 - dx, w);
            frame.get_pixel_mut(x, y).0[channel] = row[src as usize];
        }
    }
}

/// Float working copy of a frame, row-major RGB
#[derive(Debug, Clone)]
pub struct FloatFrame {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FloatFrame {
    /// Copy an 8-bit frame into float storage
    pub fn from_image(frame: &RgbImage) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            data: frame.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Mutable view of one row (`width * 3` values)
    pub fn row_mut(&mut self, y: u32) -> &mut [f32] {
        let stride = self.width as usize * 3;
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Mutable view of one pixel's three channels
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let start = (y as usize * self.width as usize + x as usize) * 3;
        &mut self.data[start..start + 3]
    }

    /// Multiply rows `[y0, y1)` (clipped to the frame) by `factor`
    pub fn scale_rows(&mut self, y0: u32, y1: u32, factor: f32) {
        for y in y0..y1.min(self.height) {
            for v in self.row_mut(y) {
                *v *= factor;
            }
        }
    }

    /// Apply `f` to every value
    pub fn map_in_place(&mut self, mut f: impl FnMut(f32) -> f32) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// Shift one channel horizontally with a replicated border
    pub fn shift_channel(&mut self, channel: usize, dx: i64) {
        if dx == 0 {
            return;
        }
        let w = self.width;
        let mut row = vec![0.0f32; w as usize];
        for y in 0..self.height {
            let data = self.row_mut(y);
            for x in 0..w as usize {
                row[x] = data[x * 3 + channel];
            }
            for x in 0..w {
                let src = Border::Replicate.resolve(x as i64 - dx, w);
                data[x as usize * 3 + channel] = row[src as usize];
            }
        }
    }

    /// Clamp to `[0, 255]` and truncate back to 8 bits
    pub fn to_image(&self) -> RgbImage {
        let raw = self
            .data
            .iter()
            .map(|&v| if v.is_finite() { v.clamp(0.0, 255.0) as u8 } else { 0 })
            .collect();
        RgbImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}
