//! Layer blend modes
//!
//! Inputs are normalized to `[0, 1]`, combined with the mode function and
//! mixed with the base by opacity:
//! `result = f(base, overlay) * opacity + base * (1 - opacity)`.

use crate::frame::to_u8;
use crate::{RenderError, Result};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Blend mode for compositing the effects layer over the original
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Overlay replaces base
    #[default]
    Normal,
    /// Multiply colors (darken)
    Multiply,
    /// Screen colors (lighten)
    Screen,
    /// Multiply or screen depending on the base
    Overlay,
    /// Soft light
    SoftLight,
    /// Multiply or screen depending on the overlay
    HardLight,
    /// Color dodge
    ColorDodge,
    /// Color burn
    ColorBurn,
    /// Darken only (min)
    Darken,
    /// Lighten only (max)
    Lighten,
    /// Absolute difference
    Difference,
    /// Exclusion
    Exclusion,
}

impl BlendMode {
    /// List all available blend modes
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::SoftLight,
            BlendMode::HardLight,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Difference,
            BlendMode::Exclusion,
        ]
    }

    /// Snake-case name, as used in presets and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::SoftLight => "soft_light",
            BlendMode::HardLight => "hard_light",
            BlendMode::ColorDodge => "color_dodge",
            BlendMode::ColorBurn => "color_burn",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
        }
    }

    /// Blend one normalized channel value
    #[inline]
    pub fn apply(&self, b: f32, o: f32) -> f32 {
        match self {
            BlendMode::Normal => o,
            BlendMode::Multiply => b * o,
            BlendMode::Screen => 1.0 - (1.0 - b) * (1.0 - o),
            BlendMode::Overlay => {
                if b < 0.5 {
                    2.0 * b * o
                } else {
                    1.0 - 2.0 * (1.0 - b) * (1.0 - o)
                }
            }
            BlendMode::SoftLight => {
                if b < 0.5 {
                    b - (1.0 - 2.0 * o) * b * (1.0 - b)
                } else {
                    b + (2.0 * o - 1.0) * (b.sqrt() - b)
                }
            }
            BlendMode::HardLight => {
                if o < 0.5 {
                    2.0 * b * o
                } else {
                    1.0 - 2.0 * (1.0 - b) * (1.0 - o)
                }
            }
            BlendMode::ColorDodge => (b / (1.0 - o + 1e-8)).min(1.0),
            BlendMode::ColorBurn => 1.0 - ((1.0 - b) / (o + 1e-8)).min(1.0),
            BlendMode::Darken => b.min(o),
            BlendMode::Lighten => b.max(o),
            BlendMode::Difference => (b - o).abs(),
            BlendMode::Exclusion => b + o - 2.0 * b * o,
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        BlendMode::all()
            .iter()
            .find(|m| m.name() == key)
            .copied()
            .ok_or_else(|| RenderError::InvalidParameters(format!("unknown blend mode '{}'", s)))
    }
}

/// Blend `overlay` onto `base` at `opacity`.
///
/// Opacity `<= 0` returns the base unchanged.
pub fn blend_layers(
    base: &RgbImage,
    overlay: &RgbImage,
    mode: BlendMode,
    opacity: f32,
) -> Result<RgbImage> {
    if base.dimensions() != overlay.dimensions() {
        return Err(RenderError::DimensionMismatch {
            expected: base.dimensions(),
            actual: overlay.dimensions(),
        });
    }
    if opacity <= 0.0 {
        return Ok(base.clone());
    }

    let (w, h) = base.dimensions();
    Ok(RgbImage::from_fn(w, h, |x, y| {
        let pb = base.get_pixel(x, y).0;
        let po = overlay.get_pixel(x, y).0;
        Rgb(std::array::from_fn(|c| {
            let b = pb[c] as f32 / 255.0;
            let o = po[c] as f32 / 255.0;
            let mixed = mode.apply(b, o) * opacity + b * (1.0 - opacity);
            to_u8(mixed.clamp(0.0, 1.0) * 255.0)
        }))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(v: u8) -> RgbImage {
        RgbImage::from_pixel(2, 2, Rgb([v, v, v]))
    }

    #[test]
    fn test_parse_names() {
        for mode in BlendMode::all() {
            assert_eq!(mode.name().parse::<BlendMode>().unwrap(), *mode);
        }
        assert_eq!("Soft-Light".parse::<BlendMode>().unwrap(), BlendMode::SoftLight);
        assert!("glow".parse::<BlendMode>().is_err());
        assert_eq!(BlendMode::all().len(), 12);
    }

    #[test]
    fn test_multiply_and_screen() {
        let out = blend_layers(&solid(128), &solid(255), BlendMode::Multiply, 1.0).unwrap();
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
        let out = blend_layers(&solid(0), &solid(100), BlendMode::Screen, 1.0).unwrap();
        assert_eq!(out.get_pixel(0, 0).0[0], 100);
    }

    #[test]
    fn test_difference_half_opacity() {
        let out = blend_layers(&solid(200), &solid(50), BlendMode::Difference, 0.5).unwrap();
        // 0.5 * 150 + 0.5 * 200
        assert_eq!(out.get_pixel(0, 0).0[0], 175);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = blend_layers(&solid(0), &RgbImage::new(3, 3), BlendMode::Normal, 1.0);
        assert!(matches!(err, Err(RenderError::DimensionMismatch { .. })));
    }
}
