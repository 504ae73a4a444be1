//! Frame effects compositor
//!
//! Runs the fixed effect pipeline over one frame:
//! zoom, rotation, color grade, pixel sort, kaleidoscope, wave, glitch,
//! data corruption, artifacts, posterize, edge overlay, VHS, CRT lines and
//! blur. In layer mode the result is then blended over the transformed
//! original.

use crate::blend::{blend_layers, BlendMode};
use crate::color::color_grade;
use crate::effects::{self, blur};
use crate::frame::check_frame;
use crate::geometry::{rotate, zoom};
use crate::{RenderError, Result};
use image::RgbImage;
use rand::Rng;
use serde::{Deserialize, Serialize};
use soundreactive_core::{ArtisticEffect, ConfigError, EffectParameters};
use tracing::trace;

/// How the processed frame is combined with the source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompositeMode {
    /// Output the processed frame as is
    #[default]
    Direct,
    /// Blend the processed frame over the zoomed and rotated original
    Layer {
        /// Blend function
        blend: BlendMode,
        /// Layer opacity (0-1)
        opacity: f32,
    },
}

impl CompositeMode {
    /// Layer mode with the given blend and opacity
    pub fn layer(blend: BlendMode, opacity: f32) -> Self {
        CompositeMode::Layer { blend, opacity }
    }

    /// Reject an opacity outside `[0, 1]`
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let CompositeMode::Layer { opacity, .. } = *self {
            if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
                return Err(ConfigError::new(
                    "opacity",
                    format!("must be within [0, 1], got {}", opacity),
                ));
            }
        }
        Ok(())
    }
}

/// Applies [`EffectParameters`] to frames
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    mode: CompositeMode,
}

impl FrameCompositor {
    /// Create a compositor, validating the mode
    pub fn new(mode: CompositeMode) -> Result<Self> {
        mode.validate()?;
        Ok(Self { mode })
    }

    /// The composite mode
    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    /// Render one frame.
    ///
    /// Every stage is skipped at its neutral value, so neutral parameters in
    /// direct mode return a bit-identical copy of the input.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        frame: &RgbImage,
        params: &EffectParameters,
        rng: &mut R,
    ) -> Result<RgbImage> {
        check_frame(frame)?;
        if !params.is_finite() {
            return Err(RenderError::InvalidParameters(format!(
                "non-finite effect parameters: {:?}",
                params
            )));
        }
        trace!(
            "Compositing {}x{} frame: zoom={:.3} rotation={:.2}",
            frame.width(),
            frame.height(),
            params.zoom,
            params.rotation
        );

        let transformed = rotate(&zoom(frame, params.zoom), params.rotation);
        let mut out = color_grade(
            &transformed,
            params.hue_shift,
            params.saturation,
            params.brightness,
        );

        let level = |v: f32| v.clamp(0.0, 1.0);
        let artistic = |e: ArtisticEffect| level(params.artistic[e]);

        out = stage(out, artistic(ArtisticEffect::PixelSort), |f, i| {
            effects::pixel_sort(f, i, rng)
        });
        out = stage(out, artistic(ArtisticEffect::Kaleidoscope), effects::kaleidoscope);
        out = stage(out, artistic(ArtisticEffect::WaveDistortion), |f, i| {
            effects::wave_distortion(f, i, rng)
        });

        out = stage(out, level(params.glitch), |f, i| effects::glitch(f, i, rng));
        out = stage(out, artistic(ArtisticEffect::DataCorruption), |f, i| {
            effects::data_corruption(f, i, rng)
        });
        out = stage(out, level(params.artifacts), |f, i| effects::artifacts(f, i, rng));

        out = stage(out, artistic(ArtisticEffect::Posterization), effects::posterize);
        out = stage(out, artistic(ArtisticEffect::EdgeDetection), effects::edge_overlay);

        out = stage(out, artistic(ArtisticEffect::Vhs), |f, i| effects::vhs(f, i, rng));
        out = stage(out, artistic(ArtisticEffect::ScanLines), effects::crt_scan_lines);

        out = stage(out, level(params.blur), blur);

        match self.mode {
            CompositeMode::Direct => Ok(out),
            CompositeMode::Layer { blend, opacity } => {
                blend_layers(&transformed, &out, blend, opacity)
            }
        }
    }
}

/// Run `effect` only for a positive intensity
fn stage<F>(frame: RgbImage, intensity: f32, mut effect: F) -> RgbImage
where
    F: FnMut(&RgbImage, f32) -> RgbImage,
{
    if intensity > 0.0 {
        effect(&frame, intensity)
    } else {
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FrameRng;
    use image::Rgb;

    fn test_frame() -> RgbImage {
        RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, ((x + y) * 4) as u8]))
    }

    #[test]
    fn test_mode_serde_shape() {
        let json = serde_json::to_string(&CompositeMode::layer(BlendMode::Screen, 0.5)).unwrap();
        assert_eq!(json, r#"{"mode":"layer","blend":"screen","opacity":0.5}"#);
        let direct: CompositeMode = serde_json::from_str(r#"{"mode":"direct"}"#).unwrap();
        assert_eq!(direct, CompositeMode::Direct);
    }

    #[test]
    fn test_invalid_opacity_rejected() {
        let err = FrameCompositor::new(CompositeMode::layer(BlendMode::Normal, 1.5));
        assert!(matches!(err, Err(RenderError::Config(ref e)) if e.field == "opacity"));
        assert!(CompositeMode::layer(BlendMode::Normal, f32::NAN).validate().is_err());
    }

    #[test]
    fn test_empty_frame_rejected() {
        let compositor = FrameCompositor::new(CompositeMode::Direct).unwrap();
        let mut rng = FrameRng::new(0).for_frame(0);
        let result = compositor.apply(&RgbImage::new(0, 0), &EffectParameters::NEUTRAL, &mut rng);
        assert!(matches!(result, Err(RenderError::InvalidFrame(_))));
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let compositor = FrameCompositor::new(CompositeMode::Direct).unwrap();
        let mut rng = FrameRng::new(0).for_frame(0);
        let mut params = EffectParameters::NEUTRAL;
        params.zoom = f32::NAN;
        let result = compositor.apply(&test_frame(), &params, &mut rng);
        assert!(matches!(result, Err(RenderError::InvalidParameters(_))));
    }

    #[test]
    fn test_layer_opacity_zero_keeps_transformed_original() {
        let frame = test_frame();
        let compositor = FrameCompositor::new(CompositeMode::layer(BlendMode::Difference, 0.0)).unwrap();
        let mut params = EffectParameters::with_transform(1.5, 0.0);
        params.artistic[ArtisticEffect::Posterization] = 1.0;
        let mut rng = FrameRng::new(0).for_frame(0);
        let out = compositor.apply(&frame, &params, &mut rng).unwrap();
        assert_eq!(out, zoom(&frame, 1.5));
    }

    #[test]
    fn test_stage_skips_zero_intensity() {
        let frame = test_frame();
        let mut calls = 0;
        let out = stage(frame.clone(), 0.0, |f, _| {
            calls += 1;
            f.clone()
        });
        assert_eq!(calls, 0);
        assert_eq!(out, frame);
    }
}
