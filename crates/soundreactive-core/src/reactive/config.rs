//! Reactivity configuration

use super::effects::{ArtisticEffect, BandWeights};
use crate::{check_range, ConfigError};
use serde::{Deserialize, Serialize};

/// On/off switches for every effect channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectToggles {
    /// Hue shift from mid, saturation boost from treble
    pub color_grading: bool,
    /// Brightness pulse from bass and mid
    pub brightness: bool,
    /// Gaussian blur from bass
    pub blur: bool,
    /// Glitch driven by treble and high treble
    pub glitch: bool,
    /// Compression artifacts driven by treble and high treble
    pub artifacts: bool,
    /// Per artistic effect, indexed by [`ArtisticEffect::index`]
    pub artistic: [bool; 8],
}

impl Default for EffectToggles {
    fn default() -> Self {
        Self {
            color_grading: true,
            brightness: true,
            blur: true,
            glitch: false,
            artifacts: false,
            artistic: [false; 8],
        }
    }
}

impl EffectToggles {
    /// Whether an artistic effect is enabled
    pub fn is_enabled(&self, effect: ArtisticEffect) -> bool {
        self.artistic[effect.index()]
    }

    /// Enable or disable an artistic effect
    pub fn set(&mut self, effect: ArtisticEffect, enabled: bool) {
        self.artistic[effect.index()] = enabled;
    }

    /// Builder-style variant of [`EffectToggles::set`]
    pub fn with(mut self, effect: ArtisticEffect, enabled: bool) -> Self {
        self.set(effect, enabled);
        self
    }
}

/// Configuration of the audio-to-parameter mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactivityConfig {
    /// Maximum zoom factor (>= 1.0)
    pub zoom_factor: f32,
    /// Maximum rotation in degrees
    pub rotation_angle: f32,
    /// Sub-bass contribution to zoom
    pub sub_bass_zoom: f32,
    /// Bass contribution to zoom
    pub bass_zoom: f32,
    /// Treble contribution to rotation
    pub treble_rotation: f32,
    /// High-treble contribution to rotation
    pub high_treble_rotation: f32,
    /// Hue shift in degrees at full mid energy
    pub mid_hue_shift: f32,
    /// Blend between neutral baseline (0) and fully audio-driven (1)
    pub intensity_sensitivity: f32,
    /// Curve smoothing strength (0-1); sets the moving-average window on output timing
    pub smoothness: f32,
    /// Exponential smoothing factor for artistic effects (0 = none)
    pub effect_smoothing: f32,
    /// Zoom only punches around detected bass beats
    pub beat_triggered_zoom: bool,
    /// Seconds around a beat during which zoom is active
    pub beat_window: f32,
    /// Brightness flashes on detected snare hits
    pub snare_triggered_flash: bool,
    /// Seconds around a snare hit during which the flash is active
    pub snare_window: f32,
    /// Effect switches
    pub toggles: EffectToggles,
    /// Band weights per artistic effect, indexed by [`ArtisticEffect::index`]
    pub effect_weights: [BandWeights; 8],
}

impl Default for ReactivityConfig {
    fn default() -> Self {
        Self {
            zoom_factor: 1.3,
            rotation_angle: 5.0,
            sub_bass_zoom: 0.2,
            bass_zoom: 1.0,
            treble_rotation: 1.0,
            high_treble_rotation: 0.5,
            mid_hue_shift: 30.0,
            intensity_sensitivity: 0.7,
            smoothness: 0.8,
            effect_smoothing: 0.3,
            beat_triggered_zoom: true,
            beat_window: 0.2,
            snare_triggered_flash: true,
            snare_window: 0.15,
            toggles: EffectToggles::default(),
            effect_weights: ArtisticEffect::ALL.map(ArtisticEffect::default_weights),
        }
    }
}

impl ReactivityConfig {
    /// Band weights of an artistic effect
    pub fn weights(&self, effect: ArtisticEffect) -> &BandWeights {
        &self.effect_weights[effect.index()]
    }

    /// Override the band weights of an artistic effect
    pub fn set_weights(&mut self, effect: ArtisticEffect, weights: BandWeights) {
        self.effect_weights[effect.index()] = weights;
    }

    /// Reject out-of-range values with the offending field name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.zoom_factor.is_finite() || self.zoom_factor < 1.0 {
            return Err(ConfigError::new(
                "zoom_factor",
                format!("must be >= 1.0, got {}", self.zoom_factor),
            ));
        }
        check_range("rotation_angle", self.rotation_angle, -360.0, 360.0)?;
        check_range("mid_hue_shift", self.mid_hue_shift, -360.0, 360.0)?;
        check_range("intensity_sensitivity", self.intensity_sensitivity, 0.0, 1.0)?;
        check_range("smoothness", self.smoothness, 0.0, 1.0)?;
        check_range("effect_smoothing", self.effect_smoothing, 0.0, 1.0)?;

        for (field, value) in [
            ("sub_bass_zoom", self.sub_bass_zoom),
            ("bass_zoom", self.bass_zoom),
            ("treble_rotation", self.treble_rotation),
            ("high_treble_rotation", self.high_treble_rotation),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::new(
                    field,
                    format!("must be finite and non-negative, got {}", value),
                ));
            }
        }

        for (field, value) in [
            ("beat_window", self.beat_window),
            ("snare_window", self.snare_window),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::new(
                    field,
                    format!("must be a positive number of seconds, got {}", value),
                ));
            }
        }

        for effect in ArtisticEffect::ALL {
            self.weights(effect)
                .validate(&format!("effect_weights.{}", effect.name()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ReactivityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zoom_below_one_rejected() {
        let config = ReactivityConfig {
            zoom_factor: 0.9,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "zoom_factor");
        assert!(err.constraint.contains(">= 1.0"));
    }

    #[test]
    fn test_sensitivity_out_of_range_rejected() {
        let config = ReactivityConfig {
            intensity_sensitivity: 1.5,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "intensity_sensitivity");
    }

    #[test]
    fn test_window_must_be_positive() {
        let config = ReactivityConfig {
            snare_window: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "snare_window");
    }

    #[test]
    fn test_weights_validated() {
        let mut config = ReactivityConfig::default();
        config.set_weights(ArtisticEffect::Vhs, BandWeights([f32::NAN, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(
            config.validate().unwrap_err().field,
            "effect_weights.vhs.sub_bass"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReactivityConfig =
            serde_json::from_str(r#"{ "zoom_factor": 1.5, "toggles": { "glitch": true } }"#)
                .unwrap();
        assert_eq!(config.zoom_factor, 1.5);
        assert_eq!(config.rotation_angle, 5.0);
        assert!(config.toggles.glitch);
        assert!(config.toggles.color_grading);
        assert_eq!(
            config.weights(ArtisticEffect::PixelSort),
            &ArtisticEffect::PixelSort.default_weights()
        );
    }
}
