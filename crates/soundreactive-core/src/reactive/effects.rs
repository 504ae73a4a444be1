//! The eight artistic effects and their band weightings

use super::params::BandSample;
use crate::{ConfigError, FrequencyBand};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Artistic effect kinds driven by weighted band energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtisticEffect {
    /// Brightness-sorted pixel strips
    PixelSort,
    /// Angular mirrored copies around the center
    Kaleidoscope,
    /// Sine/cosine coordinate warp
    WaveDistortion,
    /// Analog tape degradation
    Vhs,
    /// Per-channel color quantization
    Posterization,
    /// Inverted edge map overlay
    EdgeDetection,
    /// Random block and line corruption
    DataCorruption,
    /// CRT line darkening and curvature
    ScanLines,
}

impl ArtisticEffect {
    /// All effects; also the slot order of per-effect arrays
    pub const ALL: [ArtisticEffect; 8] = [
        ArtisticEffect::PixelSort,
        ArtisticEffect::Kaleidoscope,
        ArtisticEffect::WaveDistortion,
        ArtisticEffect::Vhs,
        ArtisticEffect::Posterization,
        ArtisticEffect::EdgeDetection,
        ArtisticEffect::DataCorruption,
        ArtisticEffect::ScanLines,
    ];

    /// Slot of the effect in per-effect arrays
    pub fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name
    pub fn name(self) -> &'static str {
        match self {
            ArtisticEffect::PixelSort => "pixel_sort",
            ArtisticEffect::Kaleidoscope => "kaleidoscope",
            ArtisticEffect::WaveDistortion => "wave_distortion",
            ArtisticEffect::Vhs => "vhs",
            ArtisticEffect::Posterization => "posterization",
            ArtisticEffect::EdgeDetection => "edge_detection",
            ArtisticEffect::DataCorruption => "data_corruption",
            ArtisticEffect::ScanLines => "scan_lines",
        }
    }

    /// Default weights over [sub_bass, bass, mid, treble, high_treble]
    pub fn default_weights(self) -> BandWeights {
        let w = match self {
            ArtisticEffect::PixelSort => [0.0, 0.0, 0.7, 0.3, 0.0],
            ArtisticEffect::Kaleidoscope => [0.0, 0.0, 0.0, 0.5, 0.5],
            ArtisticEffect::WaveDistortion => [0.3, 0.7, 0.0, 0.0, 0.0],
            ArtisticEffect::Vhs => [0.0, 0.3, 0.3, 0.4, 0.0],
            ArtisticEffect::Posterization => [0.0, 0.0, 0.8, 0.2, 0.0],
            ArtisticEffect::EdgeDetection => [0.0, 0.0, 0.0, 0.4, 0.6],
            ArtisticEffect::DataCorruption => [0.0, 0.0, 0.0, 0.5, 0.5],
            ArtisticEffect::ScanLines => [0.0, 0.2, 0.3, 0.5, 0.0],
        };
        BandWeights(w)
    }
}

impl fmt::Display for ArtisticEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contribution of each band, indexed like [`FrequencyBand::ALL`].
///
/// Weights need not sum to one; the mix divides by their total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandWeights(pub [f32; 5]);

impl BandWeights {
    /// Weight of a single band
    pub fn get(&self, band: FrequencyBand) -> f32 {
        self.0[band.index()]
    }

    /// Sum of all weights
    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    /// `Σ(band * weight) / Σ(weight)`, or 0 when the weights sum to ~0
    pub fn weighted_mix(&self, sample: &BandSample) -> f32 {
        let total = self.total();
        if total.abs() < 1e-8 {
            return 0.0;
        }
        let values = sample.to_array();
        let mix: f32 = values.iter().zip(self.0.iter()).map(|(v, w)| v * w).sum();
        mix / total
    }

    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        for (band, &w) in FrequencyBand::ALL.iter().zip(self.0.iter()) {
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::new(
                    format!("{}.{}", field, band.name()),
                    format!("weight must be finite and non-negative, got {}", w),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_in_index_order() {
        for (i, effect) in ArtisticEffect::ALL.iter().enumerate() {
            assert_eq!(effect.index(), i);
        }
    }

    #[test]
    fn test_weighted_mix() {
        let sample = BandSample::from_array([0.0, 1.0, 0.5, 0.0, 0.0]);
        let weights = ArtisticEffect::WaveDistortion.default_weights();
        assert!((weights.weighted_mix(&sample) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_mix_zero_weights() {
        let sample = BandSample::from_array([1.0; 5]);
        assert_eq!(BandWeights([0.0; 5]).weighted_mix(&sample), 0.0);
    }

    #[test]
    fn test_unnormalized_weights() {
        let sample = BandSample::from_array([1.0, 0.0, 0.0, 0.0, 0.0]);
        let weights = BandWeights([2.0, 2.0, 0.0, 0.0, 0.0]);
        assert!((weights.weighted_mix(&sample) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = BandWeights([0.0, -1.0, 0.0, 0.0, 0.0]);
        assert_eq!(weights.validate("vhs").unwrap_err().field, "vhs.bass");
    }
}
