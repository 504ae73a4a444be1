//! SoundReactive Core - Audio Analysis and Reactivity Mapping
//!
//! This crate contains the audio-side domain model for SoundReactive, including:
//! - Decoded audio signals and STFT magnitude spectrograms
//! - Frequency band energy curves and onset (beat/snare) detection
//! - Mapping of band energy onto per-frame effect parameters
//! - Timeline resampling between spectrogram and output frame timing
//! - Logging configuration shared by the front-ends

#![warn(missing_docs)]

use thiserror::Error;

// Audio analysis
pub mod audio;
pub use audio::{
    analyze_bands, analyze_legacy, bin_frequencies, compute_spectrogram, detect_peaks,
    extract_band_energy, legacy_from_signal, normalize, percentile, AnalysisConfig,
    AudioAnalysis, AudioSignal, BandCurves, BandRange, BandRanges, FrequencyBand,
    LegacyAnalysis, OnsetConfig, Spectrogram, SpectrogramConfig,
};

// Reactivity mapping
pub mod reactive;
pub use reactive::{
    ease_in_out_cubic, ease_in_out_quad, ease_out_cubic, ArtisticEffect, ArtisticIntensities,
    BandSample, BandWeights, EffectParameters, EffectSmoothingState, EffectToggles,
    OnsetTimeline, PeakEffectMap, ReactivityConfig, ReactivityMapper,
};

// Timeline helpers
pub mod timeline;
pub use timeline::{interp, linspace, moving_average, FrameTimeline};

// Infrastructure
pub mod logging;
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input data cannot be analyzed (empty, non-finite, mismatched lengths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of range
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An out-of-range configuration value, reported before any work starts
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid value for `{field}`: {constraint}")]
pub struct ConfigError {
    /// Dotted path of the offending field
    pub field: String,
    /// Human readable description of the violated constraint
    pub constraint: String,
}

impl ConfigError {
    /// Create a new configuration error for `field`
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Prefix the field path, e.g. `zoom_factor` -> `reactivity.zoom_factor`
    pub fn within(mut self, parent: &str) -> Self {
        self.field = format!("{}.{}", parent, self.field);
        self
    }
}

/// Ensure `value` lies in `[min, max]` and is finite
pub(crate) fn check_range(
    field: &str,
    value: f32,
    min: f32,
    max: f32,
) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::new(
            field,
            format!("must be within [{}, {}], got {}", min, max, value),
        ));
    }
    Ok(())
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::new("zoom_factor", "must be >= 1.0");
        assert_eq!(
            err.to_string(),
            "invalid value for `zoom_factor`: must be >= 1.0"
        );
        assert_eq!(err.within("reactivity").field, "reactivity.zoom_factor");
    }

    #[test]
    fn test_check_range_rejects_nan() {
        assert!(check_range("x", f32::NAN, 0.0, 1.0).is_err());
        assert!(check_range("x", 1.5, 0.0, 1.0).is_err());
        assert!(check_range("x", 0.5, 0.0, 1.0).is_ok());
    }
}
