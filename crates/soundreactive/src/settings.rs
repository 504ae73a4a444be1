//! Render settings and preset files
//!
//! A preset is a [`RenderSettings`] serialized as TOML or JSON, chosen by the
//! file extension. Missing fields take their defaults, so a preset only needs
//! to list what it changes.

use serde::{Deserialize, Serialize};
use soundreactive_core::{AnalysisConfig, ConfigError, LogConfig, ReactivityConfig};
use soundreactive_media::TranscodeConfig;
use soundreactive_render::CompositeMode;
use std::path::Path;
use tracing::info;

use crate::error::{JobError, Result};

/// What to do when a single frame fails to composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the job
    #[default]
    Abort,
    /// Write the unprocessed frame and keep going
    PassThrough,
}

/// How per-frame effect parameters are derived from the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterMode {
    /// Continuous five-band mapping with beat windows
    #[default]
    Reactive,
    /// Zoom pulses on kick drums and rotation swings on treble peaks only
    Peaks,
}

/// Everything a render job needs besides its input and output paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Spectrogram, band ranges and onset detectors
    pub analysis: AnalysisConfig,
    /// Audio to effect mapping
    pub reactivity: ReactivityConfig,
    /// Direct output or layer blending
    pub composite: CompositeMode,
    /// Parameter source
    pub parameter_mode: ParameterMode,
    /// Envelope length in seconds for [`ParameterMode::Peaks`]
    pub effect_duration: f32,
    /// Output frame rate for still images and slideshows
    pub fps: f64,
    /// Output size for still images and slideshows; defaults to the (first) image size
    pub output_size: Option<(u32, u32)>,
    /// Per-frame failure handling
    pub failure_policy: FailurePolicy,
    /// Job seed for the randomized effects; drawn from the OS when unset
    pub seed: Option<u64>,
    /// Attach a preview to every n-th progress event (0 disables previews)
    pub preview_every: usize,
    /// Width of preview frames in pixels
    pub preview_width: u32,
    /// External tool locations
    pub transcode: TranscodeConfig,
    /// Logging
    pub logging: LogConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            reactivity: ReactivityConfig::default(),
            composite: CompositeMode::default(),
            parameter_mode: ParameterMode::default(),
            effect_duration: 0.5,
            fps: 30.0,
            output_size: None,
            failure_policy: FailurePolicy::default(),
            seed: None,
            preview_every: 0,
            preview_width: 320,
            transcode: TranscodeConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl RenderSettings {
    /// Validate every nested section; the error names the offending field
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.analysis.validate().map_err(|e| e.within("analysis"))?;
        self.reactivity.validate().map_err(|e| e.within("reactivity"))?;
        self.composite.validate().map_err(|e| e.within("composite"))?;

        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ConfigError::new(
                "fps",
                format!("must be positive, got {}", self.fps),
            ));
        }
        if !self.effect_duration.is_finite() || self.effect_duration <= 0.0 {
            return Err(ConfigError::new(
                "effect_duration",
                format!("must be a positive number of seconds, got {}", self.effect_duration),
            ));
        }
        if let Some((w, h)) = self.output_size {
            if w == 0 || h == 0 {
                return Err(ConfigError::new(
                    "output_size",
                    format!("must be non-zero, got {}x{}", w, h),
                ));
            }
        }
        if self.preview_every > 0 && self.preview_width == 0 {
            return Err(ConfigError::new("preview_width", "must be non-zero when previews are on"));
        }
        if !self.transcode.timeout_secs.is_finite() || self.transcode.timeout_secs <= 0.0 {
            return Err(ConfigError::new(
                "transcode.timeout_secs",
                format!("must be positive, got {}", self.transcode.timeout_secs),
            ));
        }
        Ok(())
    }

    /// Load a preset; `.toml` and `.json` are supported
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| JobError::Input(format!("Cannot read preset {}: {}", path.display(), e)))?;
        let settings: RenderSettings = match PresetFormat::from_path(path)? {
            PresetFormat::Toml => toml::from_str(&content)
                .map_err(|e| JobError::Input(format!("Invalid preset {}: {}", path.display(), e)))?,
            PresetFormat::Json => serde_json::from_str(&content)
                .map_err(|e| JobError::Input(format!("Invalid preset {}: {}", path.display(), e)))?,
        };
        settings.validate()?;
        info!("Loaded preset from {}", path.display());
        Ok(settings)
    }

    /// Save as a preset; the format follows the extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match PresetFormat::from_path(path)? {
            PresetFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| JobError::Resource(format!("Cannot serialize preset: {}", e)))?,
            PresetFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| JobError::Resource(format!("Cannot serialize preset: {}", e)))?,
        };
        std::fs::write(path, content)?;
        info!("Saved preset to {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PresetFormat {
    Toml,
    Json,
}

impl PresetFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(PresetFormat::Toml),
            "json" => Ok(PresetFormat::Json),
            _ => Err(JobError::Input(format!(
                "Unsupported preset format (expected .toml or .json): {}",
                path.display()
            ))),
        }
    }
}
