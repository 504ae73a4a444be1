//! SoundReactive Render - CPU Frame Effects
//!
//! This crate turns per-frame [`EffectParameters`](soundreactive_core::EffectParameters)
//! into pixels, including:
//! - Geometric transforms (zoom, rotation, letterboxing)
//! - HSV color grading
//! - Eight artistic effects plus glitch, artifacts and blur
//! - Twelve layer blend modes
//! - Seeded, frame-indexed randomness for reproducible renders

#![warn(missing_docs)]

use soundreactive_core::ConfigError;
use thiserror::Error;

pub mod blend;
pub mod color;
pub mod compositor;
pub mod effects;
pub mod filter;
pub mod frame;
pub mod geometry;
pub mod rng;

pub use blend::{blend_layers, BlendMode};
pub use color::{color_grade, hsv_to_rgb, rgb_to_hsv};
pub use compositor::{CompositeMode, FrameCompositor};
pub use frame::{add_weighted, check_frame, Border, FloatFrame};
pub use geometry::{fit_letterbox, resize_bilinear, resize_nearest, rotate, zoom};
pub use rng::FrameRng;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// The frame cannot be processed (zero size, wrong layout)
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Effect parameters are unusable (non-finite, unknown names)
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Two frames that must match in size do not
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Size of the reference frame
        expected: (u32, u32),
        /// Size of the offending frame
        actual: (u32, u32),
    },

    /// Compositor configuration is out of range
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
