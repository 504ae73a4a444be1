//! Audio-to-parameter mapping
//!
//! Turns band samples and onset proximity into [`EffectParameters`] once per
//! output frame. The only state carried across frames is the
//! [`EffectSmoothingState`] owned by the render session.

pub mod config;
pub mod effects;
pub mod legacy;
pub mod mapper;
pub mod params;
pub mod smoothing;

pub use config::{EffectToggles, ReactivityConfig};
pub use effects::{ArtisticEffect, BandWeights};
pub use legacy::{
    ease_in_out_cubic, ease_in_out_quad, ease_out_cubic, PeakEffectMap, DEFAULT_EFFECT_DURATION,
};
pub use mapper::{OnsetTimeline, ReactivityMapper};
pub use params::{ArtisticIntensities, BandSample, EffectParameters};
pub use smoothing::EffectSmoothingState;
