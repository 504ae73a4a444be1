//! Per-frame values flowing into and out of the mapper

use super::effects::ArtisticEffect;
use crate::FrequencyBand;
use std::ops::{Index, IndexMut};

/// Band energies at one instant, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandSample {
    /// Sub-bass energy
    pub sub_bass: f32,
    /// Bass energy
    pub bass: f32,
    /// Mid energy
    pub mid: f32,
    /// Treble energy
    pub treble: f32,
    /// High-treble energy
    pub high_treble: f32,
}

impl BandSample {
    /// Build from values ordered like [`FrequencyBand::ALL`], clamping each to `[0, 1]`
    pub fn from_array(values: [f32; 5]) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            sub_bass: c(values[0]),
            bass: c(values[1]),
            mid: c(values[2]),
            treble: c(values[3]),
            high_treble: c(values[4]),
        }
    }

    /// Values ordered like [`FrequencyBand::ALL`]
    pub fn to_array(&self) -> [f32; 5] {
        [
            self.sub_bass,
            self.bass,
            self.mid,
            self.treble,
            self.high_treble,
        ]
    }

    /// Energy of one band
    pub fn get(&self, band: FrequencyBand) -> f32 {
        self.to_array()[band.index()]
    }
}

/// One intensity per artistic effect
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArtisticIntensities([f32; 8]);

impl ArtisticIntensities {
    /// Iterate `(effect, intensity)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ArtisticEffect, f32)> + '_ {
        ArtisticEffect::ALL.iter().map(move |&e| (e, self.0[e.index()]))
    }

    /// True when every intensity is zero or below
    pub fn all_zero(&self) -> bool {
        self.0.iter().all(|&v| v <= 0.0)
    }
}

impl Index<ArtisticEffect> for ArtisticIntensities {
    type Output = f32;

    fn index(&self, effect: ArtisticEffect) -> &f32 {
        &self.0[effect.index()]
    }
}

impl IndexMut<ArtisticEffect> for ArtisticIntensities {
    fn index_mut(&mut self, effect: ArtisticEffect) -> &mut f32 {
        &mut self.0[effect.index()]
    }
}

/// Everything the compositor needs to render one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameters {
    /// Zoom factor, 1.0 = none
    pub zoom: f32,
    /// Rotation in degrees, counter-clockwise
    pub rotation: f32,
    /// Hue rotation in degrees
    pub hue_shift: f32,
    /// Saturation multiplier
    pub saturation: f32,
    /// Brightness (HSV value) multiplier
    pub brightness: f32,
    /// Gaussian blur intensity (0-1)
    pub blur: f32,
    /// Glitch intensity (0-1)
    pub glitch: f32,
    /// Compression artifact intensity (0-1)
    pub artifacts: f32,
    /// Artistic effect intensities (0-1)
    pub artistic: ArtisticIntensities,
}

impl EffectParameters {
    /// Parameters that leave a frame untouched
    pub const NEUTRAL: EffectParameters = EffectParameters {
        zoom: 1.0,
        rotation: 0.0,
        hue_shift: 0.0,
        saturation: 1.0,
        brightness: 1.0,
        blur: 0.0,
        glitch: 0.0,
        artifacts: 0.0,
        artistic: ArtisticIntensities([0.0; 8]),
    };

    /// Create neutral parameters with a zoom/rotation pair
    pub fn with_transform(zoom: f32, rotation: f32) -> Self {
        Self {
            zoom,
            rotation,
            ..Self::NEUTRAL
        }
    }

    /// True when every stage would be a no-op
    pub fn is_neutral(&self) -> bool {
        self.zoom <= 1.0
            && self.rotation.abs() < 0.01
            && self.hue_shift == 0.0
            && self.saturation == 1.0
            && self.brightness == 1.0
            && self.blur <= 0.0
            && self.glitch <= 0.0
            && self.artifacts <= 0.0
            && self.artistic.all_zero()
    }

    /// True if every value is finite
    pub fn is_finite(&self) -> bool {
        [
            self.zoom,
            self.rotation,
            self.hue_shift,
            self.saturation,
            self.brightness,
            self.blur,
            self.glitch,
            self.artifacts,
        ]
        .iter()
        .chain(self.artistic.0.iter())
        .all(|v| v.is_finite())
    }
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self::NEUTRAL
    }
}
