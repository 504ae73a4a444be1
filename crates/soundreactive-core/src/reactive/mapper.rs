//! Per-frame mapping from band energy to effect parameters

use super::config::ReactivityConfig;
use super::effects::ArtisticEffect;
use super::params::{BandSample, EffectParameters};
use super::smoothing::EffectSmoothingState;
use crate::audio::{AudioAnalysis, BandCurves};
use crate::Result;
use tracing::{debug, trace};

const WEIGHT_EPSILON: f32 = 1e-8;

/// Sorted onset times supporting nearest-onset queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnsetTimeline {
    times: Vec<f64>,
}

impl OnsetTimeline {
    /// Build from onset times in seconds; non-finite values are dropped
    pub fn new(mut times: Vec<f64>) -> Self {
        times.retain(|t| t.is_finite());
        times.sort_by(|a, b| a.total_cmp(b));
        Self { times }
    }

    /// Onset times in ascending order
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// True if there are no onsets
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Distance in seconds from `t` to the closest onset
    pub fn nearest_distance(&self, t: f64) -> Option<f64> {
        if self.times.is_empty() {
            return None;
        }
        let idx = self.times.partition_point(|&x| x < t);
        let after = self.times.get(idx).map(|&x| x - t);
        let before = idx.checked_sub(1).map(|i| t - self.times[i]);
        match (before, after) {
            (Some(b), Some(a)) => Some(b.min(a)),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// `1 - distance / window` for the nearest onset within `window`, else `None`
    pub fn proximity(&self, t: f64, window: f32) -> Option<f32> {
        let distance = self.nearest_distance(t)?;
        let window = window as f64;
        if distance <= window {
            Some((1.0 - distance / window).clamp(0.0, 1.0) as f32)
        } else {
            None
        }
    }
}

/// Stateless mapping of band energy and onset proximity onto [`EffectParameters`].
///
/// The only mutable input is the caller-owned [`EffectSmoothingState`].
#[derive(Debug, Clone)]
pub struct ReactivityMapper {
    config: ReactivityConfig,
    bass_beats: OnsetTimeline,
    snare_hits: OnsetTimeline,
}

impl ReactivityMapper {
    /// Validate `config` and bind it to onset timelines
    pub fn new(
        config: ReactivityConfig,
        bass_beats: OnsetTimeline,
        snare_hits: OnsetTimeline,
    ) -> Result<Self> {
        config.validate()?;
        debug!(
            "Reactivity mapper: {} bass beats, {} snare hits, sensitivity {:.2}",
            bass_beats.times().len(),
            snare_hits.times().len(),
            config.intensity_sensitivity
        );
        Ok(Self {
            config,
            bass_beats,
            snare_hits,
        })
    }

    /// Convenience constructor taking onsets from a band analysis
    pub fn from_analysis(config: ReactivityConfig, analysis: &AudioAnalysis) -> Result<Self> {
        Self::new(
            config,
            OnsetTimeline::new(analysis.bass_beat_times()),
            OnsetTimeline::new(analysis.snare_hit_times()),
        )
    }

    /// The active configuration
    pub fn config(&self) -> &ReactivityConfig {
        &self.config
    }

    /// Sample `curves` at `t` against their own time axis, then [`ReactivityMapper::compute`]
    pub fn compute_at(
        &self,
        t: f64,
        curves: &BandCurves,
        state: &mut EffectSmoothingState,
    ) -> EffectParameters {
        let sample = BandSample::from_array(curves.sample(t));
        self.compute(t, &sample, state)
    }

    /// Compute the parameters for the output frame at time `t` (seconds)
    pub fn compute(
        &self,
        t: f64,
        bands: &BandSample,
        state: &mut EffectSmoothingState,
    ) -> EffectParameters {
        let cfg = &self.config;
        let sensitivity = cfg.intensity_sensitivity;
        let blend = |intensity: f32| (1.0 - sensitivity) + sensitivity * intensity;

        let bass_intensity = ((bands.sub_bass * cfg.sub_bass_zoom + bands.bass * cfg.bass_zoom)
            / (cfg.sub_bass_zoom + cfg.bass_zoom + WEIGHT_EPSILON))
            .clamp(0.0, 1.0);

        let zoom = if cfg.beat_triggered_zoom && !self.bass_beats.is_empty() {
            match self.bass_beats.proximity(t, cfg.beat_window) {
                Some(proximity) => {
                    let intensity = proximity * 0.7 + bass_intensity * 0.3;
                    1.0 + (cfg.zoom_factor - 1.0) * blend(intensity)
                }
                None => 1.0,
            }
        } else {
            1.0 + (cfg.zoom_factor - 1.0) * blend(bass_intensity)
        };

        let rotation_intensity = ((bands.treble * cfg.treble_rotation
            + bands.high_treble * cfg.high_treble_rotation)
            / (cfg.treble_rotation + cfg.high_treble_rotation + WEIGHT_EPSILON))
            .clamp(0.0, 1.0);
        let rotation = cfg.rotation_angle * blend(rotation_intensity);

        let (hue_shift, saturation) = if cfg.toggles.color_grading {
            (bands.mid * cfg.mid_hue_shift, 1.0 + bands.treble * 0.3)
        } else {
            (0.0, 1.0)
        };

        let mut brightness = if cfg.toggles.brightness {
            1.0 + (bands.bass + bands.mid) * 0.3
        } else {
            1.0
        };
        if cfg.snare_triggered_flash {
            if let Some(proximity) = self.snare_hits.proximity(t, cfg.snare_window) {
                brightness = (brightness + proximity * 0.8).clamp(1.0, 2.0);
            }
        }

        let blur = if cfg.toggles.blur { bands.bass * 0.5 } else { 0.0 };

        let treble_scale = 0.5 + sensitivity * 0.5;
        let glitch = if cfg.toggles.glitch {
            ((bands.treble * 0.6 + bands.high_treble * 0.4) * treble_scale).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let artifacts = if cfg.toggles.artifacts {
            ((bands.treble * 0.5 + bands.high_treble * 0.5) * treble_scale).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut params = EffectParameters {
            zoom,
            rotation,
            hue_shift,
            saturation,
            brightness,
            blur,
            glitch,
            artifacts,
            ..EffectParameters::NEUTRAL
        };

        for effect in ArtisticEffect::ALL {
            if !cfg.toggles.is_enabled(effect) {
                continue;
            }
            let mix = cfg.weights(effect).weighted_mix(bands);
            let raw = (mix * treble_scale).clamp(0.0, 1.0);
            params.artistic[effect] = state.apply(effect, raw, cfg.effect_smoothing);
        }

        trace!(
            "t={:.3}s zoom={:.3} rot={:.2} hue={:.1} bright={:.2}",
            t,
            params.zoom,
            params.rotation,
            params.hue_shift,
            params.brightness
        );

        params
    }
}
