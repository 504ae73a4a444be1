//! Exponential temporal smoothing of artistic effect intensities

use super::effects::ArtisticEffect;

/// Previous smoothed intensity of every artistic effect.
///
/// Owned by a single render job and reset when the job starts. An effect
/// that has never been active has no previous value; its first smoothed
/// output equals its raw input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectSmoothingState {
    previous: [Option<f32>; 8],
}

impl EffectSmoothingState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all previous values
    pub fn reset(&mut self) {
        self.previous = [None; 8];
    }

    /// Previous smoothed value of `effect`, if any
    pub fn previous(&self, effect: ArtisticEffect) -> Option<f32> {
        self.previous[effect.index()]
    }

    /// `α * raw + (1 - α) * previous` with `α = 1 - smoothing_factor`.
    ///
    /// Stores and returns the smoothed value.
    pub fn apply(&mut self, effect: ArtisticEffect, raw: f32, smoothing_factor: f32) -> f32 {
        let alpha = 1.0 - smoothing_factor.clamp(0.0, 1.0);
        let smoothed = match self.previous[effect.index()] {
            Some(prev) => alpha * raw + (1.0 - alpha) * prev,
            None => raw,
        };
        self.previous[effect.index()] = Some(smoothed);
        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_seeds_with_raw() {
        let mut state = EffectSmoothingState::new();
        assert_eq!(state.apply(ArtisticEffect::Vhs, 0.8, 0.3), 0.8);
        assert_eq!(state.previous(ArtisticEffect::Vhs), Some(0.8));
        assert_eq!(state.previous(ArtisticEffect::ScanLines), None);
    }

    #[test]
    fn test_step_response_rises_without_overshoot() {
        let mut state = EffectSmoothingState::new();
        let factor = 0.3;
        let inputs = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let outputs: Vec<f32> = inputs
            .iter()
            .map(|&x| state.apply(ArtisticEffect::PixelSort, x, factor))
            .collect();

        assert_eq!(&outputs[..3], &[0.0, 0.0, 0.0]);
        for pair in outputs[3..].windows(2) {
            assert!(pair[1] > pair[0], "not strictly increasing: {:?}", outputs);
        }
        assert!(outputs.iter().all(|&v| v <= 1.0));

        // Residual after n steps is factor^n
        let frames_to_converge = (1e-3f32.ln() / factor.ln()).ceil() as usize;
        let settled = outputs[3 + frames_to_converge - 1];
        assert!(1.0 - settled <= 1e-3, "settled = {}", settled);
    }

    #[test]
    fn test_zero_factor_is_passthrough() {
        let mut state = EffectSmoothingState::new();
        state.apply(ArtisticEffect::Kaleidoscope, 0.2, 0.0);
        assert_eq!(state.apply(ArtisticEffect::Kaleidoscope, 0.9, 0.0), 0.9);
    }

    #[test]
    fn test_reset() {
        let mut state = EffectSmoothingState::new();
        state.apply(ArtisticEffect::Kaleidoscope, 0.2, 0.5);
        state.reset();
        assert_eq!(state, EffectSmoothingState::new());
    }
}
