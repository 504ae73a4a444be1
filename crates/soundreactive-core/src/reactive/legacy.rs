//! Peak-driven zoom/rotation envelopes
//!
//! The older rendering mode ignores continuous band energy. Each bass-drum
//! onset starts a zoom pulse and each treble-peak onset a rotation swing,
//! both shaped by an ease-in-out curve over a fixed effect duration.

use crate::{ConfigError, Result};
use tracing::debug;

/// Default length of one envelope in seconds
pub const DEFAULT_EFFECT_DURATION: f32 = 0.5;

/// Cubic ease-in-out on `t` in `[0, 1]`
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Cubic ease-out on `t` in `[0, 1]`
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Quadratic ease-in-out on `t` in `[0, 1]`
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Per-frame zoom and rotation built from onset times
#[derive(Debug, Clone, PartialEq)]
pub struct PeakEffectMap {
    zoom: Vec<f32>,
    rotation: Vec<f32>,
}

impl PeakEffectMap {
    /// Build the map for `total_frames` output frames at `fps`.
    ///
    /// Zoom envelopes that overlap keep the larger value; rotation
    /// envelopes add up.
    pub fn build(
        bass_times: &[f64],
        treble_times: &[f64],
        fps: f64,
        total_frames: usize,
        zoom_factor: f32,
        rotation_angle: f32,
        effect_duration: f32,
    ) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ConfigError::new("fps", format!("must be positive, got {}", fps)).into());
        }
        if !zoom_factor.is_finite() || zoom_factor < 1.0 {
            return Err(ConfigError::new(
                "zoom_factor",
                format!("must be >= 1.0, got {}", zoom_factor),
            )
            .into());
        }
        if !effect_duration.is_finite() || effect_duration <= 0.0 {
            return Err(ConfigError::new(
                "effect_duration",
                format!("must be a positive number of seconds, got {}", effect_duration),
            )
            .into());
        }

        let mut zoom = vec![1.0f32; total_frames];
        let mut rotation = vec![0.0f32; total_frames];
        let effect_frames = (effect_duration as f64 * fps) as usize;

        for start in bass_times.iter().filter_map(|&t| time_to_frame(t, fps)) {
            for i in 0..effect_frames {
                let Some(slot) = zoom.get_mut(start + i) else {
                    break;
                };
                let progress = i as f32 / effect_frames as f32;
                let eased = ease_in_out_cubic(progress);
                let value = if progress < 0.5 {
                    1.0 + (zoom_factor - 1.0) * (eased * 2.0)
                } else {
                    zoom_factor + (1.0 - zoom_factor) * ((eased - 0.5) * 2.0)
                };
                *slot = slot.max(value);
            }
        }

        for start in treble_times.iter().filter_map(|&t| time_to_frame(t, fps)) {
            for i in 0..effect_frames {
                let Some(slot) = rotation.get_mut(start + i) else {
                    break;
                };
                let progress = i as f32 / effect_frames as f32;
                let eased = ease_in_out_cubic(progress);
                *slot += if progress < 0.5 {
                    rotation_angle * (eased * 2.0)
                } else {
                    rotation_angle * ((1.0 - eased) * 2.0)
                };
            }
        }

        debug!(
            "Peak effect map: {} frames, {} bass pulses, {} treble swings, {} frames each",
            total_frames,
            bass_times.len(),
            treble_times.len(),
            effect_frames
        );

        Ok(Self { zoom, rotation })
    }

    /// Number of frames covered
    pub fn len(&self) -> usize {
        self.zoom.len()
    }

    /// True if the map covers no frames
    pub fn is_empty(&self) -> bool {
        self.zoom.is_empty()
    }

    /// `(zoom, rotation)` for a frame; neutral past the end
    pub fn get(&self, frame: usize) -> (f32, f32) {
        match (self.zoom.get(frame), self.rotation.get(frame)) {
            (Some(&z), Some(&r)) => (z, r),
            _ => (1.0, 0.0),
        }
    }
}

fn time_to_frame(t: f64, fps: f64) -> Option<usize> {
    if t.is_finite() && t >= 0.0 {
        Some((t * fps) as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        let easings: [fn(f32) -> f32; 3] = [ease_in_out_cubic, ease_out_cubic, ease_in_out_quad];
        for ease in easings {
            assert!(ease(0.0).abs() < 1e-6);
            assert!((ease(1.0) - 1.0).abs() < 1e-6);
        }
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_quad(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_quad(0.25) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_pulse_shape() {
        let map = PeakEffectMap::build(&[1.0], &[], 10.0, 30, 1.5, 5.0, 0.5).unwrap();
        assert_eq!(map.len(), 30);
        // Pulse covers frames 10..15
        assert_eq!(map.get(9), (1.0, 0.0));
        assert_eq!(map.get(10).0, 1.0);
        assert!(map.get(11).0 > 1.0);
        assert!(map.get(12).0 > map.get(11).0);
        assert_eq!(map.get(15).0, 1.0);
        for f in 0..30 {
            let z = map.get(f).0;
            assert!((1.0..=1.5 + 1e-6).contains(&z));
        }
    }

    #[test]
    fn test_overlapping_zoom_takes_max() {
        let single = PeakEffectMap::build(&[1.0], &[], 10.0, 30, 1.5, 5.0, 0.5).unwrap();
        let double = PeakEffectMap::build(&[1.0, 1.1], &[], 10.0, 30, 1.5, 5.0, 0.5).unwrap();
        for f in 10..16 {
            assert!(double.get(f).0 >= single.get(f).0);
            assert!(double.get(f).0 <= 1.5 + 1e-6);
        }
    }

    #[test]
    fn test_overlapping_rotation_adds() {
        let single = PeakEffectMap::build(&[], &[1.0], 10.0, 30, 1.3, 5.0, 0.5).unwrap();
        let double = PeakEffectMap::build(&[], &[1.0, 1.0], 10.0, 30, 1.3, 5.0, 0.5).unwrap();
        for f in 10..15 {
            assert!((double.get(f).1 - 2.0 * single.get(f).1).abs() < 1e-5);
        }
    }

    #[test]
    fn test_pulse_truncated_at_end() {
        let map = PeakEffectMap::build(&[2.9], &[2.9], 10.0, 30, 1.3, 5.0, 0.5).unwrap();
        assert_eq!(map.len(), 30);
        assert_eq!(map.get(100), (1.0, 0.0));
    }

    #[test]
    fn test_invalid_fps_rejected() {
        assert!(PeakEffectMap::build(&[], &[], 0.0, 10, 1.3, 5.0, 0.5).is_err());
    }
}
