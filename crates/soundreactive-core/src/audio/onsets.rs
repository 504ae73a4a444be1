//! Percentile-threshold peak picking

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Peak-picking parameters for one onset detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetConfig {
    /// Percentile of the curve used as the minimum peak height (0-100)
    pub threshold_percentile: f32,
    /// Minimum separation between retained peaks, in spectrogram frames
    pub min_distance: usize,
}

impl OnsetConfig {
    /// Bass beat detector defaults
    pub const BASS_BEATS: OnsetConfig = OnsetConfig {
        threshold_percentile: 75.0,
        min_distance: 10,
    };

    /// Snare hit detector defaults
    pub const SNARE_HITS: OnsetConfig = OnsetConfig {
        threshold_percentile: 70.0,
        min_distance: 8,
    };

    /// Legacy bass-drum detector
    pub const LEGACY_BASS_DRUM: OnsetConfig = OnsetConfig {
        threshold_percentile: 75.0,
        min_distance: 10,
    };

    /// Legacy treble-peak detector
    pub const LEGACY_TREBLE: OnsetConfig = OnsetConfig {
        threshold_percentile: 70.0,
        min_distance: 5,
    };

    /// Validate the detector parameters
    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        crate::check_range(
            &format!("{}.threshold_percentile", field),
            self.threshold_percentile,
            0.0,
            100.0,
        )?;
        if self.min_distance == 0 {
            return Err(ConfigError::new(
                format!("{}.min_distance", field),
                "must be at least 1 frame",
            ));
        }
        Ok(())
    }
}

/// Percentile with linear interpolation between order statistics.
///
/// Returns 0.0 for an empty slice.
pub fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (pct.clamp(0.0, 100.0) as f64 / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Local maxima of `curve`.
///
/// A sample qualifies when it rises strictly from its left neighbour and the
/// following run of equal values ends in a strictly lower sample. For a flat
/// top the middle index (rounded down) is reported. The first and last
/// samples never qualify.
fn local_maxima(curve: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if curve.len() < 3 {
        return peaks;
    }
    let last = curve.len() - 1;
    let mut i = 1;
    while i < last {
        if curve[i - 1] < curve[i] {
            let mut ahead = i + 1;
            while ahead < last && curve[ahead] == curve[i] {
                ahead += 1;
            }
            if curve[ahead] < curve[i] {
                let left = i;
                let right = ahead - 1;
                peaks.push((left + right) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Pick onset frames from a normalized curve.
///
/// The height threshold is the `threshold_percentile` of the curve. Among the
/// local maxima at or above it, peaks are kept greedily from the highest down;
/// each kept peak discards any remaining peak strictly closer than
/// `min_distance` frames. Equal heights favour the earlier frame. The result
/// is sorted ascending.
pub fn detect_peaks(curve: &[f32], config: &OnsetConfig) -> Vec<usize> {
    let threshold = percentile(curve, config.threshold_percentile);
    let candidates: Vec<usize> = local_maxima(curve)
        .into_iter()
        .filter(|&p| curve[p] >= threshold)
        .collect();

    if config.min_distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        curve[candidates[b]]
            .partial_cmp(&curve[candidates[a]])
            .unwrap_or(Ordering::Equal)
            // Ties go to the earlier frame, unlike scipy's find_peaks which keeps the later one
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; candidates.len()];
    for &idx in &order {
        if !keep[idx] {
            continue;
        }
        let peak = candidates[idx];

        let mut left = idx;
        while left > 0 && peak - candidates[left - 1] < config.min_distance {
            left -= 1;
            keep[left] = false;
        }
        let mut right = idx + 1;
        while right < candidates.len() && candidates[right] - peak < config.min_distance {
            keep[right] = false;
            right += 1;
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_distance: usize) -> OnsetConfig {
        OnsetConfig {
            threshold_percentile: 0.0,
            min_distance,
        }
    }

    #[test]
    fn test_percentile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 75.0) - 4.0).abs() < 1e-6);
        assert!((percentile(&[0.0, 1.0], 70.0) - 0.7).abs() < 1e-6);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_local_maxima_edges_ignored() {
        assert_eq!(local_maxima(&[5.0, 1.0, 5.0]), Vec::<usize>::new());
        assert_eq!(local_maxima(&[0.0, 1.0, 0.0]), vec![1]);
    }

    #[test]
    fn test_plateau_reports_middle() {
        assert_eq!(local_maxima(&[0.0, 1.0, 1.0, 1.0, 0.0]), vec![2]);
        assert_eq!(local_maxima(&[0.0, 1.0, 1.0, 0.0]), vec![1]);
        // Plateau that keeps rising is not a peak
        assert_eq!(local_maxima(&[0.0, 1.0, 1.0, 2.0, 0.0]), vec![3]);
        // Plateau running into the last sample is not a peak
        assert_eq!(local_maxima(&[0.0, 1.0, 1.0]), Vec::<usize>::new());
    }

    #[test]
    fn test_threshold_filters_low_peaks() {
        let curve = [0.0, 0.2, 0.0, 0.9, 0.0, 0.3, 0.0];
        let cfg = OnsetConfig {
            threshold_percentile: 90.0,
            min_distance: 1,
        };
        // 90th percentile of the curve is 0.54
        assert_eq!(detect_peaks(&curve, &cfg), vec![3]);
    }

    #[test]
    fn test_peaks_exactly_min_distance_apart_both_kept() {
        let mut curve = vec![0.0; 20];
        curve[3] = 1.0;
        curve[13] = 0.8;
        assert_eq!(detect_peaks(&curve, &config(10)), vec![3, 13]);
    }

    #[test]
    fn test_closer_peaks_keep_higher() {
        let mut curve = vec![0.0; 20];
        curve[3] = 0.8;
        curve[12] = 1.0;
        assert_eq!(detect_peaks(&curve, &config(10)), vec![12]);
    }

    #[test]
    fn test_greedy_suppression_chain() {
        // Middle peak is highest and suppresses both neighbours
        let mut curve = vec![0.0; 30];
        curve[5] = 0.5;
        curve[10] = 1.0;
        curve[15] = 0.6;
        curve[25] = 0.4;
        assert_eq!(detect_peaks(&curve, &config(6)), vec![10, 25]);
    }

    #[test]
    fn test_equal_heights_prefer_earlier() {
        let mut curve = vec![0.0; 10];
        curve[2] = 1.0;
        curve[4] = 1.0;
        assert_eq!(detect_peaks(&curve, &config(5)), vec![2]);
    }

    #[test]
    fn test_flat_curve_has_no_peaks() {
        assert!(detect_peaks(&[0.0; 50], &OnsetConfig::BASS_BEATS).is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(OnsetConfig::BASS_BEATS.validate("bass").is_ok());
        let bad = OnsetConfig {
            threshold_percentile: 120.0,
            min_distance: 3,
        };
        assert_eq!(
            bad.validate("bass").unwrap_err().field,
            "bass.threshold_percentile"
        );
    }
}
