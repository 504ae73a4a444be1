//! Resampling between spectrogram timing and output frame timing

use crate::audio::BandCurves;
use crate::reactive::BandSample;
use tracing::debug;

/// `n` evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be ascending. Values outside the axis clamp to the end points;
/// an empty axis yields 0.
pub fn interp(x: f64, xp: &[f64], fp: &[f32]) -> f32 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return 0.0;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First index with xp[i] > x; guaranteed to be in 1..n
    let hi = xp[..n].partition_point(|&v| v <= x);
    let lo = hi - 1;
    let span = xp[hi] - xp[lo];
    if span <= 0.0 {
        return fp[lo];
    }
    let frac = ((x - xp[lo]) / span) as f32;
    fp[lo] + (fp[hi] - fp[lo]) * frac
}

/// Centered moving average with zero padding, output the same length as the input
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let offset = (window - 1) / 2;
    let n = values.len() as isize;
    (0..values.len())
        .map(|i| {
            let center = (i + offset) as isize;
            let sum: f32 = (0..window as isize)
                .map(|k| center - k)
                .filter(|&j| j >= 0 && j < n)
                .map(|j| values[j as usize])
                .sum();
            sum / window as f32
        })
        .collect()
}

/// Band curves resampled onto the output frame timeline
#[derive(Debug, Clone)]
pub struct FrameTimeline {
    times: Vec<f64>,
    curves: [Vec<f32>; 5],
}

impl FrameTimeline {
    /// Resample `curves` to `frame_count` points spread over `[0, duration]`.
    ///
    /// When `smoothness` is high enough to give a window of more than one
    /// frame (`floor(smoothness * 5)`), each resampled curve is passed
    /// through a moving average.
    pub fn new(curves: &BandCurves, duration: f64, frame_count: usize, smoothness: f32) -> Self {
        let times = linspace(0.0, duration, frame_count);
        let window = (smoothness.max(0.0) * 5.0) as usize;

        let resampled: [Vec<f32>; 5] = std::array::from_fn(|band| {
            let source = &curves.curves()[band];
            let curve: Vec<f32> = times
                .iter()
                .map(|&t| interp(t, curves.times(), source))
                .collect();
            if window > 1 {
                moving_average(&curve, window)
            } else {
                curve
            }
        });

        debug!(
            "Resampled {} spectrogram frames onto {} output frames ({:.3}s, smoothing window {})",
            curves.len(),
            frame_count,
            duration,
            window
        );

        Self {
            times,
            curves: resampled,
        }
    }

    /// Number of output frames covered
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if the timeline covers no frames
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Sampling time of each output frame
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Band values for output frame `index`; indices past the end reuse the last frame
    pub fn sample(&self, index: usize) -> BandSample {
        if self.times.is_empty() {
            return BandSample::default();
        }
        let i = index.min(self.times.len() - 1);
        BandSample::from_array(std::array::from_fn(|b| self.curves[b][i]))
    }
}
