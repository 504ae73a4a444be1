//! Short-time Fourier transform magnitude spectrogram
//!
//! Frames are centered: the signal is zero-padded by `fft_size / 2` on both
//! sides, so frame `i` is centered on sample `i * hop_length`. This gives
//! `len / hop_length + 1` frames (integer division) for any input length,
//! including a single all-zero frame for an empty signal.

use super::signal::AudioSignal;
use crate::{ConfigError, Result};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::debug;

/// STFT parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Analysis sample rate; audio is resampled to this before the STFT
    pub sample_rate: u32,
    /// FFT window length in samples
    pub fft_size: usize,
    /// Samples between successive frames
    pub hop_length: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            fft_size: 2048,
            hop_length: 512,
        }
    }
}

impl SpectrogramConfig {
    /// Validate the STFT parameters
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::new("sample_rate", "must be greater than zero"));
        }
        if self.fft_size < 2 || self.fft_size % 2 != 0 {
            return Err(ConfigError::new(
                "fft_size",
                format!("must be an even number >= 2, got {}", self.fft_size),
            ));
        }
        if self.hop_length == 0 {
            return Err(ConfigError::new("hop_length", "must be greater than zero"));
        }
        Ok(())
    }

    /// Number of frequency bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Magnitude spectrogram indexed by `[bin, frame]`
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Frame-major storage: `bin_count` magnitudes per frame
    magnitudes: Vec<f32>,
    bin_count: usize,
    frame_count: usize,
    frame_times: Vec<f64>,
    frequencies: Vec<f32>,
    sample_rate: u32,
    hop_length: usize,
}

impl Spectrogram {
    /// Build a spectrogram from frame-major magnitudes.
    ///
    /// Mostly useful for tests that need a hand-crafted spectrum.
    pub fn from_frames(
        frames: Vec<Vec<f32>>,
        sample_rate: u32,
        fft_size: usize,
        hop_length: usize,
    ) -> Result<Self> {
        let bin_count = fft_size / 2 + 1;
        if frames.iter().any(|f| f.len() != bin_count) {
            return Err(crate::CoreError::InvalidInput(format!(
                "every frame must hold {} bins",
                bin_count
            )));
        }
        let frame_count = frames.len();
        let magnitudes = frames.into_iter().flatten().collect();
        Ok(Self {
            magnitudes,
            bin_count,
            frame_count,
            frame_times: frame_times(frame_count, sample_rate, hop_length),
            frequencies: bin_frequencies(sample_rate, fft_size),
            sample_rate,
            hop_length,
        })
    }

    /// Magnitude at `(bin, frame)`
    pub fn magnitude(&self, bin: usize, frame: usize) -> f32 {
        self.magnitudes[frame * self.bin_count + bin]
    }

    /// All bin magnitudes for one frame
    pub fn frame(&self, frame: usize) -> &[f32] {
        let start = frame * self.bin_count;
        &self.magnitudes[start..start + self.bin_count]
    }

    /// Number of time frames
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of frequency bins (`fft_size / 2 + 1`)
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Time of each frame in seconds
    pub fn frame_times(&self) -> &[f64] {
        &self.frame_times
    }

    /// Center frequency of each bin in Hz
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Sample rate the spectrogram was computed at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Hop length in samples
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Convert a frame index to seconds
    pub fn frame_to_seconds(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_length as f64 / self.sample_rate as f64
    }
}

/// Hz center of every FFT bin: `k * sample_rate / fft_size` for `k` in `0..=fft_size/2`
pub fn bin_frequencies(sample_rate: u32, fft_size: usize) -> Vec<f32> {
    let bin_width = sample_rate as f64 / fft_size as f64;
    (0..=fft_size / 2)
        .map(|k| (k as f64 * bin_width) as f32)
        .collect()
}

fn frame_times(frame_count: usize, sample_rate: u32, hop_length: usize) -> Vec<f64> {
    (0..frame_count)
        .map(|i| i as f64 * hop_length as f64 / sample_rate as f64)
        .collect()
}

/// Periodic Hann window (the DFT-even form used for spectral analysis)
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Run a centered STFT over `signal` and return magnitudes.
///
/// The signal is analyzed at its own sample rate; callers resample first if
/// they need a specific analysis rate.
pub fn compute_spectrogram(signal: &AudioSignal, config: &SpectrogramConfig) -> Result<Spectrogram> {
    config.validate()?;

    let fft_size = config.fft_size;
    let hop = config.hop_length;
    let pad = fft_size / 2;
    let samples = signal.samples();
    let frame_count = samples.len() / hop + 1;
    let bin_count = config.bin_count();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = hann_window(fft_size);

    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];
    let mut magnitudes = Vec::with_capacity(frame_count * bin_count);

    for frame in 0..frame_count {
        // Window start in padded coordinates is frame * hop; shift back by pad
        let start = (frame * hop) as isize - pad as isize;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let idx = start + i as isize;
            let sample = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process_with_scratch(&mut buffer, &mut scratch);
        magnitudes.extend(buffer[..bin_count].iter().map(|c| c.norm()));
    }

    debug!(
        "Computed spectrogram: {} frames x {} bins (fft={}, hop={}, sr={})",
        frame_count,
        bin_count,
        fft_size,
        hop,
        signal.sample_rate()
    );

    Ok(Spectrogram {
        magnitudes,
        bin_count,
        frame_count,
        frame_times: frame_times(frame_count, signal.sample_rate(), hop),
        frequencies: bin_frequencies(signal.sample_rate(), fft_size),
        sample_rate: signal.sample_rate(),
        hop_length: hop,
    })
}
