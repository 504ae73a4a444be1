//! Decoded mono PCM audio

use crate::{CoreError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::sync::Arc;
use tracing::debug;

/// Input frames handed to the resampler per call
const RESAMPLE_CHUNK: usize = 4096;

/// Decoded mono audio held in memory for the duration of a render job.
///
/// Samples are shared behind an `Arc` so analysis stages can hold the signal
/// without copying; the buffer is never mutated after construction.
#[derive(Debug, Clone)]
pub struct AudioSignal {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Wrap already-decoded mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CoreError::InvalidInput(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(CoreError::InvalidInput(
                "audio contains non-finite samples".to_string(),
            ));
        }
        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    /// Build a mono signal from interleaved multi-channel samples by averaging channels
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(CoreError::InvalidInput(
                "channel count must be greater than zero".to_string(),
            ));
        }
        let mono = if channels == 1 {
            interleaved.to_vec()
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };
        Self::new(mono, sample_rate)
    }

    /// Mono samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the signal holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Resample to `target_rate` with a band-limited sinc resampler.
    ///
    /// Content above the target Nyquist frequency is filtered out rather than
    /// folded back into the spectrum. The output is trimmed to
    /// `round(len * target_rate / sample_rate)` samples with the filter delay
    /// removed. Returns a cheap clone when the rate already matches.
    pub fn resampled(&self, target_rate: u32) -> Result<Self> {
        if target_rate == 0 {
            return Err(CoreError::InvalidInput(
                "target sample rate must be greater than zero".to_string(),
            ));
        }
        if target_rate == self.sample_rate || self.samples.is_empty() {
            return Ok(Self {
                samples: Arc::clone(&self.samples),
                sample_rate: target_rate,
            });
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let src_len = self.samples.len();
        let dst_len = ((src_len as f64) * ratio).round().max(1.0) as usize;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
            .map_err(resample_error)?;
        let delay = resampler.output_delay();
        let mut output: Vec<f32> = Vec::with_capacity(dst_len + delay + RESAMPLE_CHUNK);

        let mut pos = 0;
        while src_len - pos >= resampler.input_frames_next() {
            let next = resampler.input_frames_next();
            let chunk: [&[f32]; 1] = [&self.samples[pos..pos + next]];
            let out = resampler.process(&chunk[..], None).map_err(resample_error)?;
            output.extend_from_slice(&out[0]);
            pos += next;
        }
        if pos < src_len {
            let chunk: [&[f32]; 1] = [&self.samples[pos..]];
            let out = resampler
                .process_partial(Some(&chunk[..]), None)
                .map_err(resample_error)?;
            output.extend_from_slice(&out[0]);
        }
        // Flush the filter tail
        while output.len() < dst_len + delay {
            let out = resampler
                .process_partial(None::<&[&[f32]]>, None)
                .map_err(resample_error)?;
            if out[0].is_empty() {
                break;
            }
            output.extend_from_slice(&out[0]);
        }

        let mut resampled: Vec<f32> = output.into_iter().skip(delay).take(dst_len).collect();
        resampled.resize(dst_len, 0.0);

        debug!(
            "Resampled audio {} Hz -> {} Hz ({} -> {} samples)",
            self.sample_rate,
            target_rate,
            src_len,
            resampled.len()
        );

        Ok(Self {
            samples: resampled.into(),
            sample_rate: target_rate,
        })
    }
}

fn resample_error(err: impl std::fmt::Display) -> CoreError {
    CoreError::InvalidInput(format!("resampling failed: {}", err))
}
