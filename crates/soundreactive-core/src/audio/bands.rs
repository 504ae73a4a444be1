//! Frequency band energy extraction
//!
//! Bands are selected directly on the linear Hz axis of the spectrogram. A
//! mel-warped selection collapses the upper bands to almost nothing, so the
//! bin center frequencies are compared against the band limits as-is.

use super::spectrogram::Spectrogram;
use crate::timeline::interp;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Range below which a raw energy curve is considered flat
pub const NORMALIZE_EPSILON: f32 = 1e-8;

/// The five named analysis bands, in ascending frequency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyBand {
    /// 20-60 Hz
    SubBass,
    /// 60-250 Hz
    Bass,
    /// 250-2000 Hz
    Mid,
    /// 2-6 kHz
    Treble,
    /// 6-12 kHz
    HighTreble,
}

impl FrequencyBand {
    /// All bands in ascending order; also the index order of weight vectors
    pub const ALL: [FrequencyBand; 5] = [
        FrequencyBand::SubBass,
        FrequencyBand::Bass,
        FrequencyBand::Mid,
        FrequencyBand::Treble,
        FrequencyBand::HighTreble,
    ];

    /// Position of the band in [`FrequencyBand::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name
    pub fn name(self) -> &'static str {
        match self {
            FrequencyBand::SubBass => "sub_bass",
            FrequencyBand::Bass => "bass",
            FrequencyBand::Mid => "mid",
            FrequencyBand::Treble => "treble",
            FrequencyBand::HighTreble => "high_treble",
        }
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A frequency range in Hz; bins with `min_hz <= f <= max_hz` are included
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRange {
    /// Lower bound in Hz
    pub min_hz: f32,
    /// Upper bound in Hz
    pub max_hz: f32,
}

impl BandRange {
    /// Create a new range
    pub const fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    /// Legacy kick-drum range
    pub const BASS_DRUM: BandRange = BandRange::new(40.0, 100.0);
    /// Legacy treble-peak range
    pub const TREBLE_PEAK: BandRange = BandRange::new(3000.0, 8000.0);
    /// Snare detection sub-window; overlaps `mid` on purpose
    pub const SNARE: BandRange = BandRange::new(200.0, 500.0);

    /// True if `freq` lies within the range (inclusive both ends)
    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.min_hz && freq <= self.max_hz
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !self.min_hz.is_finite() || !self.max_hz.is_finite() || self.min_hz < 0.0 {
            return Err(ConfigError::new(field, "bounds must be finite and non-negative"));
        }
        if self.min_hz >= self.max_hz {
            return Err(ConfigError::new(
                field,
                format!(
                    "min_hz ({}) must be below max_hz ({})",
                    self.min_hz, self.max_hz
                ),
            ));
        }
        Ok(())
    }
}

/// Hz ranges for the five named bands plus the snare sub-window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandRanges {
    /// Sub-bass range
    pub sub_bass: BandRange,
    /// Bass range
    pub bass: BandRange,
    /// Mid range
    pub mid: BandRange,
    /// Treble range
    pub treble: BandRange,
    /// High-treble range
    pub high_treble: BandRange,
    /// Snare detection range, summed independently of `mid`
    pub snare: BandRange,
}

impl Default for BandRanges {
    fn default() -> Self {
        Self {
            sub_bass: BandRange::new(20.0, 60.0),
            bass: BandRange::new(60.0, 250.0),
            mid: BandRange::new(250.0, 2000.0),
            treble: BandRange::new(2000.0, 6000.0),
            high_treble: BandRange::new(6000.0, 12000.0),
            snare: BandRange::SNARE,
        }
    }
}

impl BandRanges {
    /// Range of a named band
    pub fn get(&self, band: FrequencyBand) -> BandRange {
        match band {
            FrequencyBand::SubBass => self.sub_bass,
            FrequencyBand::Bass => self.bass,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::Treble => self.treble,
            FrequencyBand::HighTreble => self.high_treble,
        }
    }

    /// Override the range of a named band
    pub fn set(&mut self, band: FrequencyBand, range: BandRange) {
        match band {
            FrequencyBand::SubBass => self.sub_bass = range,
            FrequencyBand::Bass => self.bass = range,
            FrequencyBand::Mid => self.mid = range,
            FrequencyBand::Treble => self.treble = range,
            FrequencyBand::HighTreble => self.high_treble = range,
        }
    }

    /// Check every range is well formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        for band in FrequencyBand::ALL {
            self.get(band).validate(band.name())?;
        }
        self.snare.validate("snare")
    }
}

/// Normalized energy curves for the five named bands on spectrogram timing
#[derive(Debug, Clone, PartialEq)]
pub struct BandCurves {
    times: Vec<f64>,
    curves: [Vec<f32>; 5],
}

impl BandCurves {
    /// Bundle curves with their time axis. Every curve must match `times` in length.
    pub fn new(times: Vec<f64>, curves: [Vec<f32>; 5]) -> crate::Result<Self> {
        if curves.iter().any(|c| c.len() != times.len()) {
            return Err(crate::CoreError::InvalidInput(
                "band curves must match the time axis length".to_string(),
            ));
        }
        Ok(Self { times, curves })
    }

    /// All-zero curves over `times`
    pub fn silent(times: Vec<f64>) -> Self {
        let n = times.len();
        Self {
            times,
            curves: std::array::from_fn(|_| vec![0.0; n]),
        }
    }

    /// Time axis in seconds
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Curve for one band
    pub fn get(&self, band: FrequencyBand) -> &[f32] {
        &self.curves[band.index()]
    }

    /// Number of samples per curve
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if the curves hold no samples
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Linearly interpolate every band at time `t` (seconds)
    pub fn sample(&self, t: f64) -> [f32; 5] {
        std::array::from_fn(|i| interp(t, &self.times, &self.curves[i]))
    }

    /// Values of every band at index `i`
    pub fn at(&self, i: usize) -> [f32; 5] {
        std::array::from_fn(|b| self.curves[b][i])
    }

    pub(crate) fn curves(&self) -> &[Vec<f32>; 5] {
        &self.curves
    }
}

/// Sum of magnitudes over bins in `range`, one value per spectrogram frame
pub fn extract_band_energy(spectrogram: &Spectrogram, range: BandRange) -> Vec<f32> {
    let bins: Vec<usize> = spectrogram
        .frequencies()
        .iter()
        .enumerate()
        .filter(|(_, &f)| range.contains(f))
        .map(|(i, _)| i)
        .collect();

    (0..spectrogram.frame_count())
        .map(|frame| {
            let magnitudes = spectrogram.frame(frame);
            bins.iter().map(|&b| magnitudes[b]).sum::<f32>()
        })
        .collect()
}

/// Min-max normalize to `[0, 1]`; flat input (range below [`NORMALIZE_EPSILON`]) maps to zeros
pub fn normalize(raw: &[f32]) -> Vec<f32> {
    let (min, max) = raw
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if raw.is_empty() || !range.is_finite() || range < NORMALIZE_EPSILON {
        return vec![0.0; raw.len()];
    }
    raw.iter()
        .map(|&v| ((v - min) / range).clamp(0.0, 1.0))
        .collect()
}
