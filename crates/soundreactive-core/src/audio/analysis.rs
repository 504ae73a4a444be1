//! Band analysis: energy curves plus onset sets, computed once per render job

use super::bands::{extract_band_energy, normalize, BandCurves, BandRange, BandRanges, FrequencyBand};
use super::onsets::{detect_peaks, OnsetConfig};
use super::signal::AudioSignal;
use super::spectrogram::{compute_spectrogram, Spectrogram, SpectrogramConfig};
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything that controls the offline audio analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// STFT parameters
    pub spectrogram: SpectrogramConfig,
    /// Band ranges, including the snare sub-window
    pub bands: BandRanges,
    /// Bass beat detector
    pub bass_onsets: OnsetConfig,
    /// Snare hit detector
    pub snare_onsets: OnsetConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnalysisConfig {
    /// Analysis configuration with the standard detector defaults
    pub fn standard() -> Self {
        Self {
            spectrogram: SpectrogramConfig::default(),
            bands: BandRanges::default(),
            bass_onsets: OnsetConfig::BASS_BEATS,
            snare_onsets: OnsetConfig::SNARE_HITS,
        }
    }

    /// Validate every nested parameter
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.spectrogram.validate().map_err(|e| e.within("spectrogram"))?;
        self.bands.validate().map_err(|e| e.within("bands"))?;
        self.bass_onsets.validate("bass_onsets")?;
        self.snare_onsets.validate("snare_onsets")
    }
}

/// Result of the band analysis
#[derive(Debug, Clone)]
pub struct AudioAnalysis {
    /// Normalized curves for the five named bands
    pub curves: BandCurves,
    /// Spectrogram frame indices of bass beats
    pub bass_beats: Vec<usize>,
    /// Spectrogram frame indices of snare hits
    pub snare_hits: Vec<usize>,
    /// Duration of the analyzed audio in seconds
    pub duration: f64,
}

impl AudioAnalysis {
    /// Resample `signal` to the analysis rate, run the STFT and analyze the bands
    pub fn from_signal(signal: &AudioSignal, config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let signal = signal.resampled(config.spectrogram.sample_rate)?;
        let spectrogram = compute_spectrogram(&signal, &config.spectrogram)?;
        let mut analysis = analyze_bands(&spectrogram, config)?;
        analysis.duration = signal.duration();
        Ok(analysis)
    }

    /// Bass beat times in seconds
    pub fn bass_beat_times(&self) -> Vec<f64> {
        self.onset_times(&self.bass_beats)
    }

    /// Snare hit times in seconds
    pub fn snare_hit_times(&self) -> Vec<f64> {
        self.onset_times(&self.snare_hits)
    }

    fn onset_times(&self, frames: &[usize]) -> Vec<f64> {
        let times = self.curves.times();
        frames.iter().filter_map(|&f| times.get(f).copied()).collect()
    }
}

/// Extract and normalize the five named bands and detect bass beats and snare hits
pub fn analyze_bands(spectrogram: &Spectrogram, config: &AnalysisConfig) -> Result<AudioAnalysis> {
    let curves: [Vec<f32>; 5] = std::array::from_fn(|i| {
        let band = FrequencyBand::ALL[i];
        normalize(&extract_band_energy(spectrogram, config.bands.get(band)))
    });

    let bass_beats = detect_peaks(&curves[FrequencyBand::Bass.index()], &config.bass_onsets);
    let snare_curve = normalize(&extract_band_energy(spectrogram, config.bands.snare));
    let snare_hits = detect_peaks(&snare_curve, &config.snare_onsets);

    for band in FrequencyBand::ALL {
        let curve = &curves[band.index()];
        let mean = if curve.is_empty() {
            0.0
        } else {
            curve.iter().sum::<f32>() / curve.len() as f32
        };
        debug!("Band {:<12} mean energy {:.3}", band.name(), mean);
    }
    info!(
        "Band analysis: {} frames, {} bass beats, {} snare hits",
        spectrogram.frame_count(),
        bass_beats.len(),
        snare_hits.len()
    );

    let duration = spectrogram.frame_count().saturating_sub(1) as f64
        * spectrogram.hop_length() as f64
        / spectrogram.sample_rate() as f64;

    Ok(AudioAnalysis {
        curves: BandCurves::new(spectrogram.frame_times().to_vec(), curves)?,
        bass_beats,
        snare_hits,
        duration,
    })
}

/// Two-band analysis used by the peak-driven render mode
#[derive(Debug, Clone)]
pub struct LegacyAnalysis {
    /// Spectrogram frame times in seconds
    pub frame_times: Vec<f64>,
    /// Normalized kick-drum energy
    pub bass_energy: Vec<f32>,
    /// Normalized treble energy
    pub treble_energy: Vec<f32>,
    /// Kick-drum onset frames
    pub bass_frames: Vec<usize>,
    /// Treble peak frames
    pub treble_frames: Vec<usize>,
}

impl LegacyAnalysis {
    /// Kick-drum onset times in seconds
    pub fn bass_times(&self) -> Vec<f64> {
        self.bass_frames.iter().map(|&f| self.frame_times[f]).collect()
    }

    /// Treble peak times in seconds
    pub fn treble_times(&self) -> Vec<f64> {
        self.treble_frames.iter().map(|&f| self.frame_times[f]).collect()
    }
}

/// Detect kick drums and treble peaks over the given ranges
pub fn analyze_legacy(
    spectrogram: &Spectrogram,
    bass_range: BandRange,
    treble_range: BandRange,
) -> LegacyAnalysis {
    let bass_energy = normalize(&extract_band_energy(spectrogram, bass_range));
    let treble_energy = normalize(&extract_band_energy(spectrogram, treble_range));
    let bass_frames = detect_peaks(&bass_energy, &OnsetConfig::LEGACY_BASS_DRUM);
    let treble_frames = detect_peaks(&treble_energy, &OnsetConfig::LEGACY_TREBLE);

    info!(
        "Legacy analysis: {} bass drum hits ({}-{} Hz), {} treble peaks ({}-{} Hz)",
        bass_frames.len(),
        bass_range.min_hz,
        bass_range.max_hz,
        treble_frames.len(),
        treble_range.min_hz,
        treble_range.max_hz
    );

    LegacyAnalysis {
        frame_times: spectrogram.frame_times().to_vec(),
        bass_energy,
        treble_energy,
        bass_frames,
        treble_frames,
    }
}

/// Convenience wrapper: resample, run the STFT and the legacy analysis
pub fn legacy_from_signal(signal: &AudioSignal, config: &SpectrogramConfig) -> Result<LegacyAnalysis> {
    let signal = signal.resampled(config.sample_rate)?;
    let spectrogram = compute_spectrogram(&signal, config)?;
    Ok(analyze_legacy(
        &spectrogram,
        BandRange::BASS_DRUM,
        BandRange::TREBLE_PEAK,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config_validates() {
        assert!(AnalysisConfig::standard().validate().is_ok());
    }

    #[test]
    fn test_nested_config_error_path() {
        let mut config = AnalysisConfig::standard();
        config.spectrogram.hop_length = 0;
        assert_eq!(
            config.validate().unwrap_err().field,
            "spectrogram.hop_length"
        );
    }

    #[test]
    fn test_analyze_bands_curve_lengths() {
        let signal = AudioSignal::new(vec![0.0; 5000], 22050).unwrap();
        let analysis = AudioAnalysis::from_signal(&signal, &AnalysisConfig::standard()).unwrap();
        assert_eq!(analysis.curves.len(), 5000 / 512 + 1);
        for band in FrequencyBand::ALL {
            assert_eq!(analysis.curves.get(band).len(), analysis.curves.len());
        }
    }

    #[test]
    fn test_onset_times_map_frames() {
        let analysis = AudioAnalysis {
            curves: BandCurves::silent(vec![0.0, 0.5, 1.0]),
            bass_beats: vec![1],
            snare_hits: vec![0, 2],
            duration: 1.0,
        };
        assert_eq!(analysis.bass_beat_times(), vec![0.5]);
        assert_eq!(analysis.snare_hit_times(), vec![0.0, 1.0]);
    }
}
