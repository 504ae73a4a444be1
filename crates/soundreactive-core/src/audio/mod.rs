//! Offline audio analysis
//!
//! The analysis runs once per render job:
//! [`AudioSignal`] -> [`Spectrogram`] -> band energy curves + onset sets.

pub mod analysis;
pub mod bands;
pub mod onsets;
pub mod signal;
pub mod spectrogram;

pub use analysis::{
    analyze_bands, analyze_legacy, legacy_from_signal, AnalysisConfig, AudioAnalysis,
    LegacyAnalysis,
};
pub use bands::{
    extract_band_energy, normalize, BandCurves, BandRange, BandRanges, FrequencyBand,
    NORMALIZE_EPSILON,
};
pub use onsets::{detect_peaks, percentile, OnsetConfig};
pub use signal::AudioSignal;
pub use spectrogram::{bin_frequencies, compute_spectrogram, Spectrogram, SpectrogramConfig};
