use proptest::prelude::*;
use soundreactive_core::{
    compute_spectrogram, detect_peaks, extract_band_energy, legacy_from_signal, normalize,
    AnalysisConfig, AudioAnalysis, AudioSignal, BandCurves, BandRange, FrameTimeline,
    FrequencyBand, OnsetConfig, SpectrogramConfig,
};
use std::f32::consts::PI;

const SR: u32 = 22050;

fn sine_burst(freq: f32, seconds: f32, burst: (f32, f32)) -> Vec<f32> {
    let len = (seconds * SR as f32) as usize;
    let fade = 0.05 * SR as f32;
    let (start, end) = (burst.0 * SR as f32, burst.1 * SR as f32);
    (0..len)
        .map(|i| {
            let n = i as f32;
            if n < start || n >= end {
                return 0.0;
            }
            // Raised-cosine edges keep the burst band-limited
            let edge = ((n - start).min(end - n) / fade).min(1.0);
            let envelope = 0.5 - 0.5 * (PI * edge).cos();
            envelope * (2.0 * PI * freq * n / SR as f32).sin()
        })
        .collect()
}

fn kick_track(kick_times: &[f32], seconds: f32) -> Vec<f32> {
    let len = (seconds * SR as f32) as usize;
    let mut samples = vec![0.0f32; len];
    for &t in kick_times {
        let start = (t * SR as f32) as usize;
        for i in 0..(0.15 * SR as f32) as usize {
            if let Some(s) = samples.get_mut(start + i) {
                let n = i as f32 / SR as f32;
                *s += (-n * 30.0).exp() * (2.0 * PI * 80.0 * n).sin();
            }
        }
    }
    samples
}

#[test]
fn test_low_sine_burst_drives_bass_only() {
    let signal = AudioSignal::new(sine_burst(80.0, 2.0, (0.5, 1.5)), SR).unwrap();
    let spec = compute_spectrogram(&signal, &SpectrogramConfig::default()).unwrap();

    let config = AnalysisConfig::default();
    let bass = extract_band_energy(&spec, config.bands.bass);
    let treble = extract_band_energy(&spec, config.bands.treble);

    let bass_max = bass.iter().cloned().fold(0.0f32, f32::max);
    let treble_max = treble.iter().cloned().fold(0.0f32, f32::max);
    assert!(bass_max > 100.0, "bass peak too small: {}", bass_max);
    assert!(
        treble_max < bass_max * 1e-3,
        "treble leakage {} vs bass {}",
        treble_max,
        bass_max
    );

    let analysis = AudioAnalysis::from_signal(&signal, &config).unwrap();
    let bass_curve = analysis.curves.get(FrequencyBand::Bass);
    assert_eq!(bass_curve.iter().cloned().fold(0.0f32, f32::max), 1.0);
    // Silent lead-in stays at the curve minimum
    assert_eq!(bass_curve[2], 0.0);
}

#[test]
fn test_silence_yields_zero_curves_and_no_onsets() {
    let signal = AudioSignal::new(vec![0.0; SR as usize], SR).unwrap();
    let analysis = AudioAnalysis::from_signal(&signal, &AnalysisConfig::default()).unwrap();

    for band in FrequencyBand::ALL {
        assert!(analysis.curves.get(band).iter().all(|&v| v == 0.0));
    }
    assert!(analysis.bass_beats.is_empty());
    assert!(analysis.snare_hits.is_empty());
    assert!((analysis.duration - 1.0).abs() < 1e-9);
}

#[test]
fn test_kick_track_beats_follow_kicks() {
    let kicks: Vec<f32> = (0..8).map(|k| 0.25 + 0.5 * k as f32).collect();
    let signal = AudioSignal::new(kick_track(&kicks, 4.2), SR).unwrap();
    let analysis = AudioAnalysis::from_signal(&signal, &AnalysisConfig::default()).unwrap();

    let beats = analysis.bass_beat_times();
    assert!(
        (6..=8).contains(&beats.len()),
        "expected one beat per kick, got {:?}",
        beats
    );
    for beat in beats {
        let nearest = kicks
            .iter()
            .map(|&k| (beat - k as f64).abs())
            .fold(f64::INFINITY, f64::min);
        assert!(nearest < 0.25, "beat at {:.3}s is not near a kick", beat);
    }
}

#[test]
fn test_resampled_signal_matches_analysis_rate() {
    let samples = sine_burst(80.0, 1.0, (0.0, 1.0));
    let signal = AudioSignal::new(samples, 44100).unwrap();
    let analysis = AudioAnalysis::from_signal(&signal, &AnalysisConfig::default()).unwrap();
    // 1 s at 22050 Hz with hop 512 -> floor(22050 / 512) + 1 frames
    assert_eq!(analysis.curves.len(), 22050 / 512 + 1);
}

fn tone_at(freq: f32, sample_rate: u32) -> AudioSignal {
    let samples = (0..sample_rate)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect();
    AudioSignal::new(samples, sample_rate).unwrap()
}

#[test]
fn test_downsampled_ultrasonic_tone_stays_out_of_high_treble() {
    let config = AnalysisConfig::default();
    let high_treble = |freq: f32| {
        let signal = tone_at(freq, 44100).resampled(SR).unwrap();
        let spec = compute_spectrogram(&signal, &SpectrogramConfig::default()).unwrap();
        extract_band_energy(&spec, config.bands.high_treble)
            .iter()
            .sum::<f32>()
    };

    // 15 kHz sits above the 11025 Hz Nyquist limit; 7050 Hz is where it would fold to
    let folded = high_treble(15000.0);
    let in_band = high_treble(7050.0);
    assert!(in_band > 0.0);
    assert!(
        folded < in_band * 0.01,
        "15 kHz leaked into high_treble: {} vs {}",
        folded,
        in_band
    );
}

#[test]
fn test_peaks_exactly_min_distance_apart() {
    let mut curve = vec![0.0f32; 30];
    curve[5] = 1.0;
    curve[15] = 0.9;
    let config = OnsetConfig {
        threshold_percentile: 50.0,
        min_distance: 10,
    };
    assert_eq!(detect_peaks(&curve, &config), vec![5, 15]);

    curve[15] = 0.0;
    curve[14] = 0.9;
    assert_eq!(detect_peaks(&curve, &config), vec![5]);
}

#[test]
fn test_frame_timeline_reproduces_curve_at_sample_points() {
    let n = 40;
    let hop_seconds = 512.0 / SR as f64;
    let times: Vec<f64> = (0..n).map(|i| i as f64 * hop_seconds).collect();
    let curves = std::array::from_fn(|b| {
        (0..n)
            .map(|i| ((i * (b + 1)) % 7) as f32 / 6.0)
            .collect::<Vec<f32>>()
    });
    let band_curves = BandCurves::new(times.clone(), curves).unwrap();
    let duration = times[n - 1];

    let timeline = FrameTimeline::new(&band_curves, duration, n, 0.0);
    assert_eq!(timeline.len(), n);
    for i in 0..n {
        let expected = band_curves.at(i);
        let actual = timeline.sample(i).to_array();
        for b in 0..5 {
            assert!(
                (expected[b] - actual[b]).abs() < 1e-4,
                "frame {} band {}: {} vs {}",
                i,
                b,
                expected[b],
                actual[b]
            );
        }
    }
}

#[test]
fn test_still_image_frame_count() {
    // Five seconds of audio at 30 fps
    let duration = 5.0f64;
    let fps = 30.0f64;
    let frames = (duration * fps).round() as usize;
    let curves = BandCurves::silent(vec![0.0, duration]);
    let timeline = FrameTimeline::new(&curves, duration, frames, 0.8);
    assert_eq!(timeline.len(), 150);
    assert_eq!(timeline.times()[149], 5.0);
}

#[test]
fn test_legacy_analysis_on_kicks() {
    let kicks: Vec<f32> = (0..4).map(|k| 0.25 + 0.5 * k as f32).collect();
    let signal = AudioSignal::new(kick_track(&kicks, 2.2), 44100).unwrap();
    let legacy = legacy_from_signal(&signal, &SpectrogramConfig::default()).unwrap();
    assert_eq!(legacy.bass_energy.len(), legacy.frame_times.len());
    assert!(!legacy.bass_frames.is_empty());
    assert!(legacy.bass_energy.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn test_invalid_analysis_config_reports_field() {
    let mut config = AnalysisConfig::default();
    config.spectrogram.hop_length = 0;
    let signal = AudioSignal::new(vec![0.0; 1024], SR).unwrap();
    let err = AudioAnalysis::from_signal(&signal, &config).unwrap_err();
    assert!(err.to_string().contains("spectrogram.hop_length"), "{}", err);
}

#[test]
fn test_band_range_constants() {
    assert!(BandRange::BASS_DRUM.contains(40.0));
    assert!(BandRange::BASS_DRUM.contains(100.0));
    assert!(!BandRange::TREBLE_PEAK.contains(2999.0));
}

proptest! {
    #[test]
    fn prop_band_energy_matches_frame_count(len in 0usize..6000, hop_pow in 7u32..10) {
        let hop = 1usize << hop_pow;
        let samples: Vec<f32> = (0..len).map(|i| ((i * 31) % 17) as f32 / 17.0 - 0.5).collect();
        let signal = AudioSignal::new(samples, SR).unwrap();
        let config = SpectrogramConfig { sample_rate: SR, fft_size: 1024, hop_length: hop };
        let spec = compute_spectrogram(&signal, &config).unwrap();
        prop_assert_eq!(spec.frame_count(), len / hop + 1);
        prop_assert_eq!(spec.bin_count(), 513);
        let energy = extract_band_energy(&spec, BandRange::new(60.0, 250.0));
        prop_assert_eq!(energy.len(), spec.frame_count());
    }

    #[test]
    fn prop_normalize_in_unit_range(raw in prop::collection::vec(-1.0e4f32..1.0e4, 0..200)) {
        let curve = normalize(&raw);
        prop_assert_eq!(curve.len(), raw.len());
        prop_assert!(curve.iter().all(|v| (0.0..=1.0).contains(v)));

        let min = raw.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let flat = raw.is_empty() || max - min < 1e-8;
        prop_assert_eq!(curve.iter().all(|&v| v == 0.0), flat);
    }

    #[test]
    fn prop_peaks_sorted_and_separated(
        curve in prop::collection::vec(0.0f32..1.0, 0..300),
        min_distance in 1usize..20,
        pct in 0.0f32..100.0,
    ) {
        let config = OnsetConfig { threshold_percentile: pct, min_distance };
        let peaks = detect_peaks(&curve, &config);
        for pair in peaks.windows(2) {
            prop_assert!(pair[1] > pair[0]);
            prop_assert!(pair[1] - pair[0] >= min_distance);
        }
        if let (Some(first), Some(last)) = (peaks.first(), peaks.last()) {
            prop_assert!(*first > 0);
            prop_assert!(*last < curve.len() - 1);
        }
    }
}
