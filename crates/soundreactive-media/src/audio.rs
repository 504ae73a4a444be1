//! Audio file decoding
//!
//! WAV files are read with `hound`; every other container goes through
//! `symphonia`. Both paths produce interleaved `f32` samples which are then
//! down-mixed to a mono [`AudioSignal`].

use crate::{MediaError, Result};
use soundreactive_core::AudioSignal;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Interleaved samples straight from the decoder
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples in `[-1, 1]`
    pub samples: Vec<f32>,
    /// Channel count
    pub channels: usize,
    /// Native sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.channels == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        (self.samples.len() / self.channels) as f64 / self.sample_rate as f64
    }

    /// Average the channels into a mono signal at the native rate
    pub fn to_mono(&self) -> Result<AudioSignal> {
        AudioSignal::from_interleaved(&self.samples, self.channels, self.sample_rate)
            .map_err(|e| MediaError::Decode(e.to_string()))
    }
}

/// Decode a whole audio file
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MediaError::FileOpen(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let is_wav = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let decoded = if is_wav {
        match decode_wav(path) {
            Ok(decoded) => decoded,
            Err(e) => {
                // Extensible WAV variants hound rejects can still decode through symphonia
                warn!("hound could not read {}: {}; retrying with symphonia", path.display(), e);
                decode_symphonia(path)?
            }
        }
    } else {
        decode_symphonia(path)?
    };

    info!(
        "Decoded {}: {} channel(s) @ {} Hz, {:.2}s",
        path.display(),
        decoded.channels,
        decoded.sample_rate,
        decoded.duration()
    );
    Ok(decoded)
}

/// Decode, down-mix to mono and resample to `sample_rate`
pub fn load_audio<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<AudioSignal> {
    let decoded = decode_audio(path)?;
    decoded
        .to_mono()?
        .resampled(sample_rate)
        .map_err(|e| MediaError::Decode(e.to_string()))
}

fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| MediaError::Decode(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MediaError::Decode(format!("{}: {}", path.display(), e)))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| MediaError::Decode(format!("{}: {}", path.display(), e)))?
        }
    };

    debug!(
        "hound: {} samples, {} bits, {:?}",
        samples.len(),
        spec.bits_per_sample,
        spec.sample_format
    );

    Ok(DecodedAudio {
        samples,
        channels: spec.channels.max(1) as usize,
        sample_rate: spec.sample_rate,
    })
}

fn decode_symphonia(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|e| MediaError::FileOpen(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MediaError::Decode(format!("{}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MediaError::Decode(format!("{}: no audio track", path.display())))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MediaError::Decode(format!("{}: {}", path.display(), e)))?;

    let mut samples = Vec::new();
    let mut buffer: Option<SampleBuffer<f32>> = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(MediaError::Decode(format!("{}: {}", path.display(), e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let too_small = buffer
                    .as_ref()
                    .map_or(true, |b| b.capacity() < decoded.capacity() * channels);
                if too_small {
                    buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = buffer.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping corrupt packet in {}: {}", path.display(), e);
            }
            Err(e) => return Err(MediaError::Decode(format!("{}: {}", path.display(), e))),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(MediaError::Decode(format!(
            "{}: unknown sample rate or channel layout",
            path.display()
        )));
    }

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}
