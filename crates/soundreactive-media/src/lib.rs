//! SoundReactive Media - Decoding, Frame I/O and Transcoding
//!
//! This crate connects the analysis and rendering crates to files, including:
//! - Audio decoding (WAV via `hound`, compressed formats via `symphonia`)
//! - Frame source/sink traits with still image, image list and raw-video
//!   implementations
//! - PNG sequence output
//! - An out-of-process `ffmpeg` runner for probing, audio extraction and muxing

#![warn(missing_docs)]

use thiserror::Error;

pub mod audio;
pub mod ffmpeg;
pub mod frame_io;
pub mod image_source;
pub mod png_sink;
pub mod transcode;

pub use audio::{decode_audio, load_audio, DecodedAudio};
pub use ffmpeg::{FfmpegSink, FfmpegSource, VIDEO_CODECS};
pub use frame_io::{FrameSink, FrameSource, MemorySink, MemorySource, VideoMetadata};
pub use image_source::{
    is_supported_image, load_image, ImageSequence, StillImageSource, MAX_SEQUENCE_IMAGES,
};
pub use png_sink::PngSequenceSink;
pub use transcode::{loop_count, TranscodeConfig, Transcoder};

/// Media errors
#[derive(Error, Debug)]
pub enum MediaError {
    /// The file is missing or cannot be opened
    #[error("Failed to open file: {0}")]
    FileOpen(String),

    /// The file opened but its contents cannot be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The external tool exited unsuccessfully or could not be started
    #[error("Process failed (exit code {exit_code:?}): {stderr}")]
    Process {
        /// Exit code, `None` when the process never ran or was killed by a signal
        exit_code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The external tool ran past its deadline and was killed
    #[error("{command} timed out after {seconds:.1}s")]
    Timeout {
        /// Program and operation that timed out
        command: String,
        /// Deadline that was exceeded
        seconds: f64,
    },

    /// None of the candidate encoders is available
    #[error("No usable video codec: {0}")]
    CodecUnavailable(String),

    /// Filesystem or pipe error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;
