//! SoundReactive - Render Job Orchestration
//!
//! Ties the analysis, rendering and media crates together:
//! - [`RenderSettings`] with TOML/JSON presets
//! - [`SequenceRenderer`] for video, still image and slideshow sources
//! - [`RenderJob`] with progress events, cancellation and audio muxing

#![warn(missing_docs)]

pub mod error;
pub mod job;
pub mod logging_setup;
pub mod progress;
pub mod sequence;
pub mod settings;

pub use error::{JobError, Result};
pub use job::{AudioTrack, JobHandle, JobOutcome, RenderJob, RenderRequest, Source};
pub use progress::{CancelToken, ProgressEvent, ProgressReporter};
pub use sequence::{
    output_frame_count, ParameterSource, ProgressSpan, SequenceRenderer, Slideshow,
    CROSSFADE_SECONDS,
};
pub use settings::{FailurePolicy, ParameterMode, RenderSettings};
