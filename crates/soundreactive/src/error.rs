//! Render job errors

use soundreactive_core::{ConfigError, CoreError};
use soundreactive_media::MediaError;
use soundreactive_render::RenderError;
use thiserror::Error;

/// Why a render job failed
#[derive(Error, Debug)]
pub enum JobError {
    /// A missing or unreadable input (audio, video, image)
    #[error("Input error: {0}")]
    Input(String),

    /// The external transcoder failed or timed out
    #[error("External process failed: {0}")]
    Process(#[source] MediaError),

    /// A setting is out of range; reported before any work starts
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The output cannot be created or written
    #[error("Resource error: {0}")]
    Resource(String),

    /// A frame could not be composited
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Cancelled between frames
    #[error("Render cancelled")]
    Cancelled,
}

impl JobError {
    /// True if an external process ran past its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Process(MediaError::Timeout { .. }))
    }
}

impl From<MediaError> for JobError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::FileOpen(msg) | MediaError::Decode(msg) => JobError::Input(msg),
            MediaError::CodecUnavailable(msg) => JobError::Resource(msg),
            MediaError::Io(e) => JobError::Resource(e.to_string()),
            err @ (MediaError::Process { .. } | MediaError::Timeout { .. }) => JobError::Process(err),
        }
    }
}

impl From<CoreError> for JobError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => JobError::Input(msg),
            CoreError::Config(e) => JobError::Config(e),
            CoreError::Io(e) => JobError::Resource(e.to_string()),
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Resource(err.to_string())
    }
}

/// Result type for render jobs
pub type Result<T> = std::result::Result<T, JobError>;
