//! Frame source and sink abstractions

use crate::{MediaError, Result};
use image::RgbImage;
use std::collections::VecDeque;

/// Static properties of a frame stream, queried once when it opens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub fps: f64,
    /// Number of frames, possibly estimated from the container duration
    pub frame_count: usize,
}

impl VideoMetadata {
    /// Stream duration in seconds
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// A sequential reader of decoded RGB frames
pub trait FrameSource {
    /// Stream properties
    fn metadata(&self) -> VideoMetadata;

    /// Next frame, or `None` at end of stream
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// A sequential writer of RGB frames
pub trait FrameSink {
    /// Append one frame; frames are written strictly in call order
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and finalize the output
    fn close(&mut self) -> Result<()>;
}

/// Reject a frame whose size differs from the stream's
pub(crate) fn check_dimensions(expected: (u32, u32), frame: &RgbImage) -> Result<()> {
    if frame.dimensions() != expected {
        return Err(MediaError::Decode(format!(
            "frame is {}x{}, stream expects {}x{}",
            frame.width(),
            frame.height(),
            expected.0,
            expected.1
        )));
    }
    Ok(())
}

/// Frames held in memory, mainly for previews and tests
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
    metadata: VideoMetadata,
}

impl MemorySource {
    /// Serve `frames` at `fps`; dimensions come from the first frame
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            metadata: VideoMetadata {
                width,
                height,
                fps,
                frame_count: frames.len(),
            },
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

/// Collects written frames in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Vec<RgbImage>,
    closed: bool,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames written so far
    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    /// Whether [`FrameSink::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take ownership of the written frames
    pub fn into_frames(self) -> Vec<RgbImage> {
        self.frames
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.closed {
            return Err(MediaError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink already closed",
            )));
        }
        if let Some(first) = self.frames.first() {
            check_dimensions(first.dimensions(), frame)?;
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
