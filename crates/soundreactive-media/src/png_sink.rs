//! Numbered PNG file output

use crate::frame_io::{check_dimensions, FrameSink};
use crate::{MediaError, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Writes each frame as `{prefix}_{index:06}.png` inside a directory
#[derive(Debug)]
pub struct PngSequenceSink {
    directory: PathBuf,
    prefix: String,
    created_directory: bool,
    dimensions: Option<(u32, u32)>,
    next_index: usize,
    closed: bool,
}

impl PngSequenceSink {
    /// Create `directory` if needed and write frames into it
    pub fn create<P: AsRef<Path>>(directory: P, prefix: impl Into<String>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let created_directory = !directory.exists();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            prefix: prefix.into(),
            created_directory,
            dimensions: None,
            next_index: 0,
            closed: false,
        })
    }

    /// Path the frame with `index` is written to
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.directory
            .join(format!("{}_{:06}.png", self.prefix, index))
    }

    /// Frames written so far
    pub fn frames_written(&self) -> usize {
        self.next_index
    }

    /// Delete every frame written so far, then the directory if this sink created it.
    ///
    /// Files that were already in the directory are left alone. The sink is
    /// closed afterwards.
    pub fn discard(&mut self) -> Result<()> {
        self.closed = true;
        // The frame at `next_index` may be half written by a failed save
        for index in 0..=self.next_index {
            let path = self.frame_path(index);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        let removed = self.next_index;
        self.next_index = 0;
        if self.created_directory {
            if let Err(e) = std::fs::remove_dir(&self.directory) {
                warn!("Could not remove {}: {}", self.directory.display(), e);
            }
        }
        info!(
            "Discarded {} partial frames in {}",
            removed,
            self.directory.display()
        );
        Ok(())
    }
}

impl FrameSink for PngSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.closed {
            return Err(MediaError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink already closed",
            )));
        }
        match self.dimensions {
            Some(expected) => check_dimensions(expected, frame)?,
            None => self.dimensions = Some(frame.dimensions()),
        }

        let path = self.frame_path(self.next_index);
        frame
            .save(&path)
            .map_err(|e| MediaError::Io(std::io::Error::other(format!("{}: {}", path.display(), e))))?;
        debug!("Wrote {}", path.display());
        self.next_index += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            info!(
                "PNG sequence finished: {} frames in {}",
                self.next_index,
                self.directory.display()
            );
        }
        Ok(())
    }
}
