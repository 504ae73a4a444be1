//! Still images and image lists

use crate::frame_io::{FrameSource, VideoMetadata};
use crate::{MediaError, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Maximum number of images collected from one directory
///
/// Keeps an accidental pick of a huge folder from loading thousands of files.
#[cfg(not(test))]
pub const MAX_SEQUENCE_IMAGES: usize = 5000;
#[cfg(test)]
pub const MAX_SEQUENCE_IMAGES: usize = 10;

/// Check whether the file extension is a supported still image format
pub fn is_supported_image<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|ext| {
            matches!(
                ext.to_string_lossy().to_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp"
            )
        })
        .unwrap_or(false)
}

/// Load an image file as 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MediaError::FileOpen(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let image = image::open(path)
        .map_err(|e| MediaError::Decode(format!("Failed to load image {}: {}", path.display(), e)))?
        .to_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(MediaError::Decode(format!(
            "Image has zero size: {}",
            path.display()
        )));
    }
    info!(
        "Image loaded: {}x{} from {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(image)
}

/// One still image repeated for a fixed number of frames
#[derive(Debug, Clone)]
pub struct StillImageSource {
    frame: RgbImage,
    metadata: VideoMetadata,
    emitted: usize,
}

impl StillImageSource {
    /// Repeat `frame` `frame_count` times at `fps`
    pub fn new(frame: RgbImage, fps: f64, frame_count: usize) -> Self {
        Self {
            metadata: VideoMetadata {
                width: frame.width(),
                height: frame.height(),
                fps,
                frame_count,
            },
            frame,
            emitted: 0,
        }
    }

    /// Load `path` and repeat it `frame_count` times at `fps`
    pub fn open<P: AsRef<Path>>(path: P, fps: f64, frame_count: usize) -> Result<Self> {
        Ok(Self::new(load_image(path)?, fps, frame_count))
    }
}

impl FrameSource for StillImageSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.emitted >= self.metadata.frame_count {
            return Ok(None);
        }
        self.emitted += 1;
        Ok(Some(self.frame.clone()))
    }
}

/// An ordered list of image files, loaded on demand
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
}

impl ImageSequence {
    /// Collect the supported images directly inside `directory`, sorted by file name
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(MediaError::FileOpen(format!(
                "Directory not found: {}",
                directory.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(directory)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !is_supported_image(path) {
                continue;
            }
            if paths.len() >= MAX_SEQUENCE_IMAGES {
                warn!(
                    "Image list exceeded limit of {} images. Truncating list from {}",
                    MAX_SEQUENCE_IMAGES,
                    directory.display()
                );
                break;
            }
            paths.push(path.to_path_buf());
        }

        if paths.is_empty() {
            return Err(MediaError::FileOpen(format!(
                "No image files found in directory: {}",
                directory.display()
            )));
        }
        info!("Image list: {} images from {}", paths.len(), directory.display());
        Ok(Self { paths })
    }

    /// Use the given files in the given order
    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        if paths.is_empty() {
            return Err(MediaError::FileOpen("image list is empty".to_string()));
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(MediaError::FileOpen(format!(
                "File not found: {}",
                missing.display()
            )));
        }
        Ok(Self { paths })
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if the list holds no images
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Image paths in order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Decode image `index`
    pub fn load(&self, index: usize) -> Result<RgbImage> {
        let path = self.paths.get(index).ok_or_else(|| {
            MediaError::FileOpen(format!(
                "image index {} out of range ({} images)",
                index,
                self.paths.len()
            ))
        })?;
        load_image(path)
    }

    /// Decode every image
    pub fn load_all(&self) -> Result<Vec<RgbImage>> {
        self.paths.iter().map(load_image).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image("a.PNG"));
        assert!(is_supported_image("dir/b.jpeg"));
        assert!(is_supported_image("c.webp"));
        assert!(!is_supported_image("d.gif"));
        assert!(!is_supported_image("noext"));
    }

    #[test]
    fn test_still_source_repeats() {
        let mut source = StillImageSource::new(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])), 30.0, 4);
        assert_eq!(source.metadata().frame_count, 4);
        let mut count = 0;
        while let Some(frame) = source.read_frame().unwrap() {
            assert_eq!(frame.dimensions(), (3, 2));
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_sequence_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "c.png"] {
            RgbImage::new(2, 2).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let seq = ImageSequence::open(dir.path()).unwrap();
        let names: Vec<String> = seq
            .paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(seq.load(1).unwrap().dimensions(), (2, 2));
        assert!(seq.load(3).is_err());
    }

    #[test]
    fn test_sequence_limit() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..(MAX_SEQUENCE_IMAGES + 3) {
            RgbImage::new(1, 1).save(dir.path().join(format!("f{:03}.png", i))).unwrap();
        }
        assert_eq!(ImageSequence::open(dir.path()).unwrap().len(), MAX_SEQUENCE_IMAGES);
    }

    #[test]
    fn test_empty_directory_and_corrupt_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ImageSequence::open(dir.path()), Err(MediaError::FileOpen(_))));

        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, b"not a png").unwrap();
        assert!(matches!(load_image(&bad), Err(MediaError::Decode(_))));
    }
}
