//! Raw RGB frame pipes to and from an `ffmpeg` child process

use crate::frame_io::{check_dimensions, FrameSink, FrameSource, VideoMetadata};
use crate::transcode::{check_status, drain, join_output, spawn, wait_with_timeout, Transcoder};
use crate::{MediaError, Result};
use image::RgbImage;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Video encoders tried in order when writing a file
pub const VIDEO_CODECS: [&str; 2] = ["libx264", "mpeg4"];

/// Decodes a video file into RGB frames through `ffmpeg -f rawvideo`
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    metadata: VideoMetadata,
    buffer: Vec<u8>,
    finished: bool,
}

impl FfmpegSource {
    /// Probe `path` and start decoding it
    pub fn open(path: &Path, transcoder: &Transcoder) -> Result<Self> {
        let metadata = transcoder.probe(path)?;
        if metadata.frame_count == 0 {
            return Err(MediaError::Decode(format!(
                "{} contains no video frames",
                path.display()
            )));
        }

        let ffmpeg = &transcoder.config().ffmpeg;
        let mut child = spawn(
            Command::new(ffmpeg)
                .args(["-v", "error", "-i"])
                .arg(path)
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            ffmpeg,
        )?;
        let stdout = child.stdout.take().ok_or_else(|| MediaError::Process {
            exit_code: None,
            stderr: "ffmpeg stdout unavailable".to_string(),
        })?;
        let stderr = child.stderr.take().map(drain);

        info!(
            "Video opened: {}x{} @ {:.2} fps, {} frames from {}",
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.frame_count,
            path.display()
        );

        Ok(Self {
            child,
            stdout,
            stderr,
            buffer: vec![0; metadata.width as usize * metadata.height as usize * 3],
            metadata,
            finished: false,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }
        match self.stdout.read_exact(&mut self.buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finished = true;
                let status = self.child.wait()?;
                check_status(status, join_output(self.stderr.take()))?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
        let frame = RgbImage::from_raw(self.metadata.width, self.metadata.height, self.buffer.clone())
            .ok_or_else(|| MediaError::Decode("short frame buffer".to_string()))?;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Encodes RGB frames into a video file through `ffmpeg` reading stdin
pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    dimensions: (u32, u32),
    timeout: Duration,
    frames_written: usize,
    codec: &'static str,
}

impl FfmpegSink {
    /// Start an encoder writing `path`, picking the first available of [`VIDEO_CODECS`]
    pub fn create(path: &Path, width: u32, height: u32, fps: f64, transcoder: &Transcoder) -> Result<Self> {
        if width == 0 || height == 0 || !(fps.is_finite() && fps > 0.0) {
            return Err(MediaError::Decode(format!(
                "invalid output stream {}x{} @ {} fps",
                width, height, fps
            )));
        }
        let codec = transcoder.select_encoder(&VIDEO_CODECS)?;

        let ffmpeg = &transcoder.config().ffmpeg;
        let mut child = spawn(
            Command::new(ffmpeg)
                .args(sink_args(width, height, fps, codec))
                .arg(path)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped()),
            ffmpeg,
        )?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(drain);

        info!(
            "Encoding {}x{} @ {:.2} fps with {} to {}",
            width,
            height,
            fps,
            codec,
            path.display()
        );

        Ok(Self {
            child,
            stdin,
            stderr,
            dimensions: (width, height),
            timeout: Duration::from_secs_f64(transcoder.config().timeout_secs.max(0.0)),
            frames_written: 0,
            codec,
        })
    }

    /// Encoder chosen for this file
    pub fn codec(&self) -> &'static str {
        self.codec
    }

    /// Frames accepted so far
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Stop waiting for stdin, collect the exit status and captured stderr
    fn broken_pipe(&mut self) -> MediaError {
        self.stdin = None;
        let exit_code = self.child.wait().ok().and_then(|s| s.code());
        MediaError::Process {
            exit_code,
            stderr: join_output(self.stderr.take()).trim().to_string(),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        check_dimensions(self.dimensions, frame)?;
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            MediaError::Io(std::io::Error::new(ErrorKind::BrokenPipe, "encoder already closed"))
        })?;
        match stdin.write_all(frame.as_raw()) {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                warn!("Encoder exited after {} frames", self.frames_written);
                Err(self.broken_pipe())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        let Some(stdin) = self.stdin.take() else {
            return Ok(());
        };
        drop(stdin);
        debug!("Finalizing encoder after {} frames", self.frames_written);
        let status = wait_with_timeout(&mut self.child, self.timeout, "ffmpeg (encode)");
        let stderr = join_output(self.stderr.take());
        check_status(status?, stderr)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            // Dropped without close: the file is incomplete
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

fn sink_args(width: u32, height: u32, fps: f64, codec: &str) -> Vec<String> {
    [
        "-y",
        "-v",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
        &format!("{}x{}", width, height),
        "-r",
        &format!("{}", fps),
        "-i",
        "-",
        "-an",
        "-c:v",
        codec,
        "-vf",
        "scale=trunc(iw/2)*2:trunc(ih/2)*2",
        "-pix_fmt",
        "yuv420p",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
