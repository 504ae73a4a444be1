//! Out-of-process transcoding through `ffmpeg` / `ffprobe`
//!
//! Every invocation runs under a deadline. Standard error is captured on a
//! helper thread so a chatty process can never block on a full pipe.

use crate::frame_io::VideoMetadata;
use crate::{MediaError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a running child is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Where the external tools live and how long they may run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// `ffmpeg` executable
    pub ffmpeg: PathBuf,
    /// `ffprobe` executable
    pub ffprobe: PathBuf,
    /// Deadline for one-shot operations (probe, extract, merge), in seconds
    pub timeout_secs: f64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout_secs: 600.0,
        }
    }
}

/// Number of times audio must play back to back to cover the video
pub fn loop_count(video_duration: f64, audio_duration: f64) -> u32 {
    if audio_duration <= 0.0 || video_duration <= audio_duration {
        return 1;
    }
    (video_duration / audio_duration).ceil() as u32
}

/// Runs `ffmpeg` and `ffprobe`
#[derive(Debug, Clone, Default)]
pub struct Transcoder {
    config: TranscodeConfig,
}

impl Transcoder {
    /// Create a runner
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// Tool locations and deadline
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.config.timeout_secs.max(0.0))
    }

    /// Read stream properties of the first video stream
    pub fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        if !path.is_file() {
            return Err(MediaError::FileOpen(format!(
                "File not found: {}",
                path.display()
            )));
        }
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            "v:0".into(),
            "-show_entries".into(),
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration".into(),
            "-of".into(),
            "json".into(),
            path.into(),
        ];
        let stdout = self.run_capture(&self.config.ffprobe, &args, "probe")?;
        parse_probe(&stdout)
    }

    /// Extract the audio track of `video` into a 16-bit PCM WAV file
    pub fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<()> {
        info!("Extracting audio from {}", video.display());
        self.run_ffmpeg(&extract_audio_args(video, audio_out), "extract audio")
    }

    /// Remux `video` with `audio`, copying the video stream
    pub fn merge_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        info!("Merging {} with audio {}", video.display(), audio.display());
        self.run_ffmpeg(&merge_audio_args(video, audio, output), "merge audio")
    }

    /// Write `audio` played `loops` times back to back, trimmed to `duration` seconds
    pub fn loop_audio(&self, audio: &Path, loops: u32, duration: f64, output: &Path) -> Result<()> {
        debug!("Looping {} x{} to {:.2}s", audio.display(), loops, duration);
        self.run_ffmpeg(&loop_audio_args(audio, loops, duration, output), "loop audio")
    }

    /// Merge, looping the audio first when the video is longer
    pub fn merge_audio_looped(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        video_duration: f64,
        audio_duration: f64,
    ) -> Result<()> {
        let loops = loop_count(video_duration, audio_duration);
        if loops <= 1 {
            return self.merge_audio(video, audio, output);
        }

        info!(
            "Video ({:.2}s) is longer than audio ({:.2}s); looping audio {} times",
            video_duration, audio_duration, loops
        );
        let looped = output.with_extension("looped.wav");
        self.loop_audio(audio, loops, video_duration, &looped)?;
        let merged = self.merge_audio(video, &looped, output);
        if let Err(e) = std::fs::remove_file(&looped) {
            warn!("Could not remove {}: {}", looped.display(), e);
        }
        merged
    }

    /// Encoders reported by `ffmpeg -encoders`
    pub fn encoders(&self) -> Result<Vec<String>> {
        let args: Vec<OsString> = vec!["-hide_banner".into(), "-encoders".into()];
        let stdout = self.run_capture(&self.config.ffmpeg, &args, "list encoders")?;
        Ok(parse_encoders(&stdout))
    }

    /// First of `candidates` that this `ffmpeg` can encode with
    pub fn select_encoder<'a>(&self, candidates: &[&'a str]) -> Result<&'a str> {
        let available = self.encoders()?;
        for (i, candidate) in candidates.iter().enumerate() {
            if available.iter().any(|e| e == candidate) {
                if i > 0 {
                    warn!(
                        "Encoder {} unavailable, falling back to {}",
                        candidates[0], candidate
                    );
                }
                return Ok(candidate);
            }
        }
        Err(MediaError::CodecUnavailable(format!(
            "none of [{}] is available",
            candidates.join(", ")
        )))
    }

    fn run_ffmpeg(&self, args: &[OsString], operation: &str) -> Result<()> {
        self.run_capture(&self.config.ffmpeg, args, operation).map(|_| ())
    }

    /// Run a program to completion under the configured deadline, returning stdout
    fn run_capture(&self, program: &Path, args: &[OsString], operation: &str) -> Result<String> {
        debug!("Running {} {:?}", program.display(), args);
        let mut child = spawn(
            Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            program,
        )?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let label = format!("{} ({})", program.display(), operation);
        let status = wait_with_timeout(&mut child, self.timeout(), &label);

        let stdout = join_output(stdout);
        let stderr = join_output(stderr);
        check_status(status?, stderr)?;
        Ok(stdout)
    }
}

/// Spawn, turning a launch failure into a process error
pub(crate) fn spawn(command: &mut Command, program: &Path) -> Result<Child> {
    command.spawn().map_err(|e| MediaError::Process {
        exit_code: None,
        stderr: format!("failed to start {}: {}", program.display(), e),
    })
}

/// Read a pipe to the end on a helper thread
pub(crate) fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

pub(crate) fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Poll `child` until it exits, killing it once `timeout` has passed
pub(crate) fn wait_with_timeout(child: &mut Child, timeout: Duration, label: &str) -> Result<ExitStatus> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            warn!("{} exceeded {:.1}s, killing it", label, timeout.as_secs_f64());
            let _ = child.kill();
            let _ = child.wait();
            return Err(MediaError::Timeout {
                command: label.to_string(),
                seconds: timeout.as_secs_f64(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

pub(crate) fn check_status(status: ExitStatus, stderr: String) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(MediaError::Process {
        exit_code: status.code(),
        stderr: stderr.trim().to_string(),
    })
}

fn os_args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    items.into_iter().map(|s| s.as_ref().to_os_string()).collect()
}

pub(crate) fn extract_audio_args(video: &Path, audio_out: &Path) -> Vec<OsString> {
    let mut args = os_args(["-y", "-v", "error", "-i"]);
    args.push(video.into());
    args.extend(os_args(["-vn", "-acodec", "pcm_s16le"]));
    args.push(audio_out.into());
    args
}

pub(crate) fn merge_audio_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args = os_args(["-y", "-v", "error", "-i"]);
    args.push(video.into());
    args.push("-i".into());
    args.push(audio.into());
    args.extend(os_args([
        "-c:v", "copy", "-c:a", "aac", "-b:a", "192k", "-map", "0:v:0", "-map", "1:a:0",
        "-shortest",
    ]));
    args.push(output.into());
    args
}

pub(crate) fn loop_audio_args(audio: &Path, loops: u32, duration: f64, output: &Path) -> Vec<OsString> {
    let mut args = os_args(["-y", "-v", "error", "-stream_loop"]);
    args.push(loops.saturating_sub(1).to_string().into());
    args.push("-i".into());
    args.push(audio.into());
    args.push("-t".into());
    args.push(format!("{:.3}", duration).into());
    args.extend(os_args(["-c:a", "pcm_s16le"]));
    args.push(output.into());
    args
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Parse a rate such as `30000/1001` or `25`
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

pub(crate) fn parse_probe(json: &str) -> Result<VideoMetadata> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::Decode(format!("unreadable ffprobe output: {}", e)))?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::Decode("no video stream".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::Decode("video stream has no frame size".to_string())),
    };
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| MediaError::Decode("video stream has no frame rate".to_string()))?;

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<usize>().ok())
        .or_else(|| {
            stream
                .duration
                .as_deref()
                .and_then(|d| d.trim().parse::<f64>().ok())
                .map(|d| (d * fps).round().max(0.0) as usize)
        })
        .unwrap_or(0);

    Ok(VideoMetadata {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Encoder names from `ffmpeg -encoders`: lines like ` V....D libx264 ...`
fn parse_encoders(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            (flags.len() == 6).then(|| name.to_string())
        })
        .collect()
}
