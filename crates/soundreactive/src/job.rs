//! Render jobs: audio analysis, frame rendering and audio muxing
//!
//! A [`RenderJob`] runs start to finish on one thread. [`RenderJob::spawn`]
//! moves it to a worker and hands back a [`JobHandle`] carrying the progress
//! channel and the cancel token.

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver};
use image::imageops::{self, FilterType};
use image::RgbImage;
use soundreactive_core::{legacy_from_signal, AudioAnalysis, AudioSignal, FrameTimeline, PeakEffectMap, ReactivityMapper};
use soundreactive_media::{
    is_supported_image, load_audio, load_image, loop_count, FfmpegSink, FfmpegSource, FrameSink,
    FrameSource, ImageSequence, PngSequenceSink, StillImageSource, Transcoder,
};
use soundreactive_render::{FrameCompositor, FrameRng};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{JobError, Result};
use crate::progress::{CancelToken, ProgressEvent, ProgressReporter};
use crate::sequence::{output_frame_count, ParameterSource, ProgressSpan, SequenceRenderer, Slideshow};
use crate::settings::{ParameterMode, RenderSettings};

/// What the frames come from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A video file; its frame rate and length drive the output
    Video(PathBuf),
    /// One still image held for the length of the audio
    Image(PathBuf),
    /// Several images sharing the length of the audio
    Slideshow(Vec<PathBuf>),
}

impl Source {
    /// Directory -> slideshow, image file -> still image, anything else -> video
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.is_dir() {
            let sequence = ImageSequence::open(path)?;
            return Ok(Source::Slideshow(sequence.paths().to_vec()));
        }
        if !path.is_file() {
            return Err(JobError::Input(format!("File not found: {}", path.display())));
        }
        if is_supported_image(path) {
            Ok(Source::Image(path.to_path_buf()))
        } else {
            Ok(Source::Video(path.to_path_buf()))
        }
    }
}

/// Inputs of one render job
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Frame source
    pub source: Source,
    /// Audio file; video sources fall back to their own audio track
    pub audio: Option<PathBuf>,
    /// Output video file, or a directory for a PNG sequence when it has no extension
    pub output: PathBuf,
    /// Everything else
    pub settings: RenderSettings,
}

/// What happened to the soundtrack
#[derive(Debug, Clone, PartialEq)]
pub enum AudioTrack {
    /// Audio muxed into the output
    Merged,
    /// Audio looped `loops` times to cover the video, then muxed
    Looped {
        /// Number of back to back plays
        loops: u32,
    },
    /// Muxing failed; the silent video was kept
    Missing {
        /// Why the merge failed
        reason: String,
    },
    /// PNG sequences carry no audio
    None,
}

/// Result of a finished job
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Output path
    pub output: PathBuf,
    /// Frames written
    pub frames: usize,
    /// Seed of the randomized effects, for reproducing the render
    pub seed: u64,
    /// Soundtrack status
    pub audio: AudioTrack,
    /// When the job started
    pub started: DateTime<Local>,
    /// When the job finished
    pub finished: DateTime<Local>,
}

impl JobOutcome {
    /// True for the partial success where the video was kept without its audio
    pub fn saved_without_audio(&self) -> bool {
        matches!(self.audio, AudioTrack::Missing { .. })
    }
}

/// Removes a scratch file when dropped
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_file(&self.0) {
                warn!("Could not remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Everything needed to render frames, prepared before the first one
struct PreparedJob {
    source: Box<dyn FrameSource>,
    renderer: SequenceRenderer,
    audio_path: PathBuf,
    audio_duration: f64,
    seed: u64,
    _extracted: Option<ScratchFile>,
}

/// One render job
#[derive(Debug, Clone)]
pub struct RenderJob {
    request: RenderRequest,
    transcoder: Transcoder,
}

impl RenderJob {
    /// Validate the settings; nothing is read or written yet
    pub fn new(request: RenderRequest) -> Result<Self> {
        request.settings.validate()?;
        if request.audio.is_none() && !matches!(request.source, Source::Video(_)) {
            return Err(JobError::Input(
                "an audio file is required for image and slideshow sources".to_string(),
            ));
        }
        let transcoder = Transcoder::new(request.settings.transcode.clone());
        Ok(Self {
            request,
            transcoder,
        })
    }

    /// The job inputs
    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// Run on a worker thread
    pub fn spawn(self) -> JobHandle {
        let (sender, events) = unbounded();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let thread = thread::spawn(move || {
            let reporter = ProgressReporter::new(sender);
            let result = self.run(&reporter, &worker_cancel);
            if let Err(e) = &result {
                error!("Render job failed: {}", e);
                reporter.report(100, format!("Failed: {}", e));
            }
            result
        });
        JobHandle {
            events,
            cancel,
            thread,
        }
    }

    /// Render to the requested output, then add the audio
    pub fn run(&self, reporter: &ProgressReporter, cancel: &CancelToken) -> Result<JobOutcome> {
        let started = Local::now();
        let output = &self.request.output;
        info!("Render job started: {}", output.display());

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(JobError::Resource(format!(
                    "Output directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let mut prepared = self.prepare(reporter)?;
        let meta = prepared.source.metadata();
        let span = ProgressSpan {
            start: 10,
            end: 85,
            preview_every: self.request.settings.preview_every,
            preview_width: self.request.settings.preview_width,
        };

        if output.extension().is_none() {
            let mut sink = PngSequenceSink::create(output, "frame")?;
            let rendered = prepared
                .renderer
                .run(prepared.source.as_mut(), &mut sink, reporter, cancel, span)
                .and_then(|frames| {
                    sink.close()?;
                    Ok(frames)
                });
            let frames = match rendered {
                Ok(frames) => frames,
                Err(e) => {
                    if let Err(cleanup) = sink.discard() {
                        warn!("Could not remove partial frames: {}", cleanup);
                    }
                    return Err(e);
                }
            };
            reporter.report(100, format!("Saved {} frames to {}", frames, output.display()));
            return Ok(JobOutcome {
                output: output.clone(),
                frames,
                seed: prepared.seed,
                audio: AudioTrack::None,
                started,
                finished: Local::now(),
            });
        }

        let silent = ScratchFile(silent_path(output));
        let mut sink = FfmpegSink::create(&silent.0, meta.width, meta.height, meta.fps, &self.transcoder)
            .map_err(|e| JobError::Resource(format!("Cannot open video writer: {}", e)))?;
        let frames = prepared
            .renderer
            .run(prepared.source.as_mut(), &mut sink, reporter, cancel, span)?;
        sink.close()?;
        drop(prepared.source);

        reporter.report(90, "Adding audio");
        let video_duration = frames as f64 / meta.fps;
        let audio = match self.transcoder.merge_audio_looped(
            &silent.0,
            &prepared.audio_path,
            output,
            video_duration,
            prepared.audio_duration,
        ) {
            Ok(()) => match loop_count(video_duration, prepared.audio_duration) {
                loops if loops > 1 => AudioTrack::Looped { loops },
                _ => AudioTrack::Merged,
            },
            Err(e) => {
                warn!("Audio merge failed, keeping the video without audio: {}", e);
                std::fs::rename(&silent.0, output)?;
                AudioTrack::Missing {
                    reason: e.to_string(),
                }
            }
        };

        let message = match &audio {
            AudioTrack::Missing { .. } => format!("Saved without audio: {}", output.display()),
            _ => format!("Saved {}", output.display()),
        };
        reporter.report(100, message);
        let finished = Local::now();
        info!(
            "Render job finished: {} frames in {:.1}s",
            frames,
            (finished - started).num_milliseconds() as f64 / 1000.0
        );

        Ok(JobOutcome {
            output: output.clone(),
            frames,
            seed: prepared.seed,
            audio,
            started,
            finished,
        })
    }

    /// Render every frame into `sink` without touching the output path or the audio.
    ///
    /// The sink is closed on success. Returns the number of frames written.
    pub fn render_into(
        &self,
        sink: &mut dyn FrameSink,
        reporter: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<usize> {
        let mut prepared = self.prepare(reporter)?;
        let span = ProgressSpan {
            start: 10,
            end: 100,
            preview_every: self.request.settings.preview_every,
            preview_width: self.request.settings.preview_width,
        };
        let frames = prepared
            .renderer
            .run(prepared.source.as_mut(), sink, reporter, cancel, span)?;
        sink.close()?;
        Ok(frames)
    }

    fn prepare(&self, reporter: &ProgressReporter) -> Result<PreparedJob> {
        let settings = &self.request.settings;

        reporter.report(0, "Loading audio");
        let (audio_path, extracted) = match (&self.request.audio, &self.request.source) {
            (Some(path), _) => (path.clone(), None),
            (None, Source::Video(video)) => {
                let scratch = ScratchFile(self.request.output.with_extension("audio.wav"));
                self.transcoder.extract_audio(video, &scratch.0)?;
                (scratch.0.clone(), Some(scratch))
            }
            (None, _) => {
                return Err(JobError::Input("no audio file given".to_string()));
            }
        };
        let signal = load_audio(&audio_path, settings.analysis.spectrogram.sample_rate)?;
        let audio_duration = signal.duration();
        if audio_duration <= 0.0 {
            return Err(JobError::Input(format!(
                "Audio file is empty: {}",
                audio_path.display()
            )));
        }

        let (source, fps, duration): (Box<dyn FrameSource>, f64, f64) = match &self.request.source {
            Source::Video(path) => {
                let source = FfmpegSource::open(path, &self.transcoder)?;
                let meta = source.metadata();
                (Box::new(source), meta.fps, meta.duration())
            }
            Source::Image(path) => {
                let image = load_image(path)?;
                let (width, height) = settings.output_size.unwrap_or(image.dimensions());
                let image = if image.dimensions() == (width, height) {
                    image
                } else {
                    imageops::resize(&image, width, height, FilterType::Lanczos3)
                };
                let count = self.frame_count(audio_duration)?;
                (
                    Box::new(StillImageSource::new(image, settings.fps, count)),
                    settings.fps,
                    audio_duration,
                )
            }
            Source::Slideshow(paths) => {
                let images = load_slideshow(paths)?;
                let (width, height) = settings.output_size.unwrap_or(images[0].dimensions());
                let show = Slideshow::new(&images, width, height, settings.fps, audio_duration)?;
                (Box::new(show), settings.fps, audio_duration)
            }
        };
        let frame_count = source.metadata().frame_count;

        reporter.report(5, "Analyzing audio");
        let parameters = self.parameter_source(&signal, fps, duration, frame_count)?;

        let rng = settings.seed.map(FrameRng::new).unwrap_or_else(FrameRng::from_os);
        let renderer = SequenceRenderer::new(
            FrameCompositor::new(settings.composite)?,
            parameters,
            rng,
            settings.failure_policy,
            fps,
        );

        Ok(PreparedJob {
            source,
            renderer,
            audio_path,
            audio_duration,
            seed: rng.seed(),
            _extracted: extracted,
        })
    }

    fn frame_count(&self, audio_duration: f64) -> Result<usize> {
        match output_frame_count(audio_duration, self.request.settings.fps) {
            0 => Err(JobError::Input(format!(
                "Audio too short for one frame at {} fps",
                self.request.settings.fps
            ))),
            n => Ok(n),
        }
    }

    fn parameter_source(
        &self,
        signal: &AudioSignal,
        fps: f64,
        duration: f64,
        frame_count: usize,
    ) -> Result<ParameterSource> {
        let settings = &self.request.settings;
        match settings.parameter_mode {
            ParameterMode::Reactive => {
                let analysis = AudioAnalysis::from_signal(signal, &settings.analysis)?;
                debug!(
                    "Analysis: {} spectrogram frames, {} bass beats, {} snare hits",
                    analysis.curves.len(),
                    analysis.bass_beats.len(),
                    analysis.snare_hits.len()
                );
                let timeline = FrameTimeline::new(
                    &analysis.curves,
                    duration,
                    frame_count,
                    settings.reactivity.smoothness,
                );
                let mapper = ReactivityMapper::from_analysis(settings.reactivity.clone(), &analysis)?;
                Ok(ParameterSource::Reactive { mapper, timeline })
            }
            ParameterMode::Peaks => {
                let legacy = legacy_from_signal(signal, &settings.analysis.spectrogram)?;
                let map = PeakEffectMap::build(
                    &legacy.bass_times(),
                    &legacy.treble_times(),
                    fps,
                    frame_count,
                    settings.reactivity.zoom_factor,
                    settings.reactivity.rotation_angle,
                    settings.effect_duration,
                )?;
                Ok(ParameterSource::Peaks(map))
            }
        }
    }
}

/// `out.mp4` -> `out.silent.mp4`
fn silent_path(output: &Path) -> PathBuf {
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    output.with_extension(format!("silent.{}", ext))
}

/// Load slideshow images, skipping unreadable ones
fn load_slideshow(paths: &[PathBuf]) -> Result<Vec<RgbImage>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match load_image(path) {
            Ok(image) => images.push(image),
            Err(e) => warn!("Skipping slideshow image {}: {}", path.display(), e),
        }
    }
    if images.is_empty() {
        return Err(JobError::Input("no readable slideshow images".to_string()));
    }
    Ok(images)
}

/// A job running on a worker thread
#[derive(Debug)]
pub struct JobHandle {
    events: Receiver<ProgressEvent>,
    cancel: CancelToken,
    thread: JoinHandle<Result<JobOutcome>>,
}

impl JobHandle {
    /// Progress events; the channel closes when the job ends
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Ask the job to stop before its next frame
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the worker has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the job to end
    pub fn join(self) -> Result<JobOutcome> {
        self.thread
            .join()
            .map_err(|_| JobError::Resource("render worker panicked".to_string()))?
    }
}
