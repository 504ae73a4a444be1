//! Frame-by-frame rendering of a whole sequence
//!
//! [`SequenceRenderer`] pulls frames from any [`FrameSource`], derives the
//! effect parameters for each output frame, composites and pushes the result
//! into a [`FrameSink`]. Frames are strictly sequential: the artistic effect
//! smoothing of frame `n` depends on frame `n - 1`.

use image::RgbImage;
use soundreactive_core::{
    EffectParameters, EffectSmoothingState, FrameTimeline, PeakEffectMap, ReactivityMapper,
};
use soundreactive_media::{FrameSink, FrameSource, VideoMetadata};
use soundreactive_render::{add_weighted, fit_letterbox, resize_bilinear, FrameCompositor, FrameRng};
use tracing::{debug, info, trace, warn};

use crate::error::{JobError, Result};
use crate::progress::{CancelToken, ProgressReporter};
use crate::settings::FailurePolicy;

/// Length of the slideshow crossfade in seconds
pub const CROSSFADE_SECONDS: f64 = 1.0;

/// Progress is reported every this many frames
const PROGRESS_INTERVAL: usize = 3;

/// Number of output frames for `duration` seconds at `fps`
pub fn output_frame_count(duration: f64, fps: f64) -> usize {
    if !(duration.is_finite() && fps.is_finite()) || duration <= 0.0 || fps <= 0.0 {
        return 0;
    }
    (duration * fps).round() as usize
}

/// Where per-frame parameters come from
#[derive(Debug, Clone)]
pub enum ParameterSource {
    /// Band curves resampled to output timing, mapped with beat windows
    Reactive {
        /// Mapper bound to the job's onsets
        mapper: ReactivityMapper,
        /// Band values per output frame
        timeline: FrameTimeline,
    },
    /// Precomputed zoom/rotation envelopes
    Peaks(PeakEffectMap),
}

impl ParameterSource {
    fn parameters(
        &self,
        index: usize,
        fps: f64,
        smoothing: &mut EffectSmoothingState,
    ) -> EffectParameters {
        match self {
            ParameterSource::Reactive { mapper, timeline } => {
                let t = index as f64 / fps;
                mapper.compute(t, &timeline.sample(index), smoothing)
            }
            ParameterSource::Peaks(map) => {
                let (zoom, rotation) = map.get(index);
                EffectParameters::with_transform(zoom, rotation)
            }
        }
    }
}

/// Where [`SequenceRenderer::run`] reports and how often it attaches previews
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSpan {
    /// Percentage reported before the first frame
    pub start: u8,
    /// Percentage reported after the last frame
    pub end: u8,
    /// Attach a preview to every n-th progress event (0 = never)
    pub preview_every: usize,
    /// Preview width in pixels
    pub preview_width: u32,
}

impl Default for ProgressSpan {
    fn default() -> Self {
        Self {
            start: 0,
            end: 100,
            preview_every: 0,
            preview_width: 320,
        }
    }
}

/// Renders frames in order, owning the per-job smoothing state
#[derive(Debug)]
pub struct SequenceRenderer {
    compositor: FrameCompositor,
    parameters: ParameterSource,
    rng: FrameRng,
    policy: FailurePolicy,
    fps: f64,
    smoothing: EffectSmoothingState,
}

impl SequenceRenderer {
    /// Create a renderer for output at `fps`
    pub fn new(
        compositor: FrameCompositor,
        parameters: ParameterSource,
        rng: FrameRng,
        policy: FailurePolicy,
        fps: f64,
    ) -> Self {
        Self {
            compositor,
            parameters,
            rng,
            policy,
            fps,
            smoothing: EffectSmoothingState::new(),
        }
    }

    /// Parameters for output frame `index`, advancing the smoothing state
    pub fn parameters(&mut self, index: usize) -> EffectParameters {
        self.parameters.parameters(index, self.fps, &mut self.smoothing)
    }

    /// Composite output frame `index`, honoring the failure policy
    pub fn render_frame(&mut self, index: usize, frame: &RgbImage) -> Result<RgbImage> {
        let params = self.parameters(index);
        let mut rng = self.rng.for_frame(index as u64);
        match self.compositor.apply(frame, &params, &mut rng) {
            Ok(out) => Ok(out),
            Err(e) => match self.policy {
                FailurePolicy::Abort => Err(JobError::Render(e)),
                FailurePolicy::PassThrough => {
                    warn!("Frame {} passed through unprocessed: {}", index, e);
                    Ok(frame.clone())
                }
            },
        }
    }

    /// Render every frame of `source` into `sink`.
    ///
    /// Cancellation is checked before each frame. The sink is not closed.
    /// Returns the number of frames written.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        reporter: &ProgressReporter,
        cancel: &CancelToken,
        span: ProgressSpan,
    ) -> Result<usize> {
        self.smoothing.reset();
        let total = source.metadata().frame_count.max(1);
        info!(
            "Rendering ~{} frames at {:.2} fps (seed {})",
            total,
            self.fps,
            self.rng.seed()
        );

        let mut index = 0;
        let mut events = 0usize;
        loop {
            if cancel.is_cancelled() {
                info!("Render cancelled after {} frames", index);
                return Err(JobError::Cancelled);
            }
            let Some(frame) = source.read_frame()? else {
                break;
            };
            let rendered = self.render_frame(index, &frame)?;
            sink.write_frame(&rendered)?;
            trace!("Frame {} written", index);
            index += 1;

            if index % PROGRESS_INTERVAL == 0 || index == total {
                let fraction = (index as f64 / total as f64).min(1.0);
                let percent =
                    span.start as f64 + fraction * (span.end.saturating_sub(span.start)) as f64;
                let message = format!("Rendering frame {}/{}", index, total);
                if span.preview_every > 0 && events % span.preview_every == 0 {
                    reporter.report_with_preview(
                        percent as u8,
                        message,
                        preview(&rendered, span.preview_width),
                    );
                } else {
                    reporter.report(percent as u8, message);
                }
                events += 1;
            }
        }

        debug!("Rendered {} frames", index);
        Ok(index)
    }
}

/// Downscale to `width`, keeping the aspect ratio
fn preview(frame: &RgbImage, width: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if w <= width || w == 0 {
        return frame.clone();
    }
    let height = ((h as u64 * width as u64) / w as u64).max(1) as u32;
    resize_bilinear(frame, width, height)
}

/// Several images sharing the audio duration, crossfading into each other
#[derive(Debug, Clone)]
pub struct Slideshow {
    images: Vec<RgbImage>,
    metadata: VideoMetadata,
    segment: f64,
    next: usize,
}

impl Slideshow {
    /// Letterbox `images` into `width x height` and spread them over `duration` seconds
    pub fn new(images: &[RgbImage], width: u32, height: u32, fps: f64, duration: f64) -> Result<Self> {
        if images.is_empty() {
            return Err(JobError::Input("slideshow needs at least one image".to_string()));
        }
        let frame_count = output_frame_count(duration, fps);
        if frame_count == 0 {
            return Err(JobError::Input(format!(
                "audio too short for a slideshow ({:.3}s at {} fps)",
                duration, fps
            )));
        }
        let images: Vec<RgbImage> = images
            .iter()
            .map(|img| fit_letterbox(img, width, height))
            .collect();
        let segment = duration / images.len() as f64;
        info!(
            "Slideshow: {} images, {:.2}s each, {} frames",
            images.len(),
            segment,
            frame_count
        );
        Ok(Self {
            metadata: VideoMetadata {
                width,
                height,
                fps,
                frame_count,
            },
            images,
            segment,
            next: 0,
        })
    }

    /// Index of the image shown at `t` seconds
    pub fn active_index(&self, t: f64) -> usize {
        ((t / self.segment).floor().max(0.0) as usize).min(self.images.len() - 1)
    }

    /// Base frame for output frame `index`
    pub fn frame_at(&self, index: usize) -> Result<RgbImage> {
        let t = index as f64 / self.metadata.fps;
        let current = self.active_index(t);
        let segment_time = t - current as f64 * self.segment;
        let fade_start = self.segment - CROSSFADE_SECONDS;

        if current + 1 < self.images.len() && segment_time > fade_start {
            let alpha = ((segment_time - fade_start) / CROSSFADE_SECONDS).clamp(0.0, 1.0) as f32;
            return Ok(add_weighted(
                &self.images[current],
                1.0 - alpha,
                &self.images[current + 1],
                alpha,
            )?);
        }
        Ok(self.images[current].clone())
    }
}

impl FrameSource for Slideshow {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn read_frame(&mut self) -> soundreactive_media::Result<Option<RgbImage>> {
        if self.next >= self.metadata.frame_count {
            return Ok(None);
        }
        let frame = self
            .frame_at(self.next)
            .map_err(|e| soundreactive_media::MediaError::Decode(e.to_string()))?;
        self.next += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use soundreactive_core::{BandCurves, OnsetTimeline, ReactivityConfig};
    use soundreactive_media::{MemorySink, MemorySource};
    use soundreactive_render::CompositeMode;

    fn solid(v: u8) -> RgbImage {
        RgbImage::from_pixel(8, 6, Rgb([v, v, v]))
    }

    fn neutral_renderer(frames: usize, fps: f64) -> SequenceRenderer {
        SequenceRenderer::new(
            FrameCompositor::new(CompositeMode::Direct).unwrap(),
            ParameterSource::Peaks(PeakEffectMap::build(&[], &[], fps, frames, 1.3, 5.0, 0.5).unwrap()),
            FrameRng::new(1),
            FailurePolicy::Abort,
            fps,
        )
    }

    #[test]
    fn test_output_frame_count_rounds() {
        assert_eq!(output_frame_count(5.0, 30.0), 150);
        assert_eq!(output_frame_count(1.49, 1.0), 1);
        assert_eq!(output_frame_count(1.5, 1.0), 2);
        assert_eq!(output_frame_count(0.0, 30.0), 0);
    }

    #[test]
    fn test_slideshow_segments_and_crossfade() {
        // 3 images over 6s at 10 fps: 2s per image, fade during the last second
        let images = [solid(0), solid(100), solid(200)];
        let show = Slideshow::new(&images, 8, 6, 10.0, 6.0).unwrap();
        assert_eq!(show.metadata().frame_count, 60);
        assert_eq!(show.active_index(0.0), 0);
        assert_eq!(show.active_index(2.0), 1);
        assert_eq!(show.active_index(100.0), 2);

        assert_eq!(show.frame_at(5).unwrap().get_pixel(0, 0).0[0], 0);
        // t = 1.0: exactly at the fade start, not yet fading
        assert_eq!(show.frame_at(10).unwrap().get_pixel(0, 0).0[0], 0);
        // t = 1.5: halfway
        assert_eq!(show.frame_at(15).unwrap().get_pixel(0, 0).0[0], 50);
        assert_eq!(show.frame_at(20).unwrap().get_pixel(0, 0).0[0], 100);
        // last image never fades out
        assert_eq!(show.frame_at(59).unwrap().get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn test_slideshow_letterboxes() {
        let wide = RgbImage::from_pixel(16, 4, Rgb([255, 255, 255]));
        let show = Slideshow::new(&[wide], 8, 8, 5.0, 1.0).unwrap();
        let frame = show.frame_at(0).unwrap();
        assert_eq!(frame.dimensions(), (8, 8));
        assert_eq!(frame.get_pixel(4, 0).0, [0, 0, 0]);
        assert_eq!(frame.get_pixel(4, 4).0, [255, 255, 255]);
    }

    #[test]
    fn test_slideshow_rejects_empty() {
        assert!(Slideshow::new(&[], 8, 8, 30.0, 5.0).is_err());
        assert!(Slideshow::new(&[solid(1)], 8, 8, 30.0, 0.0).is_err());
    }

    #[test]
    fn test_neutral_run_copies_frames_and_reports() {
        let frames: Vec<RgbImage> = (0..7).map(|i| solid(i * 10)).collect();
        let mut source = MemorySource::new(frames.clone(), 10.0);
        let mut sink = MemorySink::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut renderer = neutral_renderer(7, 10.0);

        let written = renderer
            .run(
                &mut source,
                &mut sink,
                &ProgressReporter::new(tx),
                &CancelToken::new(),
                ProgressSpan {
                    start: 10,
                    end: 90,
                    preview_every: 3,
                    preview_width: 4,
                },
            )
            .unwrap();
        assert_eq!(written, 7);
        assert_eq!(sink.frames(), frames.as_slice());

        let events: Vec<_> = rx.try_iter().collect();
        // frames 3, 6 and the last one; previews on the first and fourth event
        assert_eq!(events.len(), 3);
        assert!(events[1].preview.is_none());
        assert_eq!(events.last().unwrap().percent, 90);
        assert!(events.iter().all(|e| e.percent >= 10 && e.percent <= 90));
        let preview = events[0].preview.as_ref().unwrap();
        assert_eq!(preview.dimensions(), (4, 3));
    }

    #[test]
    fn test_cancel_before_first_frame() {
        let mut source = MemorySource::new(vec![solid(0); 3], 10.0);
        let mut sink = MemorySink::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = neutral_renderer(3, 10.0)
            .run(&mut source, &mut sink, &ProgressReporter::silent(), &cancel, ProgressSpan::default())
            .unwrap_err();
        assert!(matches!(err, JobError::Cancelled));
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn test_failure_policy() {
        // Rotation of NaN degrees is rejected by the compositor
        let map = PeakEffectMap::build(&[0.0], &[0.0], 10.0, 4, 1.3, f32::NAN, 0.5).unwrap();
        let frame = solid(42);

        let mut abort = SequenceRenderer::new(
            FrameCompositor::new(CompositeMode::Direct).unwrap(),
            ParameterSource::Peaks(map.clone()),
            FrameRng::new(1),
            FailurePolicy::Abort,
            10.0,
        );
        assert!(matches!(abort.render_frame(1, &frame), Err(JobError::Render(_))));

        let mut pass = SequenceRenderer::new(
            FrameCompositor::new(CompositeMode::Direct).unwrap(),
            ParameterSource::Peaks(map),
            FrameRng::new(1),
            FailurePolicy::PassThrough,
            10.0,
        );
        assert_eq!(pass.render_frame(1, &frame).unwrap(), frame);
    }

    #[test]
    fn test_reactive_parameters_follow_timeline() {
        let times = vec![0.0, 1.0];
        let loud = vec![1.0f32, 1.0];
        let curves = BandCurves::new(
            times,
            [loud.clone(), loud.clone(), loud.clone(), loud.clone(), loud],
        )
        .unwrap();
        let timeline = FrameTimeline::new(&curves, 1.0, 10, 0.0);
        let config = ReactivityConfig {
            beat_triggered_zoom: false,
            ..Default::default()
        };
        let mapper = ReactivityMapper::new(config, OnsetTimeline::new(vec![]), OnsetTimeline::new(vec![]))
            .unwrap();
        let mut renderer = SequenceRenderer::new(
            FrameCompositor::new(CompositeMode::Direct).unwrap(),
            ParameterSource::Reactive { mapper, timeline },
            FrameRng::new(3),
            FailurePolicy::Abort,
            10.0,
        );
        let params = renderer.parameters(4);
        assert!(params.zoom > 1.0);
        assert!(params.rotation != 0.0);
    }
}
