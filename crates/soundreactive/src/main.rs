//! SoundReactive - audio-driven video effects
//!
//! Command line front-end: loads a preset, overlays flags, runs one render
//! job on a worker thread and prints its progress.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use soundreactive::{
    logging_setup, AudioTrack, FailurePolicy, ParameterMode, RenderJob, RenderRequest,
    RenderSettings, Source,
};
use soundreactive_core::{ArtisticEffect, BandRange, BandWeights, FrequencyBand};
use soundreactive_render::{BlendMode, CompositeMode};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Reactive,
    Peaks,
}

/// Render a video, still image or image folder with effects driven by an audio track
#[derive(Debug, Parser)]
#[command(name = "soundreactive", version, about)]
struct Cli {
    /// Video file, image file, or a folder of images for a slideshow
    source: PathBuf,

    /// Audio file (defaults to the video's own soundtrack)
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Output video; a path without extension writes a PNG sequence into that directory
    #[arg(short, long)]
    output: PathBuf,

    /// Load settings from a .toml or .json preset before applying flags
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Write the effective settings to a preset and exit
    #[arg(long)]
    save_preset: Option<PathBuf>,

    /// Parameter mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Output frame rate for images and slideshows
    #[arg(long)]
    fps: Option<f64>,

    /// Output size for images and slideshows, e.g. 1280x720
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Maximum zoom factor (>= 1)
    #[arg(long)]
    zoom: Option<f32>,

    /// Maximum rotation in degrees
    #[arg(long)]
    rotation: Option<f32>,

    /// Blend between baseline (0) and fully audio-driven (1)
    #[arg(long)]
    sensitivity: Option<f32>,

    /// Curve smoothing (0-1)
    #[arg(long)]
    smoothness: Option<f32>,

    /// Seconds around a bass beat during which zoom is active
    #[arg(long)]
    beat_window: Option<f32>,

    /// Seconds around a snare hit during which the flash is active
    #[arg(long)]
    snare_window: Option<f32>,

    /// Zoom follows bass energy continuously instead of punching on beats
    #[arg(long)]
    continuous_zoom: bool,

    /// Disable the snare flash
    #[arg(long)]
    no_snare_flash: bool,

    /// Disable color grading
    #[arg(long)]
    no_color: bool,

    /// Disable the brightness pulse
    #[arg(long)]
    no_brightness: bool,

    /// Disable blur
    #[arg(long)]
    no_blur: bool,

    /// Enable glitch
    #[arg(long)]
    glitch: bool,

    /// Enable compression artifacts
    #[arg(long)]
    artifacts: bool,

    /// Enable an artistic effect (repeatable), e.g. pixel_sort, kaleidoscope
    #[arg(long = "effect", value_parser = parse_effect)]
    effects: Vec<ArtisticEffect>,

    /// Band weights of an effect: name=sub_bass,bass,mid,treble,high_treble
    #[arg(long = "weights", value_parser = parse_weights)]
    weights: Vec<(ArtisticEffect, BandWeights)>,

    /// Band range override: name=min:max in Hz, e.g. bass=60:250
    #[arg(long = "band", value_parser = parse_band)]
    bands: Vec<(FrequencyBand, BandRange)>,

    /// Blend the effects over the original with this mode
    #[arg(long)]
    blend: Option<BlendMode>,

    /// Layer opacity (0-1), used with --blend
    #[arg(long, default_value_t = 1.0)]
    opacity: f32,

    /// Seed for the randomized effects
    #[arg(long)]
    seed: Option<u64>,

    /// Keep unprocessed frames instead of aborting when an effect fails
    #[arg(long)]
    pass_through: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {}", e))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {}", e))?;
    Ok((w, h))
}

fn parse_effect(s: &str) -> Result<ArtisticEffect, String> {
    ArtisticEffect::ALL
        .into_iter()
        .find(|e| e.name() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = ArtisticEffect::ALL.iter().map(|e| e.name()).collect();
            format!("unknown effect '{}' (one of: {})", s, names.join(", "))
        })
}

fn parse_band_name(s: &str) -> Result<FrequencyBand, String> {
    FrequencyBand::ALL
        .into_iter()
        .find(|b| b.name() == s)
        .ok_or_else(|| format!("unknown band '{}'", s))
}

fn parse_weights(s: &str) -> Result<(ArtisticEffect, BandWeights), String> {
    let (name, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected effect=w1,w2,w3,w4,w5, got '{}'", s))?;
    let values: Vec<f32> = values
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("bad weight '{}': {}", v, e)))
        .collect::<Result<_, _>>()?;
    let weights: [f32; 5] = values
        .try_into()
        .map_err(|v: Vec<f32>| format!("expected 5 weights, got {}", v.len()))?;
    Ok((parse_effect(name.trim())?, BandWeights(weights)))
}

fn parse_band(s: &str) -> Result<(FrequencyBand, BandRange), String> {
    let (name, range) = s
        .split_once('=')
        .ok_or_else(|| format!("expected band=min:max, got '{}'", s))?;
    let (min, max) = range
        .split_once(':')
        .ok_or_else(|| format!("expected min:max, got '{}'", range))?;
    let min: f32 = min.trim().parse().map_err(|e| format!("bad minimum: {}", e))?;
    let max: f32 = max.trim().parse().map_err(|e| format!("bad maximum: {}", e))?;
    Ok((parse_band_name(name.trim())?, BandRange::new(min, max)))
}

impl Cli {
    /// Overlay flags on the preset (or the defaults)
    fn settings(&self) -> Result<RenderSettings> {
        let mut settings = match &self.preset {
            Some(path) => RenderSettings::load(path)
                .with_context(|| format!("Failed to load preset {}", path.display()))?,
            None => RenderSettings::default(),
        };

        if let Some(mode) = self.mode {
            settings.parameter_mode = match mode {
                ModeArg::Reactive => ParameterMode::Reactive,
                ModeArg::Peaks => ParameterMode::Peaks,
            };
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if self.size.is_some() {
            settings.output_size = self.size;
        }

        let reactivity = &mut settings.reactivity;
        if let Some(v) = self.zoom {
            reactivity.zoom_factor = v;
        }
        if let Some(v) = self.rotation {
            reactivity.rotation_angle = v;
        }
        if let Some(v) = self.sensitivity {
            reactivity.intensity_sensitivity = v;
        }
        if let Some(v) = self.smoothness {
            reactivity.smoothness = v;
        }
        if let Some(v) = self.beat_window {
            reactivity.beat_window = v;
        }
        if let Some(v) = self.snare_window {
            reactivity.snare_window = v;
        }
        if self.continuous_zoom {
            reactivity.beat_triggered_zoom = false;
        }
        if self.no_snare_flash {
            reactivity.snare_triggered_flash = false;
        }
        let toggles = &mut reactivity.toggles;
        if self.no_color {
            toggles.color_grading = false;
        }
        if self.no_brightness {
            toggles.brightness = false;
        }
        if self.no_blur {
            toggles.blur = false;
        }
        if self.glitch {
            toggles.glitch = true;
        }
        if self.artifacts {
            toggles.artifacts = true;
        }
        for &effect in &self.effects {
            toggles.set(effect, true);
        }
        for &(effect, weights) in &self.weights {
            reactivity.set_weights(effect, weights);
        }
        for &(band, range) in &self.bands {
            settings.analysis.bands.set(band, range);
        }

        if let Some(blend) = self.blend {
            settings.composite = CompositeMode::layer(blend, self.opacity);
        }
        if self.seed.is_some() {
            settings.seed = self.seed;
        }
        if self.pass_through {
            settings.failure_policy = FailurePolicy::PassThrough;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            settings.logging.file_output = true;
            settings.logging.log_directory = dir.clone();
        }

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    if let Some(path) = &cli.save_preset {
        settings
            .save(path)
            .with_context(|| format!("Failed to save preset {}", path.display()))?;
        println!("{}", path.display());
        return Ok(());
    }

    let _log_guard = logging_setup::init(&settings.logging)?;
    info!("SoundReactive {}", env!("CARGO_PKG_VERSION"));

    let source = Source::from_path(&cli.source)
        .with_context(|| format!("Cannot use {} as a source", cli.source.display()))?;
    let job = RenderJob::new(RenderRequest {
        source,
        audio: cli.audio.clone(),
        output: cli.output.clone(),
        settings,
    })
    .context("Invalid render job")?;

    let handle = job.spawn();
    let mut stderr = std::io::stderr();
    for event in handle.events().iter() {
        let _ = writeln!(stderr, "[{:>3}%] {}", event.percent, event.message);
    }

    let outcome = handle.join().context("Render failed")?;
    match &outcome.audio {
        AudioTrack::Missing { reason } => {
            eprintln!("Warning: saved without audio ({})", reason);
        }
        AudioTrack::Looped { loops } => info!("Audio looped {} times", loops),
        AudioTrack::Merged | AudioTrack::None => {}
    }
    if outcome.frames == 0 {
        bail!("No frames were rendered");
    }
    info!("Seed: {}", outcome.seed);
    println!("{}", outcome.output.display());
    Ok(())
}
