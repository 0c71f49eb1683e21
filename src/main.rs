use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use gif_capture::core::frame::rgb;
use gif_capture::{EncoderConfig, Pipeline, QuantizerKind, ScaleTarget};
use tracing::{info, warn, Level};

/// Assemble a directory of captured PNG frames into an animated GIF.
#[derive(Parser, Debug)]
#[command(name = "gifcap")]
#[command(about = "Assemble captured frames into a size-optimized animated GIF")]
#[command(long_about = "Assemble the PNG frames of a directory, sorted by file name, into an animated GIF.
Frames named like '2015-01-02 03-04-05.678.png' are timed from their names; other frames are spaced by --interval.")]
struct Args {
    /// Directory holding the frames
    input: PathBuf,

    /// Output GIF path
    #[arg(short, long, default_value = "capture.gif")]
    output: PathBuf,

    /// Output width in pixels (frames are never upscaled)
    #[arg(short, long, default_value_t = 560)]
    width: u32,

    /// Encode at the captured size
    #[arg(long, conflicts_with = "width")]
    keep_size: bool,

    /// NeuQuant sampling factor: 1 (best) to 30 (fastest)
    #[arg(short, long, default_value_t = 10)]
    sample: u32,

    /// Palette builder
    #[arg(short, long, value_enum, default_value_t = QuantizerKind::NeuQuant)]
    quantizer: QuantizerKind,

    /// Play once instead of looping
    #[arg(long)]
    no_loop: bool,

    /// Frame interval in milliseconds when names carry no timestamp
    #[arg(long, default_value_t = 200)]
    interval: u64,

    /// Delay of the last frame in milliseconds
    #[arg(long, default_value_t = 0)]
    last_delay: u64,

    /// Frames buffered between pipeline stages
    #[arg(long, default_value_t = 4)]
    queue: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// File stem format of timestamped frames.
const FRAME_TIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S%.3f";

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let paths = list_frames(&args.input)?;
    if paths.is_empty() {
        bail!("no .png frames in {}", args.input.display());
    }
    let timestamps = frame_times(&paths, Duration::from_millis(args.interval));

    let scale = (!args.keep_size).then_some(ScaleTarget::Width(args.width));
    let config = EncoderConfig::new(scale, args.sample, args.quantizer, args.queue)
        .with_final_delay(centiseconds(args.last_delay));

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut pipeline = Pipeline::new(config).context("invalid encoder settings")?;
    pipeline.start(BufWriter::new(file), !args.no_loop)?;

    for (path, captured_at) in paths.iter().zip(timestamps) {
        let (pixels, width, height) = load_frame(path)?;
        if let Err(err) = pipeline.submit(pixels, width, height, captured_at) {
            warn!("stopped submitting at {}: {}", path.display(), err);
            break;
        }
    }

    let frames = pipeline.submitted();
    pipeline
        .finish()
        .with_context(|| format!("encoding {}", args.output.display()))?;
    info!(frames, output = %args.output.display(), "gif written");
    Ok(())
}

/// `.png` files in `dir`, sorted by file name.
fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Capture times from file names, or evenly spaced times when any name
/// does not carry one.
fn frame_times(paths: &[PathBuf], interval: Duration) -> Vec<SystemTime> {
    let parsed: Option<Vec<SystemTime>> = paths
        .iter()
        .map(|p| p.file_stem().and_then(|s| s.to_str()).and_then(parse_frame_time))
        .collect();
    parsed.unwrap_or_else(|| {
        let start = SystemTime::now();
        (0..paths.len() as u32).map(|i| start + interval * i).collect()
    })
}

/// Parse `YYYY-MM-DD HH-MM-SS.fff` as UTC.
fn parse_frame_time(stem: &str) -> Option<SystemTime> {
    NaiveDateTime::parse_from_str(stem, FRAME_TIME_FORMAT)
        .ok()
        .map(|t| SystemTime::from(t.and_utc()))
}

fn centiseconds(millis: u64) -> u16 {
    u16::try_from(millis / 10).unwrap_or(u16::MAX)
}

/// Decode a frame into opaque `0xAARRGGBB` pixels.
fn load_frame(path: &Path) -> Result<(Vec<u32>, u32, u32)> {
    let image = image::open(path)
        .with_context(|| format!("decoding {}", path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let pixels = image.pixels().map(|p| rgb(p[0], p[1], p[2])).collect();
    Ok((pixels, width, height))
}
