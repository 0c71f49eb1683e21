//! # GIF Capture Library
//!
//! Turns a stream of captured frames into a compact animated GIF.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `processing`: the four-stage pipeline (scale → diff → quantize → encode)
//! - `quant`: NeuQuant and Octree palette builders
//! - `gif`: GIF89a block writer and LZW compression
//! - `core`: frame types and the recent-frame ring
//! - `config`: pipeline construction parameters
//!
//! ## Features
//!
//! - **Frame differencing**: each frame only carries the rectangle that
//!   changed, with unchanged pixels left transparent
//! - **Per-frame palettes**: every frame gets its own trained color table
//! - **Ordered streaming**: one thread per stage, bounded queues, output in
//!   submission order with backpressure on the capture side
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufWriter;
//! use std::time::SystemTime;
//! use gif_capture::{EncoderConfig, Pipeline};
//!
//! # fn example(frames: Vec<(Vec<u32>, u32, u32, SystemTime)>) -> Result<(), Box<dyn std::error::Error>> {
//! let sink = BufWriter::new(File::create("capture.gif")?);
//! let mut pipeline = Pipeline::new(EncoderConfig::default())?;
//! pipeline.start(sink, true)?;
//! for (pixels, width, height, captured_at) in frames {
//!     pipeline.submit(pixels, width, height, captured_at)?;
//! }
//! pipeline.finish()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod gif;
pub mod processing;
pub mod quant;

/// Re-export error types for convenience
pub use error::{GifError, GifResult};

pub use config::EncoderConfig;
pub use core::frame::{Capture, Rect};
pub use core::ring_buffer::FrameRing;
pub use processing::{Pipeline, PipelineState};
pub use quant::QuantizerKind;

/// Re-export scaling targets from the scaler crate
pub use cap_scale::presets::ScaleTarget;
