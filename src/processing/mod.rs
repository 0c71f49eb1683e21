//! # Processing Module
//!
//! The four-stage encoding pipeline and its per-frame stages:
//!
//! ```text
//! submit ─▶ scale ─▶ diff ─▶ quantize ─▶ encode ─▶ sink
//! ```
//!
//! Each stage runs on its own thread and talks to its neighbours over
//! bounded FIFO queues, so frames leave in the order they were submitted.

pub mod diff;
pub mod pipeline;
pub mod scaler;

use crate::core::frame::{QuantizedFrame, ReducedFrame};
use crate::error::GifResult;
use crate::quant::{quantize_frame, QuantizerKind};

pub use diff::{reduce, FrameDiffer};
pub use pipeline::{Pipeline, PipelineState, Stage};
pub use scaler::FrameScaler;

/// One step of the pipeline: consumes a frame and produces the next form.
///
/// Implementors may keep state across frames; each instance is driven by a
/// single worker thread, in submission order.
pub trait FrameStage: Send {
    type Input: Send;
    type Output: Send;

    fn process(&mut self, input: Self::Input) -> GifResult<Self::Output>;
}

/// Trains a fresh palette for every frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameQuantizer {
    kind: QuantizerKind,
    sample_factor: u32,
}

impl FrameQuantizer {
    pub fn new(kind: QuantizerKind, sample_factor: u32) -> Self {
        Self { kind, sample_factor }
    }
}

impl FrameStage for FrameQuantizer {
    type Input = ReducedFrame;
    type Output = QuantizedFrame;

    fn process(&mut self, frame: ReducedFrame) -> GifResult<QuantizedFrame> {
        quantize_frame(self.kind, self.sample_factor, frame)
    }
}
