//! # Encoder Configuration
//!
//! Parameters fixed when a pipeline is built. Nothing here can change while
//! frames are flowing.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `scale` | `Option<ScaleTarget>` | width ≥ 1 | Output size; `None` keeps capture size |
//! | `sample_factor` | `u32` | 1-30 | NeuQuant training stride (1 = every pixel) |
//! | `quantizer` | `QuantizerKind` | neuquant/octree | Palette strategy |
//! | `queue_capacity` | `usize` | ≥ 1 | Frames buffered between stages |
//! | `fixed_delay` | `Option<u16>` | any | Per-frame delay override (centiseconds) |
//! | `final_delay` | `u16` | any | Delay of the last frame (centiseconds) |
//!
//! ## Examples
//!
//! ```rust
//! use gif_capture::config::EncoderConfig;
//! use gif_capture::quant::QuantizerKind;
//!
//! let config = EncoderConfig::default()
//!     .with_width(480)
//!     .with_quantizer(QuantizerKind::Octree);
//! assert!(config.validate().is_ok());
//! ```

use cap_scale::presets::ScaleTarget;

use crate::error::{GifError, GifResult};
use crate::quant::neuquant::validate_sample_factor;
use crate::quant::QuantizerKind;

/// Default output width in pixels.
pub const DEFAULT_WIDTH: u32 = 560;

#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Output size constraint; `None` encodes at capture size.
    pub scale: Option<ScaleTarget>,
    /// NeuQuant sampling factor, 1..=30
    pub sample_factor: u32,
    pub quantizer: QuantizerKind,
    /// Capacity of each inter-stage queue
    pub queue_capacity: usize,
    /// Delay for every frame instead of the capture interval
    pub fixed_delay: Option<u16>,
    /// Delay of the last frame when no fixed delay is set
    pub final_delay: u16,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            scale: Some(ScaleTarget::Width(DEFAULT_WIDTH)),
            sample_factor: 10,
            quantizer: QuantizerKind::NeuQuant,
            queue_capacity: 4,
            fixed_delay: None,
            final_delay: 0,
        }
    }
}

impl EncoderConfig {
    pub fn new(
        scale: Option<ScaleTarget>,
        sample_factor: u32,
        quantizer: QuantizerKind,
        queue_capacity: usize,
    ) -> Self {
        Self {
            scale,
            sample_factor,
            quantizer,
            queue_capacity,
            ..Self::default()
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.scale = Some(ScaleTarget::Width(width));
        self
    }

    /// Encode frames at their captured size.
    pub fn without_scaling(mut self) -> Self {
        self.scale = None;
        self
    }

    pub fn with_sample_factor(mut self, sample_factor: u32) -> Self {
        self.sample_factor = sample_factor;
        self
    }

    pub fn with_quantizer(mut self, quantizer: QuantizerKind) -> Self {
        self.quantizer = quantizer;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_fixed_delay(mut self, delay: u16) -> Self {
        self.fixed_delay = Some(delay);
        self
    }

    pub fn with_final_delay(mut self, delay: u16) -> Self {
        self.final_delay = delay;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> GifResult<()> {
        match self.scale {
            Some(ScaleTarget::Width(0)) => {
                return Err(GifError::validation("width", "must be greater than 0", "0"));
            }
            Some(ScaleTarget::MaxLongSide(0)) => {
                return Err(GifError::validation(
                    "max_long_side",
                    "must be greater than 0",
                    "0",
                ));
            }
            _ => {}
        }
        validate_sample_factor(self.sample_factor)?;
        if self.queue_capacity == 0 {
            return Err(GifError::validation(
                "queue_capacity",
                "must be greater than 0",
                "0",
            ));
        }
        Ok(())
    }
}
