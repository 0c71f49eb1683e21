//! Frame types that flow between pipeline stages.
//!
//! Pixels are packed `0xAARRGGBB` words. The scale stage forces the alpha
//! byte to `0xFF`, which keeps every captured color distinct from the
//! [`TRANSPARENT`] sentinel written by the differential reducer.

use std::time::SystemTime;

use crate::error::{GifError, GifResult};
use crate::quant::Palette;

/// Sentinel for "unchanged since the previous frame".
pub const TRANSPARENT: u32 = 0;

/// Alpha marker carried by every captured pixel.
pub const OPAQUE: u32 = 0xFF00_0000;

/// Largest canvas edge the container can describe.
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

#[inline]
pub fn red(pixel: u32) -> u8 {
    (pixel >> 16) as u8
}

#[inline]
pub fn green(pixel: u32) -> u8 {
    (pixel >> 8) as u8
}

#[inline]
pub fn blue(pixel: u32) -> u8 {
    pixel as u8
}

/// Pack an opaque pixel from its channels.
#[inline]
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    OPAQUE | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Region of the logical canvas painted by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect covering a whole `width`×`height` canvas.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A frame as handed over by the capture side, before it has a sequence number.
#[derive(Debug, Clone)]
pub struct Capture {
    pub pixels: Vec<u32>,
    pub width: u32,
    pub height: u32,
    pub captured_at: SystemTime,
}

impl Capture {
    pub fn new(pixels: Vec<u32>, width: u32, height: u32, captured_at: SystemTime) -> Self {
        Self {
            pixels,
            width,
            height,
            captured_at,
        }
    }
}

/// A submitted frame, owned by the pipeline.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub sequence: u64,
    pub pixels: Vec<u32>,
    pub width: u32,
    pub height: u32,
    /// Presentation time in centiseconds.
    pub delay: u16,
    pub captured_at: SystemTime,
}

impl RawFrame {
    pub fn from_capture(sequence: u64, capture: Capture) -> Self {
        Self {
            sequence,
            pixels: capture.pixels,
            width: capture.width,
            height: capture.height,
            delay: 0,
            captured_at: capture.captured_at,
        }
    }

    /// Check that the buffer matches the declared geometry.
    pub fn validate(&self) -> GifResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GifError::malformed_frame(
                self.sequence,
                format!("zero-sized frame {}x{}", self.width, self.height),
            ));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(GifError::malformed_frame(
                self.sequence,
                format!(
                    "frame {}x{} exceeds {}px per side",
                    self.width, self.height, MAX_DIMENSION
                ),
            ));
        }
        let expected = self.width as usize * self.height as usize;
        if self.pixels.len() != expected {
            return Err(GifError::malformed_frame(
                self.sequence,
                format!("expected {} pixels, got {}", expected, self.pixels.len()),
            ));
        }
        Ok(())
    }
}

/// A frame cut down to the region that changed since its predecessor.
#[derive(Debug, Clone)]
pub struct ReducedFrame {
    pub sequence: u64,
    pub delay: u16,
    /// Size of the full frame, which becomes the logical canvas.
    pub canvas: (u32, u32),
    pub rect: Rect,
    /// `rect.area()` pixels; [`TRANSPARENT`] where nothing changed.
    pub pixels: Vec<u32>,
}

/// A reduced frame mapped onto its own palette.
#[derive(Debug, Clone)]
pub struct QuantizedFrame {
    pub sequence: u64,
    pub delay: u16,
    pub canvas: (u32, u32),
    pub rect: Rect,
    pub indices: Vec<u8>,
    pub palette: Palette,
}
