//! Differential frame reduction.
//!
//! Compares each frame with its predecessor, crops it to the bounding box
//! of changed pixels, and blanks unchanged pixels inside that box to the
//! transparent sentinel. The decoder keeps showing the previous frame
//! wherever the new one is transparent.

use tracing::debug;

use crate::core::frame::{RawFrame, Rect, ReducedFrame, TRANSPARENT};
use crate::error::{GifError, GifResult};

use super::FrameStage;

/// Crop `current` to what changed since `previous`.
///
/// Without a predecessor the whole frame is kept as is. When nothing
/// changed the result is a single transparent pixel at the origin, since a
/// frame must carry at least one pixel. Both buffers must be
/// `width * height` long.
pub fn reduce(current: &[u32], previous: Option<&[u32]>, width: u32, height: u32) -> (Rect, Vec<u32>) {
    let Some(previous) = previous else {
        return (Rect::full(width, height), current.to_vec());
    };
    debug_assert_eq!(current.len(), previous.len());

    let (w, h) = (width as usize, height as usize);
    let changed = |x: usize, y: usize| current[y * w + x] != previous[y * w + x];

    let Some(top) = (0..h).find(|&y| (0..w).any(|x| changed(x, y))) else {
        return (Rect::new(0, 0, 1, 1), vec![TRANSPARENT]);
    };
    // a changed pixel exists in row `top`, so every search below succeeds
    let left = (0..w)
        .find(|&x| (top..h).any(|y| changed(x, y)))
        .unwrap_or(0);
    let right = (left..w)
        .rev()
        .find(|&x| (top..h).any(|y| changed(x, y)))
        .unwrap_or(left);
    let bottom = (top..h)
        .rev()
        .find(|&y| (left..=right).any(|x| changed(x, y)))
        .unwrap_or(top);

    let rect = Rect::new(
        left as u32,
        top as u32,
        (right - left + 1) as u32,
        (bottom - top + 1) as u32,
    );
    let mut pixels = Vec::with_capacity(rect.area());
    for y in top..=bottom {
        let row = y * w;
        for x in left..=right {
            let p = current[row + x];
            pixels.push(if p == previous[row + x] { TRANSPARENT } else { p });
        }
    }
    (rect, pixels)
}

/// Diff stage. Owns the previous full-resolution frame.
#[derive(Debug, Default)]
pub struct FrameDiffer {
    previous: Option<(Vec<u32>, u32, u32)>,
}

impl FrameDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the predecessor; the next frame is emitted whole.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl FrameStage for FrameDiffer {
    type Input = RawFrame;
    type Output = ReducedFrame;

    fn process(&mut self, frame: RawFrame) -> GifResult<ReducedFrame> {
        frame.validate()?;

        let previous = match &self.previous {
            Some((pixels, w, h)) if (*w, *h) == (frame.width, frame.height) => Some(pixels.as_slice()),
            Some((_, w, h)) => {
                return Err(GifError::malformed_frame(
                    frame.sequence,
                    format!(
                        "frame is {}x{} but the stream is {}x{}",
                        frame.width, frame.height, w, h
                    ),
                ));
            }
            None => None,
        };

        let (rect, pixels) = reduce(&frame.pixels, previous, frame.width, frame.height);
        assert!(!rect.is_empty(), "reduced region must hold at least one pixel");

        debug!(
            sequence = frame.sequence,
            x = rect.x,
            y = rect.y,
            w = rect.width,
            h = rect.height,
            "frame reduced"
        );

        let reduced = ReducedFrame {
            sequence: frame.sequence,
            delay: frame.delay,
            canvas: (frame.width, frame.height),
            rect,
            pixels,
        };
        self.previous = Some((frame.pixels, frame.width, frame.height));
        Ok(reduced)
    }
}
