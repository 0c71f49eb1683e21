//! Scale stage: resizes each frame to the output width.

use cap_scale::cpu::scale_argb_pixels;
use cap_scale::presets::{build_plan, ScaleTarget, Size};
use fast_image_resize::Resizer;
use tracing::debug;

use crate::core::frame::{RawFrame, OPAQUE};
use crate::error::GifResult;

use super::FrameStage;

/// Bicubic downscaler. Also stamps the opaque marker on every pixel so
/// captured black can never be mistaken for the transparent sentinel.
pub struct FrameScaler {
    target: Option<ScaleTarget>,
    resizer: Resizer,
}

impl FrameScaler {
    pub fn new(target: Option<ScaleTarget>) -> Self {
        Self {
            target,
            resizer: Resizer::new(),
        }
    }
}

impl FrameStage for FrameScaler {
    type Input = RawFrame;
    type Output = RawFrame;

    fn process(&mut self, mut frame: RawFrame) -> GifResult<RawFrame> {
        frame.validate()?;
        for p in frame.pixels.iter_mut() {
            *p |= OPAQUE;
        }

        let Some(target) = self.target else {
            return Ok(frame);
        };
        let input = Size {
            w: frame.width,
            h: frame.height,
        };
        let plan = build_plan(input, target);
        if plan.is_identity() {
            return Ok(frame);
        }

        let mut pixels = scale_argb_pixels(&mut self.resizer, &frame.pixels, input, &plan)?;
        for p in pixels.iter_mut() {
            *p |= OPAQUE;
        }
        debug!(
            sequence = frame.sequence,
            from_w = input.w,
            from_h = input.h,
            to_w = plan.out.w,
            to_h = plan.out.h,
            "frame scaled"
        );

        frame.pixels = pixels;
        frame.width = plan.out.w;
        frame.height = plan.out.h;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{Capture, TRANSPARENT};
    use std::time::SystemTime;

    fn raw(pixels: Vec<u32>, width: u32, height: u32) -> RawFrame {
        RawFrame::from_capture(0, Capture::new(pixels, width, height, SystemTime::UNIX_EPOCH))
    }

    #[test]
    fn test_forces_opaque_marker() {
        let mut scaler = FrameScaler::new(None);
        let out = scaler.process(raw(vec![0, 0x0012_3456], 2, 1)).unwrap();
        assert_eq!(out.pixels, vec![0xFF00_0000, 0xFF12_3456]);
        assert!(out.pixels.iter().all(|&p| p != TRANSPARENT));
    }

    #[test]
    fn test_downscales_to_target_width() {
        let mut scaler = FrameScaler::new(Some(ScaleTarget::Width(50)));
        let out = scaler.process(raw(vec![0xFF40_8020; 200 * 100], 200, 100)).unwrap();
        assert_eq!((out.width, out.height), (50, 25));
        assert_eq!(out.pixels.len(), 50 * 25);
        assert!(out.pixels.iter().all(|&p| p == 0xFF40_8020));
    }

    #[test]
    fn test_never_upscales() {
        let mut scaler = FrameScaler::new(Some(ScaleTarget::Width(560)));
        let out = scaler.process(raw(vec![0xFF00_0000; 12], 4, 3)).unwrap();
        assert_eq!((out.width, out.height), (4, 3));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let mut scaler = FrameScaler::new(Some(ScaleTarget::Width(2)));
        let err = scaler.process(raw(vec![0; 5], 4, 3)).unwrap_err();
        assert_eq!(err.category(), "malformed_frame");
    }
}
