// SPDX-License-Identifier: MIT
//! # cap-scale: Frame Scaling for GIF Capture
//!
//! Resizes captured frames to the output width of the animated GIF before
//! they are differenced and quantized. Scaling happens once per frame, so the
//! palette builder and the LZW coder only ever see the reduced pixel count.
//!
//! ## Key Components
//!
//! - [`presets`]: Scaling plan computation (width or long-side targets)
//! - [`cpu`]: CPU scaler using fast_image_resize with a bicubic filter
//!
//! ## Usage Example
//!
//! ```rust
//! use cap_scale::{cpu::scale_argb_pixels, presets::{build_plan, ScaleTarget, Size}};
//!
//! let input = Size { w: 1120, h: 800 };
//! let plan = build_plan(input, ScaleTarget::Width(560));
//! let pixels = vec![0xFF10_2030u32; 1120 * 800];
//!
//! let mut resizer = fast_image_resize::Resizer::new();
//! let scaled = scale_argb_pixels(&mut resizer, &pixels, input, &plan).unwrap();
//! assert_eq!(scaled.len(), 560 * 400);
//! ```

pub mod cpu;
pub mod presets;
