// SPDX-License-Identifier: MIT
//! # Scaling Plan Computation
//!
//! Computes the output geometry for a captured frame before it is resized.
//! GIF output is sized by width: the recorder asks for a fixed output width
//! (560px by default) and the height follows the source aspect ratio.
//!
//! ## Rules
//!
//! - Aspect ratio is always preserved
//! - No upscaling: frames already narrower than the target are left unchanged
//! - Clamp to minimum 1px so degenerate inputs still produce a valid frame

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Defines the target size constraint for scaling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the width to this value, derive the height proportionally.
    Width(u32),
    /// Clamp the longest side to a maximum value, derive the other side proportionally.
    MaxLongSide(u32),
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target size constraint used for planning
    pub target: ScaleTarget,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the frame at its input size.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute a scaling plan for `input` under `target`.
///
/// # Performance
/// O(1) computation with minimal floating-point operations
pub fn build_plan(input: Size, target: ScaleTarget) -> ScalePlan {
    let (w, h) = match target {
        ScaleTarget::Width(width) => fit_width(input, width),
        ScaleTarget::MaxLongSide(max_side) => fit_preserve(input, max_side),
    };
    ScalePlan {
        input,
        target,
        out: Size { w, h },
    }
}

/// Shrink to `target_w` columns, keeping the aspect ratio.
fn fit_width(input: Size, target_w: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let s = (target_w as f64 / w).min(1.0); // don't upscale
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Fit image within max_side constraint while preserving aspect ratio.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h);
    let s = (max_long as f64 / long).min(1.0); // don't upscale
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}
