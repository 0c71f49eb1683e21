// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// BGRA8 in → BGRA8 out, bicubic (Catmull-Rom) convolution.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::presets::{ScalePlan, Size};

#[derive(Debug)]
pub enum ScaleError {
    BufferTooSmall,
    SizeMismatch { expected: usize, actual: usize },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::BufferTooSmall => write!(f, "Output buffer too small"),
            ScaleError::SizeMismatch { expected, actual } => {
                write!(f, "Expected {} source pixels, got {}", expected, actual)
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Resize tightly packed BGRA8 rows.
/// `dst` must hold at least `plan.out.w * plan.out.h * 4` bytes.
pub fn scale_bgra_cpu(
    resizer: &mut Resizer,
    src_bgra: &[u8],
    src: Size,
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let dst_len = (plan.out.w as usize) * (plan.out.h as usize) * 4;
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(src.w, src.h, src_bgra)?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Alpha is a marker, not coverage; never premultiply.
    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom))
        .use_alpha(false);

    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}

/// Resize a buffer of packed `0xAARRGGBB` words.
///
/// Each word is laid out little-endian (B, G, R, A bytes), which is the
/// BGRA8 layout `scale_bgra_cpu` expects.
pub fn scale_argb_pixels(
    resizer: &mut Resizer,
    pixels: &[u32],
    src: Size,
    plan: &ScalePlan,
) -> Result<Vec<u32>, ScaleError> {
    let expected = (src.w as usize) * (src.h as usize);
    if pixels.len() != expected {
        return Err(ScaleError::SizeMismatch { expected, actual: pixels.len() });
    }

    let src_bytes: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
    let mut dst_bytes = vec![0u8; (plan.out.w as usize) * (plan.out.h as usize) * 4];
    scale_bgra_cpu(resizer, &src_bytes, src, plan, &mut dst_bytes)?;

    Ok(dst_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
