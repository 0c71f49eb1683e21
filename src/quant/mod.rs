//! # Palette Builders
//!
//! Two interchangeable strategies reduce a frame to at most 255 visible
//! colors plus the transparent slot 0:
//!
//! - [`neuquant::NeuQuant`]: Kohonen-style neural network, best quality
//! - [`octree::Octree`]: depth-6 color octree with node folding, cheaper
//!
//! Both are used through the [`Quantizer`] trait and selected with
//! [`QuantizerKind`] when the pipeline is built.

pub mod neuquant;
pub mod octree;

use crate::core::frame::{blue, green, red, QuantizedFrame, ReducedFrame, TRANSPARENT};
use crate::error::GifResult;

pub use neuquant::NeuQuant;
pub use octree::Octree;

/// Palette slots, including the transparent one.
pub const PALETTE_SLOTS: usize = 256;

/// Slot reserved for "keep the previous pixel".
pub const TRANSPARENT_INDEX: u8 = 0;

/// Fixed 256-slot color table. Slot 0 is transparent and never holds a
/// visible color; unused slots stay black.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [[u8; 3]; PALETTE_SLOTS],
    len: usize,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("len", &self.len)
            .field("colors", &&self.colors[..self.len])
            .finish()
    }
}

impl Palette {
    /// Palette holding only the transparent slot.
    pub fn new() -> Self {
        Self {
            colors: [[0; 3]; PALETTE_SLOTS],
            len: 1,
        }
    }

    /// Palette from visible colors, in order; anything past 255 is ignored.
    pub fn with_colors(colors: impl IntoIterator<Item = [u8; 3]>) -> Self {
        let mut palette = Self::new();
        for color in colors {
            if palette.push(color).is_none() {
                break;
            }
        }
        palette
    }

    /// Append a visible color, returning its index, or `None` when full.
    pub fn push(&mut self, rgb: [u8; 3]) -> Option<u8> {
        if self.len == PALETTE_SLOTS {
            return None;
        }
        let index = self.len;
        self.colors[index] = rgb;
        self.len += 1;
        Some(index as u8)
    }

    /// Slots in use, including the transparent one.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.visible_len() == 0
    }

    pub fn visible_len(&self) -> usize {
        self.len - 1
    }

    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        let index = index as usize;
        (index < self.len).then(|| self.colors[index])
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors[..self.len]
    }

    /// Size field `n` of the image descriptor: the table holds `2^(n+1)` entries.
    pub fn table_bits(&self) -> u8 {
        let mut n = 0u8;
        while (1usize << (n + 1)) < self.len {
            n += 1;
        }
        n
    }

    /// Number of entries in the padded color table.
    pub fn table_size(&self) -> usize {
        1 << (self.table_bits() + 1)
    }

    /// Color table bytes padded with black to `table_size()` entries.
    pub fn table_bytes(&self) -> Vec<u8> {
        self.colors[..self.table_size()]
            .iter()
            .flat_map(|c| c.iter().copied())
            .collect()
    }

    /// Closest visible entry by summed channel distance, by linear search.
    ///
    /// Returns the transparent index only when the palette has no visible
    /// colors.
    pub fn nearest(&self, pixel: u32) -> u8 {
        let (r, g, b) = (red(pixel) as i32, green(pixel) as i32, blue(pixel) as i32);
        let mut best = TRANSPARENT_INDEX;
        let mut best_dist = i32::MAX;
        for (i, c) in self.colors[..self.len].iter().enumerate().skip(1) {
            let dist =
                (c[0] as i32 - r).abs() + (c[1] as i32 - g).abs() + (c[2] as i32 - b).abs();
            if dist < best_dist {
                best_dist = dist;
                best = i as u8;
            }
        }
        best
    }
}

/// A trained palette plus the lookup that maps pixels onto it.
pub trait Quantizer {
    fn palette(&self) -> &Palette;

    /// Palette index for an opaque pixel. Never the transparent index while
    /// the palette has a visible color.
    fn nearest_index(&self, pixel: u32) -> u8;

    /// Map a buffer to palette indices, keeping the sentinel transparent.
    fn index_pixels(&self, pixels: &[u32]) -> Vec<u8> {
        pixels
            .iter()
            .map(|&p| {
                if p == TRANSPARENT {
                    TRANSPARENT_INDEX
                } else {
                    self.nearest_index(p)
                }
            })
            .collect()
    }
}

/// Palette building strategy, chosen at pipeline construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QuantizerKind {
    /// Neural-network quantizer (higher quality, slower)
    #[default]
    #[value(name = "neuquant")]
    NeuQuant,
    /// Octree quantizer (faster)
    #[value(name = "octree")]
    Octree,
}

impl QuantizerKind {
    /// Train a palette for `pixels`. `sample_factor` only affects NeuQuant.
    pub fn build(self, pixels: &[u32], sample_factor: u32) -> GifResult<Box<dyn Quantizer>> {
        Ok(match self {
            QuantizerKind::NeuQuant => Box::new(NeuQuant::build(pixels, sample_factor)?),
            QuantizerKind::Octree => Box::new(Octree::build(pixels)),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            QuantizerKind::NeuQuant => "neuquant",
            QuantizerKind::Octree => "octree",
        }
    }
}

/// Build a fresh palette for one reduced frame and index its pixels.
pub fn quantize_frame(
    kind: QuantizerKind,
    sample_factor: u32,
    frame: ReducedFrame,
) -> GifResult<QuantizedFrame> {
    let quantizer = kind.build(&frame.pixels, sample_factor)?;
    let indices = quantizer.index_pixels(&frame.pixels);
    Ok(QuantizedFrame {
        sequence: frame.sequence,
        delay: frame.delay,
        canvas: frame.canvas,
        rect: frame.rect,
        indices,
        palette: quantizer.palette().clone(),
    })
}
