//! GIF89a encoding: LZW compression and block emission.

pub mod lzw;
pub mod writer;

pub use writer::GifWriter;
