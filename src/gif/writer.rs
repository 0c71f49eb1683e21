//! GIF89a container writer.
//!
//! Stream layout:
//!
//! ```text
//! "GIF89a" | screen descriptor | [NETSCAPE2.0 loop]
//!   { graphic control | image descriptor | local color table | LZW data }*
//! 0x3B
//! ```
//!
//! There is no global color table; every frame carries its own palette and
//! declares index 0 transparent.

use std::io::Write;

use tracing::debug;

use crate::core::frame::{QuantizedFrame, MAX_DIMENSION};
use crate::error::{GifError, GifResult};
use crate::quant::TRANSPARENT_INDEX;

use super::lzw::{min_code_size, write_sub_blocks, LzwEncoder};

const SIGNATURE: &[u8; 6] = b"GIF89a";
const EXTENSION_INTRODUCER: u8 = 0x21;
const APPLICATION_LABEL: u8 = 0xFF;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Color resolution 7 (8 bits per primary), no global table, unsorted.
const SCREEN_PACKED: u8 = 0x70;
/// Disposal unspecified, no user input, transparent color present.
const GCE_PACKED: u8 = 0x01;
/// Local color table present, not interlaced, not sorted.
const LOCAL_TABLE_FLAG: u8 = 0x80;

/// Loop forever.
const LOOP_COUNT: u16 = 0;

/// Streams GIF blocks to a sink.
pub struct GifWriter<W: Write> {
    sink: W,
    looping: bool,
    canvas: Option<(u16, u16)>,
    frames_written: u64,
    lzw: LzwEncoder,
}

impl<W: Write> GifWriter<W> {
    /// Take ownership of `sink`. Nothing is written until the first frame.
    pub fn start(sink: W, looping: bool) -> Self {
        Self {
            sink,
            looping,
            canvas: None,
            frames_written: 0,
            lzw: LzwEncoder::new(),
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Emit one frame at `(offset_x, offset_y)` on the canvas.
    ///
    /// The first frame also emits the header, sized from its canvas.
    pub fn write_frame(
        &mut self,
        frame: &QuantizedFrame,
        offset_x: u32,
        offset_y: u32,
        delay: u16,
    ) -> GifResult<()> {
        let canvas = match self.canvas {
            Some(canvas) => canvas,
            None => {
                let canvas = canvas_size(frame)?;
                let mut header = Vec::with_capacity(32);
                encode_header(&mut header, canvas, self.looping);
                self.sink
                    .write_all(&header)
                    .map_err(|e| GifError::io("write header", e))?;
                self.canvas = Some(canvas);
                canvas
            }
        };

        let rect = frame.rect;
        if rect.is_empty()
            || offset_x + rect.width > canvas.0 as u32
            || offset_y + rect.height > canvas.1 as u32
        {
            return Err(GifError::malformed_frame(
                frame.sequence,
                format!(
                    "region {}x{}+{}+{} outside {}x{} canvas",
                    rect.width, rect.height, offset_x, offset_y, canvas.0, canvas.1
                ),
            ));
        }
        if frame.indices.len() != rect.area() {
            return Err(GifError::malformed_frame(
                frame.sequence,
                format!(
                    "expected {} indices, got {}",
                    rect.area(),
                    frame.indices.len()
                ),
            ));
        }

        let palette = &frame.palette;
        let table_bits = palette.table_bits();
        let code_size = min_code_size(table_bits);

        let mut block = Vec::with_capacity(frame.indices.len() / 2 + 800);

        block.extend_from_slice(&[EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, 4, GCE_PACKED]);
        block.extend_from_slice(&delay.to_le_bytes());
        block.extend_from_slice(&[TRANSPARENT_INDEX, 0]);

        block.push(IMAGE_SEPARATOR);
        for v in [offset_x, offset_y, rect.width, rect.height] {
            block.extend_from_slice(&(v as u16).to_le_bytes());
        }
        block.push(LOCAL_TABLE_FLAG | table_bits);
        block.extend_from_slice(&palette.table_bytes());

        block.push(code_size);
        let data = self.lzw.encode(&frame.indices, code_size);
        write_sub_blocks(&mut block, &data).map_err(|e| GifError::io("encode frame", e))?;

        self.sink
            .write_all(&block)
            .map_err(|e| GifError::io("write frame", e))?;
        self.frames_written += 1;

        debug!(
            sequence = frame.sequence,
            x = offset_x,
            y = offset_y,
            w = rect.width,
            h = rect.height,
            colors = palette.visible_len(),
            bytes = block.len(),
            "frame written"
        );
        Ok(())
    }

    /// Write the trailer, flush, and hand the sink back.
    ///
    /// A stream without frames still gets a header so it stays well-formed.
    pub fn finish(mut self) -> GifResult<W> {
        let mut tail = Vec::with_capacity(32);
        if self.canvas.is_none() {
            encode_header(&mut tail, (1, 1), self.looping);
        }
        tail.push(TRAILER);
        self.sink
            .write_all(&tail)
            .map_err(|e| GifError::io("write trailer", e))?;
        self.sink
            .flush()
            .map_err(|e| GifError::io("flush", e))?;
        Ok(self.sink)
    }
}

fn canvas_size(frame: &QuantizedFrame) -> GifResult<(u16, u16)> {
    let (w, h) = frame.canvas;
    if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(GifError::malformed_frame(
            frame.sequence,
            format!("canvas {}x{} not representable", w, h),
        ));
    }
    Ok((w as u16, h as u16))
}

fn encode_header(out: &mut Vec<u8>, canvas: (u16, u16), looping: bool) {
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&canvas.0.to_le_bytes());
    out.extend_from_slice(&canvas.1.to_le_bytes());
    out.extend_from_slice(&[SCREEN_PACKED, 0, 0]);
    if looping {
        out.extend_from_slice(&[EXTENSION_INTRODUCER, APPLICATION_LABEL, 11]);
        out.extend_from_slice(b"NETSCAPE2.0");
        out.extend_from_slice(&[3, 1]);
        out.extend_from_slice(&LOOP_COUNT.to_le_bytes());
        out.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::Rect;
    use crate::quant::Palette;

    fn frame(rect: Rect, indices: Vec<u8>, palette: Palette) -> QuantizedFrame {
        QuantizedFrame {
            sequence: 0,
            delay: 0,
            canvas: (4, 4),
            rect,
            indices,
            palette,
        }
    }

    #[test]
    fn test_header_and_single_frame_layout() {
        let palette = Palette::with_colors([[255, 0, 0]]);
        let f = frame(Rect::new(1, 2, 1, 1), vec![1], palette);

        let mut writer = GifWriter::start(Vec::new(), true);
        writer.write_frame(&f, 1, 2, 50).unwrap();
        let bytes = writer.finish().unwrap();

        let mut expected = b"GIF89a".to_vec();
        expected.extend_from_slice(&[4, 0, 4, 0, 0x70, 0, 0]);
        expected.extend_from_slice(&[0x21, 0xFF, 0x0B]);
        expected.extend_from_slice(b"NETSCAPE2.0");
        expected.extend_from_slice(&[3, 1, 0, 0, 0]);
        expected.extend_from_slice(&[0x21, 0xF9, 4, 1, 50, 0, 0, 0]);
        expected.extend_from_slice(&[0x2C, 1, 0, 2, 0, 1, 0, 1, 0, 0x80]);
        expected.extend_from_slice(&[0, 0, 0, 255, 0, 0]);
        expected.push(2);
        assert_eq!(&bytes[..expected.len()], &expected[..]);
        assert_eq!(*bytes.last().unwrap(), 0x3B);
    }

    #[test]
    fn test_without_loop_extension() {
        let palette = Palette::with_colors([[0, 0, 255]]);
        let mut writer = GifWriter::start(Vec::new(), false);
        writer
            .write_frame(&frame(Rect::full(4, 4), vec![1; 16], palette), 0, 0, 0)
            .unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes[13], 0x21);
        assert_eq!(bytes[14], 0xF9);
    }

    #[test]
    fn test_empty_stream_is_well_formed() {
        let bytes = GifWriter::start(Vec::new(), false).finish().unwrap();
        assert_eq!(bytes, b"GIF89a\x01\x00\x01\x00\x70\x00\x00\x3B".to_vec());
    }

    #[test]
    fn test_region_outside_canvas_is_rejected() {
        let palette = Palette::with_colors([[0, 0, 255]]);
        let mut writer = GifWriter::start(Vec::new(), false);
        let err = writer
            .write_frame(&frame(Rect::new(3, 3, 2, 2), vec![1; 4], palette), 3, 3, 0)
            .unwrap_err();
        assert_eq!(err.category(), "malformed_frame");
    }

    #[test]
    fn test_sink_failure_is_io_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let palette = Palette::with_colors([[1, 2, 3]]);
        let mut writer = GifWriter::start(Broken, false);
        let err = writer
            .write_frame(&frame(Rect::full(4, 4), vec![1; 16], palette), 0, 0, 0)
            .unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
