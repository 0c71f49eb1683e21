//! Variable-width LZW compression for GIF image data.
//!
//! Codes are packed least-significant bit first. The stream opens with a
//! clear code, widens codes as the dictionary grows, resets the dictionary
//! with a clear code once 4096 codes are in use, and closes with the end
//! code.

use std::collections::HashMap;
use std::io::{self, Write};

/// Widest code GIF allows.
pub const MAX_CODE_BITS: u8 = 12;
const MAX_CODES: u32 = 1 << MAX_CODE_BITS;

/// Largest payload of one data sub-block.
pub const MAX_SUB_BLOCK: usize = 255;

/// LSB-first bit packer.
#[derive(Debug, Default)]
struct BitWriter {
    buffer: Vec<u8>,
    bit_buffer: u32,
    bits_in_buffer: u8,
}

impl BitWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    #[inline]
    fn write_bits(&mut self, bits: u32, count: u8) {
        debug_assert!(count <= MAX_CODE_BITS);
        debug_assert!(bits < (1 << count));

        self.bit_buffer |= bits << self.bits_in_buffer;
        self.bits_in_buffer += count;

        while self.bits_in_buffer >= 8 {
            self.buffer.push(self.bit_buffer as u8);
            self.bit_buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
    }

    /// Flush the partial byte, zero padded.
    fn finish(mut self) -> Vec<u8> {
        if self.bits_in_buffer > 0 {
            self.buffer.push(self.bit_buffer as u8);
        }
        self.buffer
    }
}

/// LZW encoder. Keeps its dictionary allocation between frames.
#[derive(Debug, Default)]
pub struct LzwEncoder {
    table: HashMap<u32, u16>,
}

/// Per-stream coder state.
struct CodeStream {
    out: BitWriter,
    min_code_size: u8,
    clear_code: u32,
    next_code: u32,
    code_width: u8,
}

impl CodeStream {
    fn emit(&mut self, code: u32) {
        self.out.write_bits(code, self.code_width);
        if self.next_code > (1 << self.code_width) - 1 && self.code_width < MAX_CODE_BITS {
            self.code_width += 1;
        }
    }

    fn reset_width(&mut self) {
        self.next_code = self.clear_code + 2;
        self.code_width = self.min_code_size + 1;
    }
}

impl LzwEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress palette indices. Every index must be below `1 << min_code_size`.
    pub fn encode(&mut self, indices: &[u8], min_code_size: u8) -> Vec<u8> {
        debug_assert!((2..=8).contains(&min_code_size));
        let clear_code = 1u32 << min_code_size;
        let end_code = clear_code + 1;

        self.table.clear();
        let mut stream = CodeStream {
            out: BitWriter::with_capacity(indices.len() / 2 + 16),
            min_code_size,
            clear_code,
            next_code: clear_code + 2,
            code_width: min_code_size + 1,
        };

        stream.emit(clear_code);

        let mut iter = indices.iter();
        let Some(&first) = iter.next() else {
            stream.emit(end_code);
            return stream.out.finish();
        };

        let mut prefix = first as u32;
        for &k in iter {
            debug_assert!((k as u32) < clear_code);
            let key = prefix << 8 | k as u32;
            if let Some(&code) = self.table.get(&key) {
                prefix = code as u32;
                continue;
            }

            stream.emit(prefix);
            if stream.next_code < MAX_CODES {
                self.table.insert(key, stream.next_code as u16);
                stream.next_code += 1;
            } else {
                // dictionary full
                self.table.clear();
                stream.next_code = clear_code + 2;
                stream.emit(clear_code);
                stream.reset_width();
            }
            prefix = k as u32;
        }

        stream.emit(prefix);
        stream.emit(end_code);
        stream.out.finish()
    }
}

/// Minimum code size byte for a color table of `2^(table_bits+1)` entries.
pub fn min_code_size(table_bits: u8) -> u8 {
    (table_bits + 1).max(2)
}

/// Write `data` as length-prefixed sub-blocks followed by the zero terminator.
pub fn write_sub_blocks<W: Write>(sink: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(MAX_SUB_BLOCK) {
        sink.write_all(&[chunk.len() as u8])?;
        sink.write_all(chunk)?;
    }
    sink.write_all(&[0])
}
