//! Common test utilities and helpers for the gif_capture tests
//!
//! Frame builders plus a small GIF block walker used to check the exact
//! byte layout the encoder produces.

#![allow(dead_code)]

/// Synthetic frame content
pub mod test_frames {
    use std::time::{Duration, SystemTime};

    pub const RED: u32 = 0xFFFF_0000;
    pub const GREEN: u32 = 0xFF00_FF00;
    pub const BLUE: u32 = 0xFF00_00FF;
    pub const WHITE: u32 = 0xFFFF_FFFF;
    pub const BLACK: u32 = 0xFF00_0000;

    pub fn solid(width: u32, height: u32, color: u32) -> Vec<u32> {
        vec![color; (width * height) as usize]
    }

    /// Copy of `base` with one pixel replaced.
    pub fn with_pixel(base: &[u32], width: u32, x: u32, y: u32, color: u32) -> Vec<u32> {
        let mut out = base.to_vec();
        out[(y * width + x) as usize] = color;
        out
    }

    /// Vertical bands cycling through `colors`, shifted by `phase` columns.
    pub fn bands(width: u32, height: u32, colors: &[u32], band: u32, phase: u32) -> Vec<u32> {
        (0..height)
            .flat_map(|_| (0..width).map(move |x| colors[(((x + phase) / band) as usize) % colors.len()]))
            .collect()
    }

    /// Pseudo-random picks from `colors`; compresses poorly on purpose.
    pub fn noise(width: u32, height: u32, colors: &[u32]) -> Vec<u32> {
        let mut state = 0x9E37_79B9u32;
        (0..width * height)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                colors[(state >> 24) as usize % colors.len()]
            })
            .collect()
    }

    /// Capture times starting at the epoch with the given gaps in milliseconds.
    pub fn timeline(gaps_ms: &[u64]) -> Vec<SystemTime> {
        let mut t = SystemTime::UNIX_EPOCH;
        let mut out = vec![t];
        for gap in gaps_ms {
            t += Duration::from_millis(*gap);
            out.push(t);
        }
        out
    }

    pub fn channels(pixel: u32) -> [u8; 3] {
        [(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8]
    }
}

/// Minimal GIF block walker for structural assertions
pub mod gif_blocks {
    #[derive(Debug, Clone)]
    pub struct Screen {
        pub width: u16,
        pub height: u16,
        pub packed: u8,
        pub background: u8,
        pub aspect: u8,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct GraphicControl {
        pub packed: u8,
        pub delay: u16,
        pub transparent_index: u8,
    }

    #[derive(Debug, Clone)]
    pub struct ImageBlock {
        pub control: Option<GraphicControl>,
        pub x: u16,
        pub y: u16,
        pub width: u16,
        pub height: u16,
        pub packed: u8,
        pub table: Vec<[u8; 3]>,
        pub min_code_size: u8,
        pub data: Vec<u8>,
        pub sub_block_sizes: Vec<usize>,
    }

    impl ImageBlock {
        pub fn indices(&self) -> Vec<u8> {
            lzw_decode(&self.data, self.min_code_size)
        }
    }

    #[derive(Debug, Clone)]
    pub struct ParsedGif {
        pub screen: Screen,
        pub loop_count: Option<u16>,
        pub images: Vec<ImageBlock>,
        pub trailer: bool,
    }

    struct Reader<'a> {
        bytes: &'a [u8],
        pos: usize,
    }

    impl<'a> Reader<'a> {
        fn u8(&mut self) -> u8 {
            let v = self.bytes[self.pos];
            self.pos += 1;
            v
        }

        fn u16(&mut self) -> u16 {
            let v = u16::from_le_bytes([self.bytes[self.pos], self.bytes[self.pos + 1]]);
            self.pos += 2;
            v
        }

        fn take(&mut self, n: usize) -> &'a [u8] {
            let v = &self.bytes[self.pos..self.pos + n];
            self.pos += n;
            v
        }

        fn sub_blocks(&mut self) -> (Vec<u8>, Vec<usize>) {
            let mut data = Vec::new();
            let mut sizes = Vec::new();
            loop {
                let n = self.u8() as usize;
                if n == 0 {
                    return (data, sizes);
                }
                sizes.push(n);
                data.extend_from_slice(self.take(n));
            }
        }
    }

    /// Walk every block; panics on anything malformed.
    pub fn parse(bytes: &[u8]) -> ParsedGif {
        let mut r = Reader { bytes, pos: 0 };
        assert_eq!(r.take(6), b"GIF89a", "signature");
        let screen = Screen {
            width: r.u16(),
            height: r.u16(),
            packed: r.u8(),
            background: r.u8(),
            aspect: r.u8(),
        };
        if screen.packed & 0x80 != 0 {
            r.take(3 << ((screen.packed & 7) + 1));
        }

        let mut loop_count = None;
        let mut images = Vec::new();
        let mut control = None;
        let mut trailer = false;

        while r.pos < bytes.len() {
            match r.u8() {
                0x21 => match r.u8() {
                    0xF9 => {
                        assert_eq!(r.u8(), 4, "graphic control size");
                        let packed = r.u8();
                        let delay = r.u16();
                        let transparent_index = r.u8();
                        assert_eq!(r.u8(), 0, "graphic control terminator");
                        control = Some(GraphicControl {
                            packed,
                            delay,
                            transparent_index,
                        });
                    }
                    0xFF => {
                        let size = r.u8() as usize;
                        let app = r.take(size).to_vec();
                        let (data, _) = r.sub_blocks();
                        if app == b"NETSCAPE2.0" && data.len() == 3 && data[0] == 1 {
                            loop_count = Some(u16::from_le_bytes([data[1], data[2]]));
                        }
                    }
                    _ => {
                        r.sub_blocks();
                    }
                },
                0x2C => {
                    let x = r.u16();
                    let y = r.u16();
                    let width = r.u16();
                    let height = r.u16();
                    let packed = r.u8();
                    let table = if packed & 0x80 != 0 {
                        r.take(3 << ((packed & 7) + 1))
                            .chunks_exact(3)
                            .map(|c| [c[0], c[1], c[2]])
                            .collect()
                    } else {
                        Vec::new()
                    };
                    let min_code_size = r.u8();
                    let (data, sub_block_sizes) = r.sub_blocks();
                    images.push(ImageBlock {
                        control: control.take(),
                        x,
                        y,
                        width,
                        height,
                        packed,
                        table,
                        min_code_size,
                        data,
                        sub_block_sizes,
                    });
                }
                0x3B => {
                    trailer = true;
                    assert_eq!(r.pos, bytes.len(), "bytes after trailer");
                }
                other => panic!("unexpected block 0x{:02X} at {}", other, r.pos - 1),
            }
        }

        ParsedGif {
            screen,
            loop_count,
            images,
            trailer,
        }
    }

    /// Plain LZW decoder for GIF image data.
    pub fn lzw_decode(data: &[u8], min_code_size: u8) -> Vec<u8> {
        let clear = 1usize << min_code_size;
        let end = clear + 1;
        let reset: Vec<Vec<u8>> = (0..clear + 2).map(|i| vec![i as u8]).collect();
        let mut table = reset.clone();
        let mut width = min_code_size as u32 + 1;
        let mut prev: Option<Vec<u8>> = None;
        let mut out = Vec::new();
        let (mut acc, mut nbits) = (0u32, 0u32);
        let mut bytes = data.iter();

        loop {
            while nbits < width {
                let Some(&byte) = bytes.next() else {
                    return out;
                };
                acc |= (byte as u32) << nbits;
                nbits += 8;
            }
            let code = (acc & ((1 << width) - 1)) as usize;
            acc >>= width;
            nbits -= width;

            if code == clear {
                table = reset.clone();
                width = min_code_size as u32 + 1;
                prev = None;
                continue;
            }
            if code == end {
                return out;
            }
            let entry = match table.get(code) {
                Some(e) => e.clone(),
                None => {
                    let p = prev.clone().expect("code past table without predecessor");
                    let mut e = p.clone();
                    e.push(p[0]);
                    e
                }
            };
            if let Some(mut p) = prev.take() {
                if table.len() < 4096 {
                    p.push(entry[0]);
                    table.push(p);
                    if table.len() == 1 << width && width < 12 {
                        width += 1;
                    }
                }
            }
            out.extend_from_slice(&entry);
            prev = Some(entry);
        }
    }
}
