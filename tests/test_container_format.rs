//! Byte-level checks of the GIF stream produced by the pipeline

mod common;

use std::time::SystemTime;

use common::gif_blocks::parse;
use common::test_frames::{noise, solid, timeline, with_pixel, BLUE, GREEN, RED, WHITE};
use gif_capture::{EncoderConfig, Pipeline, QuantizerKind};

fn encode(config: EncoderConfig, frames: Vec<(Vec<u32>, u32, u32, SystemTime)>, looping: bool) -> Vec<u8> {
    let mut pipeline = Pipeline::<Vec<u8>>::new(config).expect("config");
    pipeline.start(Vec::new(), looping).expect("start");
    for (pixels, w, h, at) in frames {
        pipeline.submit(pixels, w, h, at).expect("submit");
    }
    pipeline.finish().expect("finish")
}

fn unscaled() -> EncoderConfig {
    EncoderConfig::default()
        .without_scaling()
        .with_fixed_delay(50)
        .with_sample_factor(1)
}

#[test]
fn test_two_frames_with_changed_corner() {
    let first = solid(4, 4, RED);
    let second = with_pixel(&first, 4, 3, 3, BLUE);
    let t = timeline(&[100]);

    let bytes = encode(unscaled(), vec![(first, 4, 4, t[0]), (second, 4, 4, t[1])], true);
    let gif = parse(&bytes);

    assert_eq!(gif.screen.width, 4);
    assert_eq!(gif.screen.height, 4);
    assert_eq!(gif.screen.packed, 0x70);
    assert_eq!(gif.loop_count, Some(0));
    assert!(gif.trailer);
    assert_eq!(bytes.last(), Some(&0x3B));
    assert_eq!(gif.images.len(), 2);

    let full = &gif.images[0];
    assert_eq!((full.x, full.y, full.width, full.height), (0, 0, 4, 4));
    let corner = &gif.images[1];
    assert_eq!((corner.x, corner.y, corner.width, corner.height), (3, 3, 1, 1));

    for image in &gif.images {
        let control = image.control.expect("graphic control before every image");
        assert_eq!(control.delay, 50);
        assert_eq!(control.packed & 1, 1);
        assert_eq!(control.transparent_index, 0);
        assert_eq!(image.packed & 0x80, 0x80);
        assert_eq!(image.table.len(), 1 << ((image.packed & 7) + 1));
        assert_eq!(image.table[0], [0, 0, 0]);
    }

    let corner_indices = corner.indices();
    assert_eq!(corner_indices.len(), 1);
    let entry = corner.table[corner_indices[0] as usize];
    assert!(entry[2] > 200 && entry[0] < 60, "corner decoded as {:?}", entry);
}

#[test]
fn test_without_loop_extension() {
    let t = timeline(&[]);
    let bytes = encode(unscaled(), vec![(solid(2, 2, GREEN), 2, 2, t[0])], false);
    let gif = parse(&bytes);
    assert_eq!(gif.loop_count, None);
    assert_eq!(gif.images.len(), 1);
    assert_eq!(&bytes[13..15], &[0x21, 0xF9]);
}

#[test]
fn test_empty_stream() {
    let bytes = encode(unscaled(), Vec::new(), true);
    let gif = parse(&bytes);
    assert_eq!((gif.screen.width, gif.screen.height), (1, 1));
    assert!(gif.images.is_empty());
    assert!(gif.trailer);
}

#[test]
fn test_solid_frame_single_palette_entry() {
    let t = timeline(&[]);
    for kind in [QuantizerKind::NeuQuant, QuantizerKind::Octree] {
        let config = unscaled().with_quantizer(kind);
        let bytes = encode(config, vec![(solid(100, 100, WHITE), 100, 100, t[0])], true);
        let gif = parse(&bytes);
        let image = &gif.images[0];
        let indices = image.indices();
        assert_eq!(indices.len(), 100 * 100);
        assert!(indices.iter().all(|&i| i == indices[0]), "{:?}", kind);
        assert_ne!(indices[0], 0);
        assert_eq!(image.table[indices[0] as usize], [255, 255, 255]);
    }
}

#[test]
fn test_large_frame_is_split_into_sub_blocks() {
    let pixels = noise(120, 80, &[RED, GREEN, BLUE, WHITE]);
    let t = timeline(&[]);
    let bytes = encode(unscaled(), vec![(pixels, 120, 80, t[0])], false);
    let gif = parse(&bytes);
    let image = &gif.images[0];

    assert!(image.sub_block_sizes.len() > 1);
    let (last, rest) = image.sub_block_sizes.split_last().unwrap();
    assert!(rest.iter().all(|&n| n == 255));
    assert!(*last >= 1 && *last <= 255);
    assert_eq!(image.indices().len(), 120 * 80);
}

#[test]
fn test_frames_arrive_in_submission_order() {
    // frame i lasts (i + 1) * 10 ms, so the delays spell out the order
    let gaps: Vec<u64> = (1..=11).map(|i| i * 10).collect();
    let times = timeline(&gaps);
    let colors = [RED, GREEN, BLUE, WHITE];
    let frames = times
        .iter()
        .enumerate()
        .map(|(i, &at)| (solid(6, 6, colors[i % colors.len()]), 6, 6, at))
        .collect();

    let config = EncoderConfig::default()
        .without_scaling()
        .with_sample_factor(1)
        .with_queue_capacity(1)
        .with_final_delay(99);
    let gif = parse(&encode(config, frames, true));

    let delays: Vec<u16> = gif
        .images
        .iter()
        .map(|i| i.control.expect("graphic control").delay)
        .collect();
    let mut expected: Vec<u16> = (1..=11).collect();
    expected.push(99);
    assert_eq!(delays, expected);
}
