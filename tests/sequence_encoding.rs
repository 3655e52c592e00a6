use std::collections::HashSet;
use std::io::Cursor;

use stardust_render::canvas::Canvas;
use stardust_render::encoding::{encode_sequence, encode_single, LoopMode};
use stardust_render::error_codes::{find_coded_error, EMPTY_FRAME_SEQUENCE};
use stardust_render::quantize::{quantize, IndexedCanvas};

const NETSCAPE: &[u8] = b"NETSCAPE2.0";

fn decode_frames(bytes: &[u8]) -> Vec<(u16, Vec<u8>)> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(bytes)).expect("valid gif");
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("frame decodes") {
        frames.push((frame.delay, frame.buffer.to_vec()));
    }
    frames
}

fn loop_block(bytes: &[u8]) -> [u8; 4] {
    let start = bytes
        .windows(NETSCAPE.len())
        .position(|window| window == NETSCAPE)
        .expect("loop extension present")
        + NETSCAPE.len();
    [bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]]
}

fn solid_frame(shade: u8) -> IndexedCanvas {
    let canvas = Canvas::new(16, 8, [shade, 255 - shade, 40]);
    quantize(&canvas, 64).unwrap()
}

fn noisy_canvas(width: u32, height: u32) -> Canvas {
    let mut canvas = Canvas::new(width, height, [0, 0, 0]);
    let mut state = 0x1234_5678_u32;
    for y in 0..height {
        for x in 0..width {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            canvas.blend(x, y, [r, g, b, 255]);
        }
    }
    canvas
}

#[test]
fn five_frames_keep_delay_order_and_infinite_loop() {
    let frames = (0..5).map(|i| solid_frame(i * 50)).collect::<Vec<_>>();
    let bytes = encode_sequence(&frames, 80, LoopMode::Infinite).unwrap();

    let decoded = decode_frames(&bytes);
    assert_eq!(decoded.len(), 5);
    for (i, (delay, rgba)) in decoded.iter().enumerate() {
        assert_eq!(*delay, 8);
        let shade = i as u8 * 50;
        assert_eq!(&rgba[..4], &[shade, 255 - shade, 40, 255], "frame {i}");
    }
    assert_eq!(loop_block(&bytes), [0x03, 0x01, 0x00, 0x00]);
}

#[test]
fn finite_loop_count_is_written() {
    let bytes =
        encode_sequence(&[solid_frame(0), solid_frame(9)], 100, LoopMode::Count(3)).unwrap();
    assert_eq!(loop_block(&bytes), [0x03, 0x01, 0x03, 0x00]);
    assert!(decode_frames(&bytes).iter().all(|(delay, _)| *delay == 10));
}

#[test]
fn quantized_sequence_respects_color_budget() {
    let canvas = noisy_canvas(64, 48);
    let distinct_source = canvas
        .pixels()
        .chunks_exact(4)
        .map(|p| [p[0], p[1], p[2]])
        .collect::<HashSet<_>>();
    assert!(distinct_source.len() > 64);

    let indexed = quantize(&canvas, 64).unwrap();
    let bytes = encode_sequence(&[indexed], 83, LoopMode::Infinite).unwrap();
    let decoded = decode_frames(&bytes);
    let distinct_decoded = decoded[0]
        .1
        .chunks_exact(4)
        .map(|p| [p[0], p[1], p[2]])
        .collect::<HashSet<_>>();
    assert!(
        distinct_decoded.len() <= 64,
        "decoded {} colors",
        distinct_decoded.len()
    );
}

#[test]
fn empty_sequence_is_refused() {
    let error = encode_sequence(&[], 80, LoopMode::Infinite).unwrap_err();
    assert_eq!(find_coded_error(&error).unwrap().code, EMPTY_FRAME_SEQUENCE);
}

#[test]
fn still_is_a_png_of_the_canvas() {
    let canvas = noisy_canvas(12, 7);
    let bytes = encode_single(&canvas).unwrap();
    let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (12, 7));
    assert_eq!(decoded.as_raw(), canvas.pixels());
}
