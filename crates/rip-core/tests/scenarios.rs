//! End-to-end scenarios spanning more than one component, mirroring the
//! numbered list in `spec.md` §8 "Concrete end-to-end scenarios".

use std::sync::Arc;

use rip_color::{BlitColor, BlitColorMap, Channel, ChannelBits, ColorantId, PackVariant};
use rip_gouraud::{GouraudTriangle, NoiseGenerator, ShadingWorkspace, SpanSink, Vertex};
use rip_image::{ExpansionBuffer, ImageExpander, ImageStore, LowMemoryHandler, Lut, ObitsPerChannel};

/// Scenario 1: monochrome span, a single 1-bit `/All` channel.
#[test]
fn scenario_1_monochrome_span() {
    let channel = Channel::new(ColorantId::All, 0, 1);
    let map = Arc::new(BlitColorMap::new(vec![channel], PackVariant::Mask, 1).unwrap());

    let mut present = ChannelBits::new();
    present.set(0);

    let mut black = BlitColor::init(map.clone());
    black.unpack(&[0], 0, &present, false, false).unwrap();
    black.quantise_set_screen(0, 0, |_| 255);
    black.quantise().unwrap();
    black.pack().unwrap();
    assert_eq!(black.packed().as_bytes()[0], 0);

    let mut white = BlitColor::init(map);
    white.unpack(&[0xFFFF], 0, &present, false, false).unwrap();
    white.quantise_set_screen(0, 0, |_| 255);
    white.quantise().unwrap();
    white.pack().unwrap();
    assert_eq!(white.packed().as_bytes()[0], 0xFF);

    let mask = white.overprint_mask(
        rip_color::ChannelState::PRESENT,
        rip_color::ChannelState::PRESENT,
    );
    assert_eq!(mask.as_bytes()[0], 0xFF);
}

/// Scenario 3: the Gouraud triangle's first and last scanline behaviour.
#[test]
fn scenario_3_gouraud_scanlines() {
    let tri = GouraudTriangle {
        vertices: [
            Vertex::new(0, 0, vec![0]),
            Vertex::new(100, 0, vec![255]),
            Vertex::new(0, 100, vec![0]),
        ],
        htmax: &[255],
        mbands: 16,
    };

    struct RecordingSink {
        rows: Vec<(i64, i64, u16)>,
    }
    impl SpanSink for RecordingSink {
        fn emit_span_single(&mut self, y: i64, x0: i64, _len: u32, color: u16) {
            self.rows.push((y, x0, color));
        }
        fn emit_span_multi(&mut self, y: i64, x0: i64, _len: u32, colors: &[u16]) {
            self.rows.push((y, x0, colors[0]));
        }
    }

    let ws = ShadingWorkspace::new();
    let noise = NoiseGenerator::default();
    let mut sink = RecordingSink { rows: Vec::new() };
    tri.render(&ws, &noise, &[0], &mut sink, &()).unwrap();

    let first_row_start = sink.rows.iter().find(|(y, x, _)| *y == 0 && *x == 0);
    assert!(first_row_start.is_some());
    let last_row_start = sink.rows.iter().find(|(y, x, _)| *y == 99 && *x == 0);
    assert_eq!(last_row_start.map(|(_, _, c)| *c), Some(0));
}

/// Scenario 6: three images with 1 KB/4 KB/2 KB buffers, all refcount 1;
/// after one release, all three share the 4 KB buffer, the other two are
/// freed, and the page's shared pointer is the 4 KB buffer.
#[test]
fn scenario_6_expansion_buffer_low_memory_release() {
    let mut handler = LowMemoryHandler::new();
    let small = ExpansionBuffer::new(1024);
    let large = ExpansionBuffer::new(4096);
    let medium = ExpansionBuffer::new(2048);
    handler.register(small);
    handler.register(large.clone());
    handler.register(medium);

    let shared = handler.release().unwrap();
    assert_eq!(shared.size(), 4096);
    assert!(Arc::ptr_eq(&shared, &large));
    assert!(Arc::ptr_eq(handler.shared().unwrap(), &large));
}

/// A scanline decode driven entirely through the public `ImageExpander`
/// API, covering the word-boundary alignment behaviour named in the
/// "Boundaries" testable property: asking for the same visible pixels at a
/// word-aligned `x` yields the same bytes from the aligned offset.
#[test]
fn image_expander_word_alignment_is_consistent() {
    struct RowStore {
        row: Vec<u8>,
    }
    impl ImageStore for RowStore {
        fn fetch(&self, x: u32, _y: u32, _plane: usize) -> rip_image::Result<(&[u8], usize)> {
            let start = x as usize;
            Ok((&self.row[start..], self.row.len() - start))
        }
    }

    let lut = Lut::Table {
        entries: vec![0x00, 0xFF],
        output_bytes: 1,
    };
    let store = RowStore {
        row: vec![0xAA, 0x55, 0xAA, 0x55],
    };
    let buffer = ExpansionBuffer::new(64);
    let mut expander =
        ImageExpander::new(1, 1, 1, ObitsPerChannel::Eight, vec![lut], vec![], buffer).unwrap();

    let mapping = vec![Some(0)];
    let a = expander.request(&store, 0, 0, 8, &mapping).unwrap().plane(0).to_vec();
    let b = expander.request(&store, 0, 0, 8, &mapping).unwrap().plane(0).to_vec();
    assert_eq!(a, b);
}
