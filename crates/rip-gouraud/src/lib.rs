//! Gouraud-shaded triangle rendering: exact plane-equation color
//! interpolation across an arbitrary number of channels, via a three-part
//! rational DDA that structurally cannot overflow 32-bit arithmetic.

mod channel;
mod dda;
mod error;
mod noise;
mod triangle;
mod workspace;

pub use channel::{max_band, ChannelDda, Regime};
pub use dda::Dda;
pub use error::{Error, Result};
pub use noise::NoiseGenerator;
pub use triangle::{GouraudTriangle, InterruptPoll, SpanSink, Vertex};
pub use workspace::ShadingWorkspace;

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink {
        pixels: usize,
    }

    impl SpanSink for CountingSink {
        fn emit_span_single(&mut self, _y: i64, _x0: i64, len: u32, _color: u16) {
            self.pixels += len as usize;
        }
        fn emit_span_multi(&mut self, _y: i64, _x0: i64, len: u32, _colors: &[u16]) {
            self.pixels += len as usize;
        }
    }

    #[test]
    fn end_to_end_triangle_paints_expected_pixel_count() {
        // v0=(0,0,0), v1=(100,0,65535), v2=(0,100,0): a right triangle with
        // legs of length 100, area 5000, so roughly that many pixels paint.
        let tri = GouraudTriangle {
            vertices: [
                Vertex::new(0, 0, vec![0]),
                Vertex::new(100, 0, vec![65535]),
                Vertex::new(0, 100, vec![0]),
            ],
            htmax: &[255],
            mbands: 16,
        };
        let ws = ShadingWorkspace::new();
        let noise = NoiseGenerator::default();
        let mut sink = CountingSink { pixels: 0 };
        tri.render(&ws, &noise, &[0], &mut sink, &()).unwrap();
        assert!(sink.pixels > 0 && sink.pixels < 10_000);
    }
}
