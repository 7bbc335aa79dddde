//! `ImageExpander`: the per-scanline request state machine of `spec.md`
//! §4.3, tying together bit-depth dispatch ([`crate::decode`]), LUT sharing
//! ([`crate::cache`]), the shared expansion buffer ([`crate::buffer`]), and
//! on-the-fly colour conversion ([`crate::convert`]).

use rip_color::ColorantId;

use crate::buffer::{ExpansionBuffer, ScanlineKey};
use crate::convert::{convert_scanline_in_place, OnTheFlyConverter};
use crate::decode::decode_scanline;
use crate::error::{Error, Result};
use crate::lut::Lut;

/// The only obligation `spec.md` §6 places on the (external, out-of-scope)
/// tiled image store: hand back a contiguous run of packed sample bytes for
/// one plane, plus how many bytes were actually available (a tile may run
/// short at the image's right edge).
pub trait ImageStore {
    fn fetch(&self, x: u32, y: u32, plane: usize) -> Result<(&[u8], usize)>;
}

/// `obpp` is fixed to one of two device-word widths; `spec.md` §3 "Image
/// expander" fields this as `ObitsPerChannel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObitsPerChannel {
    Eight,
    Sixteen,
}

impl ObitsPerChannel {
    pub fn bits(self) -> u32 {
        match self {
            ObitsPerChannel::Eight => 8,
            ObitsPerChannel::Sixteen => 16,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }
}

/// A fully decoded (and, where applicable, converted/quantised) scanline,
/// with planes laid out back-to-back in request order.
#[derive(Debug, Clone)]
pub struct ExpandedScanline {
    pub key: ScanlineKey,
    pub planes: Vec<Vec<u8>>,
}

impl ExpandedScanline {
    pub fn plane(&self, i: usize) -> &[u8] {
        &self.planes[i]
    }
}

/// Per-channel destination: which output plane a source channel expands
/// into, or `None` if the channel isn't mapped for this request
/// (`spec.md` §4.3 "clear buffer if any unmapped channels").
pub type ChannelMapping = Vec<Option<usize>>;

/// Fields per `spec.md` §3 "Image expander".
pub struct ImageExpander {
    pub image_id: u32,
    pub ibpp: u32,
    pub expibpp: u32,
    pub obpp: ObitsPerChannel,
    pub luts: Vec<Lut>,
    pub lut_group: Vec<u32>,
    pub colorant_plane: Vec<ColorantId>,
    pub converter: Option<Box<dyn OnTheFlyConverter + Send + Sync>>,
    pub alpha_store: Option<Box<dyn ImageStore + Send + Sync>>,
    buffer: std::sync::Arc<ExpansionBuffer>,
    cached: Option<ExpandedScanline>,
}

impl ImageExpander {
    pub fn new(
        image_id: u32,
        ibpp: u32,
        expibpp: u32,
        obpp: ObitsPerChannel,
        luts: Vec<Lut>,
        colorant_plane: Vec<ColorantId>,
        buffer: std::sync::Arc<ExpansionBuffer>,
    ) -> Result<Self> {
        if expibpp > 16 {
            return Err(Error::LutTooLarge {
                input_bits: expibpp,
                components: 1,
            });
        }
        let lut_group = vec![1u32; luts.len()];
        Ok(Self {
            image_id,
            ibpp,
            expibpp,
            obpp,
            luts,
            lut_group,
            colorant_plane,
            converter: None,
            alpha_store: None,
            buffer,
            cached: None,
        })
    }

    pub fn buffer(&self) -> &std::sync::Arc<ExpansionBuffer> {
        &self.buffer
    }

    /// Aligns a scanline start to a word boundary so that composite LUT
    /// accesses (widened groups) never straddle a group boundary, per
    /// `spec.md` §4.3 "align x to word boundary". Returns `(aligned_x,
    /// leading_samples)`: the caller decodes from `aligned_x` and discards
    /// `leading_samples` samples from the front of the result.
    fn align_x(&self, x: u32) -> (u32, u32) {
        let word = self.lut_group.iter().copied().max().unwrap_or(1).max(1);
        let aligned = (x / word) * word;
        (aligned, x - aligned)
    }

    /// Runs the full per-scanline request state machine of `spec.md` §4.3
    /// and returns the resulting scanline. A request with an identical key
    /// to the currently cached scanline is answered without re-decoding.
    pub fn request(
        &mut self,
        store: &dyn ImageStore,
        x: u32,
        y: u32,
        n: u32,
        mapping: &ChannelMapping,
    ) -> Result<&ExpandedScanline> {
        let key = ScanlineKey {
            image_id: self.image_id,
            x,
            y,
            n,
            otf: self.converter.is_some(),
            mapping: mapping.clone(),
        };
        if let Some(cached) = &self.cached {
            if cached.key == key {
                return Ok(self.cached.as_ref().unwrap());
            }
        }

        let (aligned_x, leading) = self.align_x(x);
        let aligned_n = n + leading;
        let has_unmapped = mapping.iter().any(Option::is_none);

        let mut planes = Vec::with_capacity(self.luts.len());
        for (plane_idx, lut) in self.luts.iter().enumerate() {
            if has_unmapped && mapping.get(plane_idx).copied().flatten().is_none() {
                let out_bytes = if matches!(lut, Lut::Identity) {
                    self.obpp.bytes()
                } else {
                    lut.output_bytes()
                };
                planes.push(vec![0u8; n as usize * out_bytes]);
                continue;
            }

            let (tile, available) = store.fetch(aligned_x, y, plane_idx)?;
            if (available as u64) < (aligned_n as u64 * self.ibpp as u64).div_ceil(8) {
                tracing::debug!(plane = plane_idx, available, "image store tile shorter than requested run");
            }
            let group = self.lut_group[plane_idx];
            let decoded = decode_scanline(tile, self.ibpp, aligned_n as usize, lut, group, self.obpp.bits());

            let out_bytes = if matches!(lut, Lut::Identity) {
                self.obpp.bytes()
            } else {
                lut.output_bytes()
            };
            let skip = leading as usize * out_bytes;
            planes.push(decoded[skip.min(decoded.len())..].to_vec());
        }

        if let Some(converter) = &self.converter {
            for plane in &mut planes {
                let n_pixels = plane.len() / 4;
                if n_pixels > 0 && plane.len() % 4 == 0 {
                    let mut as_f32: Vec<f32> = plane
                        .chunks_exact(4)
                        .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                        .collect();
                    convert_scanline_in_place(&mut as_f32, n_pixels, 1, 1, converter.as_ref());
                    *plane = as_f32.iter().flat_map(|f| f.to_be_bytes()).collect();
                }
            }
        }

        let scanline = ExpandedScanline { key, planes };
        self.cached = Some(scanline);
        Ok(self.cached.as_ref().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FakeStore {
        rows: Vec<Vec<u8>>,
    }

    impl ImageStore for FakeStore {
        fn fetch(&self, x: u32, _y: u32, plane: usize) -> Result<(&[u8], usize)> {
            let row = &self.rows[plane];
            let start = x as usize;
            Ok((&row[start..], row.len() - start))
        }
    }

    #[test]
    fn repeated_request_with_same_key_hits_cache() {
        let store = FakeStore {
            rows: vec![vec![0b1011_0010u8; 4]],
        };
        let lut = Lut::Table {
            entries: vec![0x00, 0xFF],
            output_bytes: 1,
        };
        let buffer = ExpansionBuffer::new(64);
        let mut expander =
            ImageExpander::new(1, 1, 1, ObitsPerChannel::Eight, vec![lut], vec![], buffer).unwrap();

        let mapping: ChannelMapping = vec![Some(0)];
        let first = expander.request(&store, 0, 0, 8, &mapping).unwrap().clone();
        let second = expander.request(&store, 0, 0, 8, &mapping).unwrap();
        assert_eq!(first.planes, second.planes);
    }

    #[test]
    fn unmapped_channel_clears_plane() {
        let store = FakeStore {
            rows: vec![vec![0xFFu8; 4]],
        };
        let lut = Lut::Table {
            entries: vec![0x00, 0xFF],
            output_bytes: 1,
        };
        let buffer = ExpansionBuffer::new(64);
        let mut expander =
            ImageExpander::new(1, 1, 1, ObitsPerChannel::Eight, vec![lut], vec![], buffer).unwrap();

        let mapping: ChannelMapping = vec![None];
        let scanline = expander.request(&store, 0, 0, 4, &mapping).unwrap();
        assert!(scanline.plane(0).iter().all(|&b| b == 0));
    }

    #[test]
    fn mapping_change_invalidates_cache() {
        let store = FakeStore {
            rows: vec![vec![0xFFu8; 4]],
        };
        let lut = Lut::Table {
            entries: vec![0x00, 0xFF],
            output_bytes: 1,
        };
        let buffer = ExpansionBuffer::new(64);
        let mut expander =
            ImageExpander::new(1, 1, 1, ObitsPerChannel::Eight, vec![lut], vec![], buffer).unwrap();

        let mapped: ChannelMapping = vec![Some(0)];
        let decoded = expander.request(&store, 0, 0, 4, &mapped).unwrap().plane(0).to_vec();
        assert!(decoded.iter().all(|&b| b == 0xFF));

        let unmapped: ChannelMapping = vec![None];
        let cleared = expander.request(&store, 0, 0, 4, &unmapped).unwrap();
        assert!(cleared.plane(0).iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_expibpp_above_sixteen() {
        let buffer = ExpansionBuffer::new(64);
        let result = ImageExpander::new(1, 1, 17, ObitsPerChannel::Eight, vec![], vec![], buffer);
        assert!(matches!(result, Err(Error::LutTooLarge { .. })));
    }
}
