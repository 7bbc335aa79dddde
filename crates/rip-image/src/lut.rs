//! Lookup tables mapping packed input samples to output-plane bytes, plus
//! the widening transform that folds several per-sample outputs into one
//! composite table entry (`spec.md` §4.3 "LUT widening").

use crate::error::{Error, Result};

/// Entries above this index-bit budget are rejected at image-open time
/// (`spec.md` §7 "LUT-size overflow"): `2^16` entries is already generous
/// for a per-plane table, and letting `input_bits * components` grow
/// further (e.g. a naively widened 32-bit-per-sample table) would blow up
/// memory for no benefit over pre-converting the samples instead.
const MAX_LUT_INDEX_BITS: u32 = 16;

/// Whether a LUT of `2^(input_bits * components)` entries would exceed the
/// safe budget, per `spec.md` §4.3/§7.
pub fn would_overflow(input_bits: u32, components: u32) -> bool {
    input_bits.saturating_mul(components) > MAX_LUT_INDEX_BITS
}

/// A per-plane lookup table, or a marker that the plane needs no table
/// (already-decoded / pre-converted data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lut {
    /// `entries.len() / output_bytes` indexable samples, each
    /// `output_bytes` long.
    Table {
        entries: Vec<u8>,
        output_bytes: usize,
    },
    /// No lookup needed: the source byte(s) are the output byte(s)
    /// verbatim (a store plane already decoded, per `spec.md` §4.6).
    Identity,
}

impl Lut {
    /// Builds a table LUT, rejecting the request if it would overflow the
    /// safe budget (`spec.md` §7 "LUT-size overflow": falls back to
    /// pre-converting samples instead of building a LUT").
    pub fn build(
        input_bits: u32,
        components: u32,
        output_bytes: usize,
        mut sample: impl FnMut(u32) -> Vec<u8>,
    ) -> Result<Self> {
        if would_overflow(input_bits, components) {
            return Err(Error::LutTooLarge {
                input_bits,
                components,
            });
        }
        let n = 1usize << (input_bits * components);
        let mut entries = Vec::with_capacity(n * output_bytes);
        for idx in 0..n as u32 {
            let bytes = sample(idx);
            debug_assert_eq!(bytes.len(), output_bytes);
            entries.extend_from_slice(&bytes);
        }
        Ok(Lut::Table {
            entries,
            output_bytes,
        })
    }

    pub fn output_bytes(&self) -> usize {
        match self {
            Lut::Table { output_bytes, .. } => *output_bytes,
            Lut::Identity => 0,
        }
    }

    /// Looks up the output bytes for `index`, for a [`Lut::Table`].
    pub fn lookup(&self, index: u32) -> Option<&[u8]> {
        match self {
            Lut::Table { entries, output_bytes } => {
                let start = index as usize * output_bytes;
                entries.get(start..start + output_bytes)
            }
            Lut::Identity => None,
        }
    }

    /// Folds `n_components` per-sample outputs into one composite table
    /// entry, so that a `n_components`-sample group of the source can be
    /// decoded through a single LUT access instead of `n_components`
    /// separate ones (`spec.md` §4.3 "LUT widening").
    ///
    /// Only applies when `2^(input_bits * n_components) <= 256` and the
    /// combined output packs into a native 8/16/32-bit word; returns `None`
    /// otherwise (including for [`Lut::Identity`], which needs no
    /// widening). Samples are folded high-sample-first, matching the
    /// high-bit-first packing convention used throughout the blit-color
    /// pipeline.
    pub fn widen(&self, input_bits: u32, n_components: u32) -> Option<Lut> {
        let Lut::Table { entries, output_bytes } = self else {
            return None;
        };
        if n_components == 0 || input_bits == 0 {
            return None;
        }
        let total_entries = 1u64.checked_shl(input_bits * n_components)?;
        if total_entries > 256 {
            return None;
        }
        let combined_output_bytes = output_bytes.checked_mul(n_components as usize)?;
        if !matches!(combined_output_bytes, 1 | 2 | 4) {
            return None;
        }
        let per_sample_entries = 1usize << input_bits;
        if entries.len() != per_sample_entries * output_bytes {
            return None;
        }

        let mut widened = Vec::with_capacity(total_entries as usize * combined_output_bytes);
        for composite in 0..total_entries as u32 {
            for i in 0..n_components {
                let shift = input_bits * (n_components - 1 - i);
                let sample = (composite >> shift) & ((1u32 << input_bits) - 1);
                let start = sample as usize * output_bytes;
                widened.extend_from_slice(&entries[start..start + output_bytes]);
            }
        }
        Some(Lut::Table {
            entries: widened,
            output_bytes: combined_output_bytes,
        })
    }

    /// Regenerates a LUT for a separation detected to be entirely blank:
    /// every sample maps to zero (`spec.md` §4.6 "regenerate a LUT when a
    /// blank separation has been detected").
    pub fn blank(expibpp: u32, output_bytes: usize) -> Self {
        let n = 1usize << expibpp;
        Lut::Table {
            entries: vec![0u8; n * output_bytes],
            output_bytes,
        }
    }

    /// The fixed 4-bit-input, 32-bit-output LUT used for mask images
    /// (`spec.md` §4.6): four 1-bit mask pixels packed into one nibble,
    /// each expanded to a full byte (`0x00`/`0xFF`), high-bit-first.
    pub fn mask_4_to_32() -> Self {
        let mut entries = Vec::with_capacity(16 * 4);
        for idx in 0u32..16 {
            for bit in (0..4).rev() {
                let set = (idx >> bit) & 1 != 0;
                entries.push(if set { 0xFF } else { 0x00 });
            }
        }
        Lut::Table {
            entries,
            output_bytes: 4,
        }
    }

    /// Scans the first and last entries for the `0x00`/`0xFF` pattern that
    /// indicates a reversible PCL mask idiom (`spec.md` §4.6 "mask-polarity
    /// probe"). Returns `Some(true)` if polarity is inverted (sample `0`
    /// maps to all-ones), `Some(false)` if normal, `None` if neither
    /// entry is a pure `0x00`/`0xFF` run.
    pub fn probe_mask_polarity(&self) -> Option<bool> {
        let Lut::Table { entries, output_bytes } = self else {
            return None;
        };
        if *output_bytes == 0 || entries.len() < output_bytes * 2 {
            return None;
        }
        let first = &entries[..*output_bytes];
        let last = &entries[entries.len() - output_bytes..];
        let is_zero = |s: &[u8]| s.iter().all(|&b| b == 0);
        let is_ones = |s: &[u8]| s.iter().all(|&b| b == 0xFF);

        if is_zero(first) && is_ones(last) {
            Some(false)
        } else if is_ones(first) && is_zero(last) {
            Some(true)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_1_to_8_matches_scenario_4() {
        // spec.md scenario 4: byte 0b10110010 through LUT {0x00, 0xFF}.
        let lut = Lut::Table {
            entries: vec![0x00, 0xFF],
            output_bytes: 1,
        };
        let widened = lut.widen(1, 8).unwrap();
        let byte = 0b1011_0010u32;
        let out = widened.lookup(byte).unwrap();
        assert_eq!(out, &[0xFF, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn widen_2_to_16x2_matches_scenario_5() {
        // spec.md scenario 5: identity pair-LUT, byte 0b11000110 -> samples {3,0,1,2}.
        let lut = Lut::Table {
            entries: vec![0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03],
            output_bytes: 2,
        };
        let widened = lut.widen(2, 2).unwrap();
        let byte = 0b1100_0110u32;
        let out = widened.lookup(byte).unwrap();
        // samples decode high-to-low: 3, 0, 1, 2 -> identity 16-bit values.
        assert_eq!(out, &[0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn widen_rejects_when_combinatorially_too_large() {
        let lut = Lut::Table {
            entries: vec![0u8; 256],
            output_bytes: 1,
        };
        assert!(lut.widen(8, 2).is_none());
    }

    #[test]
    fn widen_rejects_identity() {
        assert!(Lut::Identity.widen(1, 4).is_none());
    }

    #[test]
    fn overflow_detection_flags_wide_inputs() {
        assert!(!would_overflow(8, 1));
        assert!(would_overflow(8, 4));
        assert!(would_overflow(32, 1));
    }

    #[test]
    fn mask_lut_probe_detects_normal_polarity() {
        let lut = Lut::mask_4_to_32();
        // entry 0 -> all zero, entry 15 -> all ones.
        assert_eq!(lut.probe_mask_polarity(), Some(false));
    }

    #[test]
    fn mask_lut_probe_detects_inverted_polarity() {
        let lut = Lut::Table {
            entries: vec![0xFF, 0xFF, 0x00, 0x00],
            output_bytes: 2,
        };
        assert_eq!(lut.probe_mask_polarity(), Some(true));
    }

    #[test]
    fn blank_lut_is_all_zero() {
        let lut = Lut::blank(2, 1);
        for i in 0..4u32 {
            assert_eq!(lut.lookup(i).unwrap(), &[0u8]);
        }
    }
}
