//! [`BlitColor`]: the mutable four-view render-time color value.

use std::sync::Arc;

use rip_bitset::ChannelBits;

use crate::channel::ColorantId;
use crate::colormap::{BlitColorMap, PackVariant};
use crate::error::{Error, Result};
use crate::pack;

/// Per-channel state bitset, matching `blit_channel_state_t` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState(u8);

impl ChannelState {
    pub const NONE: Self = Self(0);
    pub const PRESENT: Self = Self(1);
    pub const OVERRIDE: Self = Self(2);
    pub const KNOCKOUT: Self = Self(4);
    pub const MAXBLIT: Self = Self(8);

    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub const fn intersects(self, mask: Self) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }
}

impl std::ops::BitOr for ChannelState {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for ChannelState {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Summary of where a channel's quantised value lies relative to its
/// `htmax`, matching `blit_quantise_state_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantiseState {
    Min,
    Mid,
    Max,
}

/// The packed representation, whose storage unit depends on the colormap's
/// [`PackVariant`].
#[derive(Debug, Clone)]
pub enum PackedBuffer {
    Bytes(Vec<u8>),
    Shorts(Vec<u16>),
}

impl PackedBuffer {
    fn zeroed(variant: PackVariant, packed_bits: u32) -> Self {
        match variant {
            PackVariant::Generic16 => {
                let len = packed_bits.div_ceil(16) as usize;
                PackedBuffer::Shorts(vec![0u16; len.max(1)])
            }
            PackVariant::Generic8 | PackVariant::Mask => {
                let len = packed_bits.div_ceil(8) as usize;
                PackedBuffer::Bytes(vec![0u8; len.max(1)])
            }
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            PackedBuffer::Bytes(b) => b.clone(),
            PackedBuffer::Shorts(s) => s.iter().flat_map(|v| v.to_be_bytes()).collect(),
        }
    }
}

#[cfg(debug_assertions)]
mod validity {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ValidityBits(u8);

    impl ValidityBits {
        pub const UNPACKED: Self = Self(1);
        pub const QUANTISED: Self = Self(2);
        pub const PACKED: Self = Self(4);
        pub const EXPANDED: Self = Self(8);

        pub fn contains(self, flag: Self) -> bool {
            self.0 & flag.0 == flag.0
        }

        pub fn insert(&mut self, flag: Self) {
            self.0 |= flag.0;
        }

        /// Invalidate every view derived from (but not including) `from`:
        /// setting `unpacked` invalidates quantised/packed/expanded;
        /// setting `quantised` invalidates packed/expanded.
        pub fn invalidate_downstream_of(&mut self, from: Self) {
            if from == Self::UNPACKED {
                self.0 &= !(Self::QUANTISED.0 | Self::PACKED.0 | Self::EXPANDED.0);
            } else if from == Self::QUANTISED {
                self.0 &= !(Self::PACKED.0 | Self::EXPANDED.0);
            } else if from == Self::PACKED {
                self.0 &= !Self::EXPANDED.0;
            }
        }
    }
}
#[cfg(debug_assertions)]
use validity::ValidityBits;

/// The mutable four-view render-time color value: unpacked, quantised,
/// packed, expanded, plus per-channel state and scalar summaries.
#[derive(Debug, Clone)]
pub struct BlitColor {
    map: Arc<BlitColorMap>,
    unpacked: Vec<u16>,
    quantised: Vec<u16>,
    quantise_spot: Option<u32>,
    quantise_type: Option<u16>,
    htmax: Vec<u16>,
    packed: PackedBuffer,
    expanded: Vec<u8>,
    state: Vec<ChannelState>,
    ncolors: u32,
    nmaxblits: u32,
    noverrides: u32,
    nchannels: u32,
    alpha: u16,
    object_type: u8,
    rendering_intent: u8,
    #[cfg(debug_assertions)]
    valid: ValidityBits,
}

impl BlitColor {
    /// Binds a fresh color to a colormap. Validity is invalid, the
    /// quantisation spot is invalid, and the packed buffer is zeroed to its
    /// padding length, per `spec.md` §4.1 `init`.
    pub fn init(map: Arc<BlitColorMap>) -> Self {
        let n = map.nchannels();
        let packed = PackedBuffer::zeroed(map.variant(), map.packed_bits());
        Self {
            unpacked: vec![0; n],
            quantised: vec![0; n],
            quantise_spot: None,
            quantise_type: None,
            htmax: vec![0; n],
            packed,
            expanded: vec![0; map.expanded_bytes() as usize],
            state: vec![ChannelState::NONE; n],
            ncolors: 0,
            nmaxblits: 0,
            noverrides: 0,
            nchannels: 0,
            alpha: 0,
            object_type: 0,
            rendering_intent: 0,
            #[cfg(debug_assertions)]
            valid: ValidityBits::default(),
            map,
        }
    }

    pub fn map(&self) -> &Arc<BlitColorMap> {
        &self.map
    }

    pub fn state(&self, index: usize) -> ChannelState {
        self.state[index]
    }

    pub fn unpacked(&self, index: usize) -> u16 {
        self.unpacked[index]
    }

    pub fn quantised(&self, index: usize) -> u16 {
        self.quantised[index]
    }

    pub fn htmax(&self, index: usize) -> u16 {
        self.htmax[index]
    }

    pub fn packed(&self) -> &PackedBuffer {
        &self.packed
    }

    pub fn expanded(&self) -> &[u8] {
        &self.expanded
    }

    pub fn ncolors(&self) -> u32 {
        self.ncolors
    }

    pub fn nchannels(&self) -> u32 {
        self.nchannels
    }

    pub fn nmaxblits(&self) -> u32 {
        self.nmaxblits
    }

    pub fn noverrides(&self) -> u32 {
        self.noverrides
    }

    pub fn alpha(&self) -> u16 {
        self.alpha
    }

    pub fn object_type(&self) -> u8 {
        self.object_type
    }

    /// Unpacks a display-list color: `spec.md` §4.1 `unpack`.
    ///
    /// `dl_color[ch]` supplies the 16-bit intensity for every channel set
    /// in `present`; channels outside `present` are left transparent and
    /// not marked present. `is_erase`/`is_knockout` are returned so the
    /// caller can latch this color onto the colormap being built (the
    /// colormap itself stays immutable once rendering begins, so the C
    /// side effect of writing `map->erase_color` becomes a builder step
    /// here rather than a mutation through `&self`).
    pub fn unpack(
        &mut self,
        dl_color: &[u16],
        object_type: u8,
        present: &ChannelBits,
        is_erase: bool,
        is_knockout: bool,
    ) -> Result<(bool, bool)> {
        let n = self.map.nchannels();
        if dl_color.len() < n {
            return Err(Error::UnknownChannel(dl_color.len()));
        }

        let mut ncolors = 0;
        let mut nchannels = 0;
        for ch in 0..n {
            if present.get(ch) {
                self.unpacked[ch] = dl_color[ch];
                self.state[ch].insert(ChannelState::PRESENT);
                nchannels += 1;
                if !matches!(self.map.channel(ch).unwrap().colorant, ColorantId::Alpha) {
                    ncolors += 1;
                }
            } else {
                self.unpacked[ch] = 0;
                self.state[ch].remove(ChannelState::PRESENT);
            }
        }

        self.ncolors = ncolors;
        self.nchannels = nchannels;
        self.object_type = object_type;
        if let Some(alpha_index) = self.map.alpha_index() {
            self.alpha = self.unpacked[alpha_index];
        }
        if is_knockout {
            for ch in 0..n {
                if present.get(ch) {
                    self.state[ch].insert(ChannelState::KNOCKOUT | ChannelState::OVERRIDE);
                }
            }
        }

        #[cfg(debug_assertions)]
        {
            self.valid.insert(ValidityBits::UNPACKED);
            self.valid
                .invalidate_downstream_of(ValidityBits::UNPACKED);
        }

        Ok((is_erase, is_knockout))
    }

    /// Loads per-channel `htmax` from the halftone engine for `(spotno,
    /// httype)`. A no-op (downstream views untouched) if the screen hasn't
    /// actually changed, per `spec.md` §8 "quantise_set_screen called
    /// twice... does not invalidate downstream views".
    pub fn quantise_set_screen(&mut self, spotno: u32, httype: u16, htmax_of: impl Fn(usize) -> u16) {
        if self.quantise_spot == Some(spotno) && self.quantise_type == Some(httype) {
            return;
        }
        self.quantise_spot = Some(spotno);
        self.quantise_type = Some(httype);
        for ch in 0..self.map.nchannels() {
            self.htmax[ch] = htmax_of(ch).max(1);
        }
    }

    /// Quantises the unpacked color into halftone codes, computing the
    /// min/mid/max summary per channel implicitly via `htmax`.
    pub fn quantise(&mut self) -> Result<()> {
        if self.quantise_spot.is_none() {
            return Err(Error::NoColormap);
        }
        for ch in 0..self.map.nchannels() {
            if !self.state[ch].intersects(ChannelState::PRESENT) {
                continue;
            }
            let htmax = self.htmax[ch].max(1) as u32;
            let v = self.unpacked[ch] as u32;
            // COLORVALUE_MULTIPLY: round(v * htmax / COLORVALUE_MAX).
            let scaled = (v * htmax + (u16::MAX as u32) / 2) / u16::MAX as u32;
            self.quantised[ch] = scaled.min(htmax) as u16;
        }
        #[cfg(debug_assertions)]
        {
            self.valid.insert(ValidityBits::QUANTISED);
            self.valid
                .invalidate_downstream_of(ValidityBits::QUANTISED);
        }
        Ok(())
    }

    /// Returns the quantise-state summary (min/mid/max) for channel `ch`.
    pub fn quantise_state(&self, ch: usize) -> QuantiseState {
        let htmax = self.htmax[ch].max(1);
        let q = self.quantised[ch];
        if q == 0 {
            QuantiseState::Min
        } else if q >= htmax {
            QuantiseState::Max
        } else {
            QuantiseState::Mid
        }
    }

    /// Reconstructs the unpacked view from quantised, up to the
    /// quantisation error bound `1/htmax` (`spec.md` §4.1 `dequantise`).
    pub fn dequantise(&mut self) {
        for ch in 0..self.map.nchannels() {
            if !self.state[ch].intersects(ChannelState::PRESENT) {
                continue;
            }
            let htmax = self.htmax[ch].max(1) as u32;
            let q = self.quantised[ch] as u32;
            self.unpacked[ch] = ((q * u16::MAX as u32) / htmax).min(u16::MAX as u32) as u16;
        }
        #[cfg(debug_assertions)]
        self.valid.insert(ValidityBits::UNPACKED);
    }

    /// Packs the quantised view, dispatching on the colormap's variant.
    pub fn pack(&mut self) -> Result<()> {
        match self.map.variant() {
            PackVariant::Generic8 => self.pack_generic8(),
            PackVariant::Generic16 => self.pack_generic16(),
            PackVariant::Mask => self.pack_mask(),
        }
        #[cfg(debug_assertions)]
        self.valid.insert(ValidityBits::PACKED);
        Ok(())
    }

    fn pack_generic8(&mut self) {
        let PackedBuffer::Bytes(bytes) = &mut self.packed else {
            unreachable!("Generic8 colormap must use a byte-packed buffer")
        };
        for (ch, channel) in self.map.channels().iter().enumerate() {
            if self.state[ch].intersects(ChannelState::PRESENT) {
                pack::pack_generic8(bytes, channel, self.quantised[ch]);
            }
        }
    }

    fn pack_generic16(&mut self) {
        let PackedBuffer::Shorts(shorts) = &mut self.packed else {
            unreachable!("Generic16 colormap must use a short-packed buffer")
        };
        for (ch, channel) in self.map.channels().iter().enumerate() {
            if self.state[ch].intersects(ChannelState::PRESENT) {
                pack::pack_generic16(shorts, channel, self.quantised[ch]);
            }
        }
        // Short packs below one word need an immediate expansion to have
        // enough data for a blit, matching `blit_color_pack_generic16`.
        if self.map.packed_bits() < 16 {
            self.expand_internal();
        }
    }

    fn pack_mask(&mut self) {
        let PackedBuffer::Bytes(bytes) = &mut self.packed else {
            unreachable!("Mask colormap must use a byte-packed buffer")
        };
        let channel = &self.map.channels()[0];
        let set = self.quantised[0] >= self.htmax[0].max(1);
        bytes[0] = if set { 0xFF } else { 0x00 } & ((1u32 << channel.bit_size) - 1) as u8;
    }

    /// Expands the packed representation to fill a whole blit word
    /// (`spec.md` §4.1 `expand`). Idempotent on an already-expanded color.
    pub fn expand(&mut self) {
        self.expand_internal();
        #[cfg(debug_assertions)]
        self.valid.insert(ValidityBits::EXPANDED);
    }

    fn expand_internal(&mut self) {
        if matches!(self.map.variant(), PackVariant::Mask) {
            // 1 bit already fills the word: no-op expander.
            let PackedBuffer::Bytes(bytes) = &self.packed else {
                unreachable!()
            };
            self.expanded = bytes.clone();
            return;
        }

        match &mut self.packed {
            PackedBuffer::Bytes(bytes) => {
                pack::expand_bytes(bytes, self.map.packed_bits(), self.map.expanded_bytes());
                self.expanded = bytes.clone();
            }
            PackedBuffer::Shorts(shorts) => {
                let expanded_shorts = self.map.expanded_bytes().div_ceil(2);
                pack::expand_shorts(shorts, self.map.packed_bits(), expanded_shorts);
                self.expanded = shorts.iter().flat_map(|v| v.to_be_bytes()).collect();
            }
        }
    }

    /// Removes a channel from the color. The `override`/`maxblit` bits are
    /// retained so the channel can be cleanly reinstated by
    /// [`Self::mark_present`] (`spec.md` §3, §9 Open Question #1 — this
    /// dormant-bit retention must be preserved exactly).
    pub fn mark_absent(&mut self, index: usize) {
        if self.state[index].intersects(ChannelState::PRESENT) {
            self.nchannels -= 1;
            if !matches!(self.map.channel(index).unwrap().colorant, ColorantId::Alpha) {
                self.ncolors -= 1;
            }
        }
        self.state[index].remove(ChannelState::PRESENT);
        #[cfg(debug_assertions)]
        self.valid
            .invalidate_downstream_of(ValidityBits::QUANTISED);
    }

    /// Reinstates a previously-absent channel. Any `override`/`maxblit`
    /// bits left set by a prior `mark_absent` remain in effect.
    pub fn mark_present(&mut self, index: usize) {
        if !self.state[index].intersects(ChannelState::PRESENT) {
            self.nchannels += 1;
            if !matches!(self.map.channel(index).unwrap().colorant, ColorantId::Alpha) {
                self.ncolors += 1;
            }
        }
        self.state[index].insert(ChannelState::PRESENT);
        #[cfg(debug_assertions)]
        self.valid
            .invalidate_downstream_of(ValidityBits::QUANTISED);
    }

    /// Forces channels to mask-white/black, knocks them out from the erase
    /// color, or overprints them, per the object/channel-type render
    /// property rules in `spec.md` §4.1 `apply_render_properties`.
    pub fn apply_render_properties(&mut self, selected: &ChannelBits, erase: Option<&BlitColor>) {
        for (ch, channel) in self.map.channels().iter().enumerate() {
            use crate::channel::ChannelProperties as P;
            if channel.properties.contains(P::IGNORE) {
                continue;
            }
            if channel.properties.contains(P::MASK_ALL) && selected.get(ch) {
                self.quantised[ch] = self.htmax[ch];
                self.state[ch].insert(ChannelState::PRESENT | ChannelState::OVERRIDE);
            }
            if channel.properties.contains(P::KNOCKOUT_ALL) && selected.get(ch) {
                if let Some(erase) = erase {
                    self.quantised[ch] = erase.quantised[ch];
                }
                self.state[ch]
                    .insert(ChannelState::PRESENT | ChannelState::OVERRIDE | ChannelState::KNOCKOUT);
            }
            if channel.properties.contains(P::RENDER_ALL) && selected.get(ch) {
                self.state[ch].insert(ChannelState::PRESENT | ChannelState::MAXBLIT);
            }
        }
        self.noverrides = (0..self.map.nchannels())
            .filter(|&ch| self.state[ch].intersects(ChannelState::OVERRIDE))
            .count() as u32;
        self.nmaxblits = (0..self.map.nchannels())
            .filter(|&ch| self.state[ch].intersects(ChannelState::MAXBLIT))
            .count() as u32;
        #[cfg(debug_assertions)]
        self.valid
            .invalidate_downstream_of(ValidityBits::QUANTISED);
    }

    /// Builds an overprint mask in the packed layout: bits of channels
    /// whose `state & mask == state_match` are set to all-ones, others to
    /// all-zeros (`spec.md` §4.1 `overprint_mask`).
    pub fn overprint_mask(&self, mask: ChannelState, state_match: ChannelState) -> PackedBuffer {
        let mut out = PackedBuffer::zeroed(self.map.variant(), self.map.packed_bits());
        for (ch, channel) in self.map.channels().iter().enumerate() {
            let set = self.state[ch] & mask == state_match;
            match &mut out {
                PackedBuffer::Bytes(bytes) => pack::overprint_mask_generic8(bytes, channel, set),
                PackedBuffer::Shorts(shorts) => {
                    pack::overprint_mask_generic16(shorts, channel, set)
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ColorantId};

    fn mono_map() -> Arc<BlitColorMap> {
        Arc::new(BlitColorMap::mask())
    }

    fn cmyk_map() -> Arc<BlitColorMap> {
        let channels = (0..4u16)
            .map(|i| Channel::new(ColorantId::Real(i), i as u32 * 8, 8))
            .collect();
        Arc::new(BlitColorMap::new(channels, PackVariant::Generic8, 32).unwrap())
    }

    #[test]
    fn scenario_monochrome_span() {
        let map = mono_map();
        let mut color = BlitColor::init(map.clone());
        let mut present = ChannelBits::new();
        present.set(0);

        color.unpack(&[0], 0, &present, false, false).unwrap();
        color.quantise_set_screen(1, 0, |_| 1);
        color.quantise().unwrap();
        color.pack().unwrap();
        let PackedBuffer::Bytes(bytes) = color.packed() else {
            panic!()
        };
        assert_eq!(bytes[0] & 1, 0);

        color.unpack(&[u16::MAX], 0, &present, false, false).unwrap();
        color.quantise().unwrap();
        color.pack().unwrap();
        let PackedBuffer::Bytes(bytes) = color.packed() else {
            panic!()
        };
        assert_eq!(bytes[0] & 1, 1);

        let overprint =
            color.overprint_mask(ChannelState::PRESENT, ChannelState::PRESENT);
        let PackedBuffer::Bytes(bytes) = overprint else {
            panic!()
        };
        assert_eq!(bytes[0] & 1, 1);
    }

    #[test]
    fn scenario_cmyk_pack() {
        let map = cmyk_map();
        let mut color = BlitColor::init(map);
        let mut present = ChannelBits::new();
        for i in 0..4 {
            present.set(i);
        }
        let dl = [
            (0.25 * u16::MAX as f32) as u16,
            (0.5 * u16::MAX as f32) as u16,
            (0.75 * u16::MAX as f32) as u16,
            u16::MAX,
        ];
        color.unpack(&dl, 0, &present, false, false).unwrap();
        color.quantise_set_screen(1, 0, |_| 255);
        color.quantise().unwrap();
        color.pack().unwrap();

        let PackedBuffer::Bytes(bytes) = color.packed() else {
            panic!()
        };
        // Allow +/-1 rounding slack versus the nominal (64,128,191,255).
        let expected = [64i32, 128, 191, 255];
        for (b, e) in bytes.iter().zip(expected) {
            assert!((*b as i32 - e).abs() <= 1, "byte {b} vs expected {e}");
        }
    }

    #[test]
    fn mark_absent_then_present_keeps_override_bit() {
        let map = cmyk_map();
        let mut color = BlitColor::init(map);
        let mut present = ChannelBits::new();
        present.set(0);
        color.unpack(&[1000], 0, &present, false, false).unwrap();
        color.state[0].insert(ChannelState::OVERRIDE);

        color.mark_absent(0);
        assert!(!color.state(0).intersects(ChannelState::PRESENT));
        assert!(color.state(0).intersects(ChannelState::OVERRIDE));

        color.mark_present(0);
        assert!(color.state(0).intersects(ChannelState::PRESENT));
        assert!(color.state(0).intersects(ChannelState::OVERRIDE));
    }

    #[test]
    fn expand_is_idempotent() {
        let map = cmyk_map();
        let mut color = BlitColor::init(map);
        let mut present = ChannelBits::new();
        for i in 0..4 {
            present.set(i);
        }
        color.unpack(&[100, 200, 300, 400], 0, &present, false, false).unwrap();
        color.quantise_set_screen(1, 0, |_| 255);
        color.quantise().unwrap();
        color.pack().unwrap();
        color.expand();
        let first = color.expanded().to_vec();
        color.expand();
        assert_eq!(first, color.expanded());
    }
}
