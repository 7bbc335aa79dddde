//! [`BandTable`]: per-colorant band buffer assignment and reserved-mask
//! scratch memory, plus the data types exchanged with the page buffer
//! device during the `raster_requirements` handshake.

use std::collections::HashMap;

use rip_bitset::ChannelBits;

use crate::layout::{BandLayout, RasterStyle};

/// Page dimensions in device pixels, passed to the page buffer device
/// alongside the raster style at `raster_requirements` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
}

/// The scratch buffer handed back by the page buffer device for use across
/// subsequent bands (`spec.md` §6 "Outputs").
#[derive(Debug, Clone, Default)]
pub struct ScratchBuffer {
    pub bytes: Vec<u8>,
}

impl ScratchBuffer {
    pub fn with_capacity(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }
}

/// Bit positions within a [`BandTable`]'s reserved-bands bitmap, mirroring
/// `DL_STATE::reserved_bands`'s flag set. Kept small and closed since the
/// kinds of reserved band are a fixed, known set.
pub mod reserved {
    pub const OUTPUT: usize = 0;
    pub const CLIP: usize = 1;
    pub const PATTERN_SHAPE: usize = 2;
    pub const MODULAR_HALFTONE_MASK: usize = 3;
    pub const TONE: usize = 4;
}

/// One assigned band buffer for a single colorant (or, for an interleaved
/// raster style, the single shared buffer for the whole band).
#[derive(Debug)]
pub struct BandSlot {
    pub colorant: usize,
    pub band_index: u32,
    pub bytes: Vec<u8>,
}

/// Assigns band buffers per colorant and tracks which reserved-mask bands
/// (output, clip, pattern shape, modular halftone mask, tone) this page
/// needs, per `bandtable.h`'s `fix_reserved_band_resources`.
#[derive(Debug)]
pub struct BandTable {
    style: RasterStyle,
    layout: BandLayout,
    reserved_bands: ChannelBits,
    slots: HashMap<(usize, u32), Vec<u8>>,
}

impl BandTable {
    pub fn new(style: RasterStyle, layout: BandLayout) -> Self {
        Self {
            style,
            layout,
            reserved_bands: ChannelBits::new(),
            slots: HashMap::new(),
        }
    }

    pub fn style(&self) -> &RasterStyle {
        &self.style
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Marks a reserved-band kind (see [`reserved`]) as needed by this
    /// page. Exposed to callers building the DL so later calls to
    /// [`Self::reserved_bands`] reflect what mask_bands_from_basemap-style
    /// helpers must provision.
    pub fn mark_reserved(&mut self, kind: usize) {
        self.reserved_bands.set(kind);
    }

    /// The reserved-bands bitmap exposed to the render loop, per
    /// `spec.md` §6 "a band-table manager that ... exposes a
    /// reserved-bands bitmap".
    pub fn reserved_bands(&self) -> &ChannelBits {
        &self.reserved_bands
    }

    /// Returns the buffer backing `(colorant, band_index)`, allocating a
    /// fresh zeroed band-sized buffer the first time it's requested. For an
    /// interleaved raster style, `colorant` is conventionally `0` since all
    /// colorants share one buffer per band.
    pub fn assign_band(&mut self, colorant: usize, band_index: u32) -> &mut [u8] {
        self.slots
            .entry((colorant, band_index))
            .or_insert_with(|| vec![0u8; self.layout.bytes_per_band])
    }

    /// Releases a previously assigned band buffer (e.g. once the page
    /// buffer device has drained it), freeing its memory immediately
    /// rather than waiting for page teardown.
    pub fn release_band(&mut self, colorant: usize, band_index: u32) {
        self.slots.remove(&(colorant, band_index));
    }

    /// Number of currently live band buffers, used by tests and by the
    /// render loop's bookkeeping of per-band scratch memory (`spec.md`
    /// §5 "Memory": the page/temp pool is released eagerly per band).
    pub fn live_band_count(&self) -> usize {
        self.slots.len()
    }
}
