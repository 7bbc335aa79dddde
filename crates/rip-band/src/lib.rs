//! Band-table manager: decides how many scanlines make up one render band,
//! assigns per-colorant band buffers and reserved-mask scratch memory, and
//! drives the two-call `raster_requirements` handshake with the page buffer
//! device.
//!
//! Grounded on `bandtable.h`'s `determine_band_size`/`max_basemap_band_height`/
//! `fix_reserved_band_resources`/`call_pagebuffer_raster_requirements`. The
//! band/line resource-pool machinery (`band_resource_pools`,
//! `mht_band_resources`) and RLE extension-buffer bookkeeping
//! (`alloc_band_extension`) are summarised at the interface level: this
//! crate hands out plain byte buffers rather than reproducing the pool
//! allocator, since pool policy is an orchestration concern that belongs to
//! `rip-core`'s caller, not the band-size/assignment logic itself.

mod error;
mod layout;
mod table;

pub use error::{Error, Result};
pub use layout::{determine_band_size, max_basemap_band_height, BandLayout, RasterStyle};
pub use table::{BandSlot, BandTable, PageGeometry, ScratchBuffer};

/// Calls the page buffer device's raster-requirements exchange, per
/// `spec.md` §6 "Outputs": the host calls this twice — once when the page
/// layout is fixed (`starting = false`) and once when rendering actually
/// starts (`starting = true`) — and the device hands back the scratch
/// buffer to use for subsequent bands.
///
/// Modeled as a closure rather than a trait object so `rip-band` doesn't
/// need to depend on `rip-core`'s fuller `PageBufferDevice` trait (which
/// also carries `deliver_band`/`page_done`); `rip-core` adapts its trait to
/// this signature at the one call site that needs it.
pub fn call_pagebuffer_raster_requirements(
    mut raster_requirements: impl FnMut(bool, PageGeometry, &RasterStyle, u32, usize, &[u8]) -> ScratchBuffer,
    starting: bool,
    geometry: PageGeometry,
    style: &RasterStyle,
    minimum_bands: u32,
    scratch_size: usize,
    scratch_band: &[u8],
) -> ScratchBuffer {
    raster_requirements(starting, geometry, style, minimum_bands, scratch_size, scratch_band)
}
