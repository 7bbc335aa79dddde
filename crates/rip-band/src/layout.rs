//! Band-size computation: `determine_band_size`/`max_basemap_band_height`
//! from `bandtable.h`, adapted to operate on an explicit [`RasterStyle`]
//! instead of a `GUCR_RASTERSTYLE` handle.

use crate::error::{Error, Result};

/// The output-device layout: colorant count, bit depth, and whether
/// colorants are interleaved within one row or kept in separate planes
/// (`spec.md` GLOSSARY "Raster style").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterStyle {
    pub colorants: u32,
    pub bits_per_pixel: u32,
    pub interleaved: bool,
}

impl RasterStyle {
    pub fn new(colorants: u32, bits_per_pixel: u32, interleaved: bool) -> Self {
        Self {
            colorants,
            bits_per_pixel,
            interleaved,
        }
    }

    /// Bytes needed for one scanline: all colorants packed into one row if
    /// interleaved, otherwise the width of a single colorant's plane (the
    /// caller allocates one such row per colorant per band).
    pub fn bytes_per_row(&self, width: u32) -> usize {
        let total_bits = if self.interleaved {
            width as u64 * self.colorants.max(1) as u64 * self.bits_per_pixel as u64
        } else {
            width as u64 * self.bits_per_pixel as u64
        };
        total_bits.div_ceil(8).max(1) as usize
    }
}

/// The result of [`determine_band_size`]: how many scanlines make up one
/// band, how many bands the page needs, and the byte size of one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandLayout {
    pub band_height: u32,
    pub band_count: u32,
    pub bytes_per_band: usize,
}

/// Target band memory footprint used to pick a default band height when the
/// caller doesn't supply a `BandHeight` page device parameter. Not part of
/// the wire contract; purely a sizing heuristic, as in the original (which
/// derives a similar budget from available memory at determine-band-size
/// time).
const DEFAULT_BAND_BUDGET_BYTES: usize = 256 * 1024;

fn round_up_to_multiple(v: u32, m: u32) -> u32 {
    if m <= 1 {
        v
    } else {
        v.div_ceil(m) * m
    }
}

/// Computes the band size from the raster style and page dimensions,
/// per `bandtable.h`'s `determine_band_size`.
///
/// `resampling_factor` (for anti-aliasing) forces the band height to a
/// multiple of itself, so that resampling never needs samples from two
/// different bands at once. `band_height_hint` is the `BandHeight` page
/// device parameter; `0` means "pick a sensible default".
pub fn determine_band_size(
    style: &RasterStyle,
    width: u32,
    height: u32,
    resampling_factor: u32,
    band_height_hint: u32,
) -> Result<BandLayout> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidGeometry { width, height });
    }
    let resampling_factor = resampling_factor.max(1);
    let bytes_per_row = style.bytes_per_row(width);

    let band_height = if band_height_hint > 0 {
        round_up_to_multiple(band_height_hint, resampling_factor).min(height)
    } else {
        let rows_in_budget = (DEFAULT_BAND_BUDGET_BYTES / bytes_per_row).max(1) as u32;
        round_up_to_multiple(rows_in_budget, resampling_factor).min(height)
    }
    .max(resampling_factor.min(height))
    .max(1);

    let band_count = height.div_ceil(band_height);
    let bytes_per_band = bytes_per_row * band_height as usize;

    Ok(BandLayout {
        band_height,
        band_count,
        bytes_per_band,
    })
}

/// Finds the largest band height the basemap (a 1-bit-per-pixel shape mask
/// plane) can be divided into within `basemap_budget_bytes`, per
/// `bandtable.h`'s `max_basemap_band_height`. Shape-mask rendering doesn't
/// include output, modular halftone mask, or tone bands in this
/// calculation — it sizes only the basemap itself.
pub fn max_basemap_band_height(width: u32, height: u32, basemap_budget_bytes: usize) -> Result<u32> {
    let bytes_per_row = (width as usize).div_ceil(8).max(1);
    if bytes_per_row > basemap_budget_bytes {
        return Err(Error::BasemapTooSmall {
            budget_bytes: basemap_budget_bytes,
            bytes_per_row,
        });
    }
    let rows = (basemap_budget_bytes / bytes_per_row).max(1) as u32;
    Ok(rows.min(height.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_band_height_is_rounded_to_resampling_factor() {
        let style = RasterStyle::new(4, 8, true);
        let layout = determine_band_size(&style, 1000, 5000, 4, 10).unwrap();
        assert_eq!(layout.band_height % 4, 0);
        assert!(layout.band_height >= 10);
    }

    #[test]
    fn default_band_height_fits_memory_budget() {
        let style = RasterStyle::new(4, 8, true);
        let layout = determine_band_size(&style, 10_000, 20_000, 1, 0).unwrap();
        assert!(layout.bytes_per_band <= DEFAULT_BAND_BUDGET_BYTES * 2);
        assert!(layout.band_count >= 1);
    }

    #[test]
    fn basemap_height_shrinks_for_wide_pages() {
        let narrow = max_basemap_band_height(100, 10_000, 64 * 1024).unwrap();
        let wide = max_basemap_band_height(100_000, 10_000, 64 * 1024).unwrap();
        assert!(wide < narrow);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let style = RasterStyle::new(1, 8, false);
        assert!(matches!(
            determine_band_size(&style, 0, 100, 1, 0),
            Err(Error::InvalidGeometry { .. })
        ));
    }
}
