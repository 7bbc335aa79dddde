//! `RenderConfig`: the render core's configuration surface, equivalent to
//! the teacher's `DecoderOptions`-shaped config (`spec.md` §7.4 per
//! `SPEC_FULL.md`).

use crate::error::{Error, Result};

/// Band height hint, resampling factor, noise settings, and worker count
/// for one page render. Built with a sensible [`Default`] and validated at
/// construction rather than panicking on a bad value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub band_height_hint: u32,
    pub resampling_factor: u32,
    pub noise_enabled: bool,
    pub noise_shift: u32,
    pub min_gouraud_bands: u32,
    pub worker_threads: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            band_height_hint: 32,
            resampling_factor: 1,
            noise_enabled: false,
            noise_shift: 4,
            min_gouraud_bands: 1,
            worker_threads: 0,
        }
    }
}

impl RenderConfig {
    /// Builds a config, range-checking every field (`Error::InvalidConfig`,
    /// never a panic).
    pub fn new(
        band_height_hint: u32,
        resampling_factor: u32,
        noise_enabled: bool,
        noise_shift: u32,
        min_gouraud_bands: u32,
        worker_threads: u32,
    ) -> Result<Self> {
        if band_height_hint == 0 {
            return Err(Error::InvalidConfig("band_height_hint must be nonzero"));
        }
        if resampling_factor == 0 {
            return Err(Error::InvalidConfig("resampling_factor must be nonzero"));
        }
        if noise_shift > 16 {
            return Err(Error::InvalidConfig("noise_shift must be at most 16"));
        }
        if min_gouraud_bands == 0 {
            return Err(Error::InvalidConfig("min_gouraud_bands must be nonzero"));
        }
        Ok(Self {
            band_height_hint,
            resampling_factor,
            noise_enabled,
            noise_shift,
            min_gouraud_bands,
            worker_threads,
        })
    }
}
