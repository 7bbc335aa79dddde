//! The image expander: LUT-driven per-scanline sample decoding over a
//! tiled image store, with a shared expansion-buffer cache and low-memory
//! release protocol.

mod buffer;
mod cache;
mod convert;
mod decode;
mod error;
mod expander;
mod lut;

pub use buffer::{ExpansionBuffer, LowMemoryHandler, ScanlineKey};
pub use cache::{LutCache, LutKey};
pub use convert::{convert_scanline_in_place, OnTheFlyConverter, CONVERT_BATCH_PIXELS};
pub use decode::{decode_scanline, read_bits_msb};
pub use error::{Error, Result};
pub use expander::{ChannelMapping, ExpandedScanline, ImageExpander, ImageStore, ObitsPerChannel};
pub use lut::{would_overflow, Lut};
