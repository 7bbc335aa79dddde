//! The blit-color pipeline: packed-pixel bit helpers and the four-view
//! (unpacked/quantised/packed/expanded) color representation that every
//! rendered object carries through the render core.

mod channel;
mod color;
mod colormap;
mod error;
mod pack;

pub use channel::{Channel, ChannelId, ChannelProperties, ColorantId};
pub use color::{BlitColor, ChannelState, PackedBuffer, QuantiseState};
pub use colormap::{BlitColorMap, ExpandMapping, PackVariant};
pub use error::{Error, Result};
pub use pack::{write_field_u8, write_field_u16};
pub use rip_bitset::ChannelBits;
