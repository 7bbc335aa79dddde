#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    TooManyChannels(usize),
    UnknownChannel(usize),
    BitSizeOverflow { bit_offset: u32, bit_size: u32 },
    NoColormap,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;

        match self {
            TooManyChannels(n) => write!(f, "colormap requests {n} channels, more than the 256 channel limit"),
            UnknownChannel(idx) => write!(f, "channel index {idx} is out of range for this colormap"),
            BitSizeOverflow { bit_offset, bit_size } => write!(
                f,
                "channel at bit offset {bit_offset} with size {bit_size} overflows the packed word"
            ),
            NoColormap => write!(f, "blit color is not bound to a colormap"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
