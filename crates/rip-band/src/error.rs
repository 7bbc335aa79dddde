#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// `width`/`height`/`resampling_factor` would produce a band size of
    /// zero or one that overflows the addressable band byte count.
    InvalidGeometry { width: u32, height: u32 },
    /// The basemap budget is too small to hold even a single scanline.
    BasemapTooSmall { budget_bytes: usize, bytes_per_row: usize },
    MemoryExhausted(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            InvalidGeometry { width, height } => {
                write!(f, "invalid page geometry {width}x{height} for band sizing")
            }
            BasemapTooSmall { budget_bytes, bytes_per_row } => write!(
                f,
                "basemap budget {budget_bytes} bytes too small for one row of {bytes_per_row} bytes"
            ),
            MemoryExhausted(bytes) => write!(f, "failed to allocate {bytes} byte(s) for a band"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
