#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// `2^(input_bits * components)` would exceed the safe LUT budget;
    /// the caller should pre-convert samples instead of building a table
    /// (`spec.md` §7 "LUT-size overflow").
    LutTooLarge { input_bits: u32, components: u32 },
    /// The expansion buffer is too small to add an alpha channel or
    /// recombine planes, and could not be grown (`spec.md` §7).
    BufferTooSmall { needed: usize, have: usize },
    /// The image store failed to hand back a tile.
    StoreFailed { x: u32, y: u32, plane: usize },
    /// Cooperative interrupt, checked per scanline via the "do often" hook.
    Interrupted,
    MemoryExhausted(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            LutTooLarge { input_bits, components } => write!(
                f,
                "LUT of 2^({input_bits}*{components}) entries exceeds the safe budget"
            ),
            BufferTooSmall { needed, have } => {
                write!(f, "expansion buffer needs {needed} bytes, has {have}")
            }
            StoreFailed { x, y, plane } => {
                write!(f, "image store fetch failed at ({x},{y}) plane {plane}")
            }
            Interrupted => write!(f, "image expansion interrupted"),
            MemoryExhausted(bytes) => write!(f, "failed to allocate {bytes} byte(s)"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
