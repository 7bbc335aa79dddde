#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A channel count mismatch between the three corner colors passed to a
    /// fill.
    ChannelCountMismatch { expected: usize, found: usize },
    /// The render was asked to stop mid-fill (cooperative interrupt poll).
    Interrupted,
    /// Bisection recursed past the packed flag bitstream's declared depth.
    BisectionDepthExceeded { depth: u32 },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;

        match self {
            ChannelCountMismatch { expected, found } => write!(
                f,
                "gouraud fill corner colors disagree on channel count: expected {expected}, found {found}"
            ),
            Interrupted => write!(f, "gouraud fill interrupted"),
            BisectionDepthExceeded { depth } => write!(f, "bisection recursed past depth {depth}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
