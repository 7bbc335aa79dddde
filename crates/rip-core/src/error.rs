//! `rip-core::Error`: a hand-rolled error enum wrapping each sub-crate's
//! error type, plus the thread-local error-kind register of `spec.md` §7.

use std::cell::Cell;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Color(rip_color::Error),
    Gouraud(rip_gouraud::Error),
    Image(rip_image::Error),
    Band(rip_band::Error),
    MemoryExhausted(usize),
    Interrupted,
    LutOverflow { input_bits: u32, components: u32 },
    BufferTooSmall { needed: usize, have: usize },
    InvalidConfig(&'static str),
}

impl From<rip_color::Error> for Error {
    fn from(err: rip_color::Error) -> Self {
        Self::Color(err)
    }
}

impl From<rip_gouraud::Error> for Error {
    fn from(err: rip_gouraud::Error) -> Self {
        Self::Gouraud(err)
    }
}

impl From<rip_image::Error> for Error {
    fn from(err: rip_image::Error) -> Self {
        Self::Image(err)
    }
}

impl From<rip_band::Error> for Error {
    fn from(err: rip_band::Error) -> Self {
        Self::Band(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            Color(err) => write!(f, "blit-color error: {err}"),
            Gouraud(err) => write!(f, "gouraud renderer error: {err}"),
            Image(err) => write!(f, "image expander error: {err}"),
            Band(err) => write!(f, "band-table error: {err}"),
            MemoryExhausted(bytes) => write!(f, "failed to allocate {bytes} byte(s)"),
            Interrupted => write!(f, "render interrupted"),
            LutOverflow { input_bits, components } => write!(
                f,
                "LUT of 2^({input_bits}*{components}) entries exceeds the safe budget"
            ),
            BufferTooSmall { needed, have } => write!(f, "buffer needs {needed} bytes, has {have}"),
            InvalidConfig(msg) => write!(f, "invalid render configuration: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use Error::*;
        match self {
            Color(err) => Some(err),
            Gouraud(err) => Some(err),
            Image(err) => Some(err),
            Band(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A coarse classification of the last fault a render worker thread hit,
/// mirroring `spec.md` §7 "a single boolean return accompanied by a
/// process-wide error-kind register". Kept thread-local (per §9
/// "Exceptions / setjmp equivalents": "should be thread-local to the
/// render worker") rather than process-wide, since each band renders on
/// its own worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MemoryExhausted,
    Interrupted,
    LutOverflow,
    BufferTooSmall,
    InvariantViolation,
    Other,
}

impl From<&Error> for ErrorKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::MemoryExhausted(_) => ErrorKind::MemoryExhausted,
            Error::Interrupted => ErrorKind::Interrupted,
            Error::LutOverflow { .. } => ErrorKind::LutOverflow,
            Error::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            _ => ErrorKind::Other,
        }
    }
}

thread_local! {
    static LAST_ERROR: Cell<Option<ErrorKind>> = const { Cell::new(None) };
}

/// Writes the error-kind register. Must be called before return from the
/// lowest frame that detected the fault, per `spec.md` §7.
pub fn set_last_error(kind: ErrorKind) {
    LAST_ERROR.with(|cell| cell.set(Some(kind)));
}

/// Reads the error-kind register without clearing it.
pub fn last_error() -> Option<ErrorKind> {
    LAST_ERROR.with(|cell| cell.get())
}

/// Clears the register; called at the start of each band (`spec.md` §7).
pub fn clear_last_error() {
    LAST_ERROR.with(|cell| cell.set(None));
}

/// Records `err`'s `ErrorKind` in the thread-local register and returns it
/// unchanged, for use at the point a fault is first detected:
/// `foo().map_err(record)?`.
pub fn record(err: Error) -> Error {
    set_last_error(ErrorKind::from(&err));
    err
}
