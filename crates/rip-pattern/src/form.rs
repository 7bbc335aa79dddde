//! A band-sized raster, stored however is cheapest: a dense bitmap or a
//! sparse run-length span list (`spec.md` §4.4, GLOSSARY "Form").

use rip_grid::AlignedGrid;

/// One run of set pixels within a band, `[x, x + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub x: u32,
    pub len: u32,
}

/// A finished, immutable band form. Once built it is shared (behind an
/// `Arc`) by every display-list object painting through the same pattern
/// or clip shape in the same render state.
#[derive(Debug, Clone)]
pub enum Form {
    Bitmap(std::sync::Arc<AlignedGrid<u8>>),
    SpanList(Vec<Span>),
}

impl Form {
    /// Approximate in-memory footprint, used to pick the cheaper
    /// representation for a given band (`spec.md` §4.4 "picks the smaller
    /// of a bitmap or a span-list representation").
    pub fn byte_size(&self) -> usize {
        match self {
            Form::Bitmap(grid) => grid.buf().len(),
            Form::SpanList(spans) => spans.len() * std::mem::size_of::<Span>(),
        }
    }

    /// Builds whichever of a bitmap or span-list form is smaller for this
    /// band, given both candidate representations of the same coverage.
    pub fn smaller_of(bitmap: AlignedGrid<u8>, spans: Vec<Span>) -> Self {
        let bitmap = Form::Bitmap(std::sync::Arc::new(bitmap));
        let spans = Form::SpanList(spans);
        if bitmap.byte_size() <= spans.byte_size() {
            bitmap
        } else {
            spans
        }
    }
}
