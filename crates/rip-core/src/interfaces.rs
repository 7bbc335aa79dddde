//! External interface traits the core consumes but does not define
//! (`spec.md` §6 "External interfaces").

use rip_band::{PageGeometry, RasterStyle, ScratchBuffer};
use rip_color::ColorantId;

/// Axis-aligned device-space bounding box, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    pub fn intersects_band(&self, band_top: i32, band_bottom: i32) -> bool {
        self.y0 < band_bottom && self.y1 > band_top
    }
}

/// How a display-list object should be painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Flat,
    Gouraud,
    Image,
}

/// Per-object render-time flags: whether it is clipped, knocked out, or an
/// erase object, mirroring the handful of booleans `spec.md` §4.1's
/// `unpack`/`apply_render_properties` consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectState {
    pub clipped: bool,
    pub knockout: bool,
    pub erase: bool,
}

/// Opaque handle a display-list object carries to find its color; the core
/// never interprets it itself beyond handing it to the [`ColorChain`]/blit
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRef(pub u32);

pub trait DisplayListObject {
    fn bbox(&self) -> BBox;
    fn state(&self) -> ObjectState;
    fn fill(&self) -> Fill;
    fn color_ref(&self) -> ColorRef;
}

pub trait DisplayListIterator {
    type Object: DisplayListObject;

    fn next(&mut self) -> Option<Self::Object>;
}

/// A built color-management chain: single-color and block invocation,
/// per `spec.md` §6.
pub trait ColorChain {
    fn convert_one(&self, in_: &[f32]) -> [f32; 3];
    fn convert_block(&self, in_: &[f32], out: &mut [f32]);
}

/// Spot number and halftone-type identifiers, opaque beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpotNo(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HtType(pub u32);

/// Minimal form-allocation obligation the halftone engine exposes to the
/// pattern-shape cache; the screen-selection algorithm itself is out of
/// scope (`spec.md` §1 "Out of scope").
pub trait FormAllocator {
    fn allocate(&self, band: u32, size: usize) -> Vec<u8>;
}

pub trait HalftoneEngine {
    fn htmax(&self, spot: SpotNo, httype: HtType, colorant: ColorantId) -> u16;
    fn form_allocator(&self) -> &dyn FormAllocator;
}

/// The page-buffer consumer: notified of raster requirements, handed
/// finished bands, and told when a page has been fully drained
/// (`spec.md` §6 "Outputs").
pub trait PageBufferDevice {
    fn raster_requirements(
        &mut self,
        starting: bool,
        geometry: PageGeometry,
        style: &RasterStyle,
        min_bands: u32,
        scratch_size: usize,
        scratch_band: &[u8],
    ) -> ScratchBuffer;

    fn deliver_band(
        &mut self,
        plane: usize,
        band: u32,
        colorant: ColorantId,
        rows: u32,
        bytes: usize,
        data: &[u8],
    );

    fn page_done(&mut self);
}
