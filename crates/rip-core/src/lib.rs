//! The render core: the per-band render loop that wires the blit-color
//! pipeline, Gouraud triangle renderer, image expander, pattern-shape
//! cache, and band-table manager together, plus the external-interface
//! traits the core consumes but does not define.

mod config;
mod error;
mod interfaces;
mod object_tag;
mod render;

pub use config::RenderConfig;
pub use error::{clear_last_error, last_error, record, set_last_error, Error, ErrorKind, Result};
pub use interfaces::{
    BBox, ColorChain, ColorRef, DisplayListIterator, DisplayListObject, Fill, FormAllocator,
    HalftoneEngine, HtType, ObjectState, PageBufferDevice, SpotNo,
};
pub use object_tag::{ObjectTag, Tagged};
pub use render::PageRenderer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rip_band::{PageGeometry, RasterStyle, ScratchBuffer};
    use rip_color::{Channel, ColorantId, BlitColorMap, PackVariant};

    struct OneFlatObject {
        bbox: BBox,
        done: bool,
    }

    impl DisplayListIterator for OneFlatObject {
        type Object = FlatObject;

        fn next(&mut self) -> Option<Self::Object> {
            if self.done {
                None
            } else {
                self.done = true;
                Some(FlatObject { bbox: self.bbox })
            }
        }
    }

    struct FlatObject {
        bbox: BBox,
    }

    impl DisplayListObject for FlatObject {
        fn bbox(&self) -> BBox {
            self.bbox
        }
        fn state(&self) -> ObjectState {
            ObjectState::default()
        }
        fn fill(&self) -> Fill {
            Fill::Flat
        }
        fn color_ref(&self) -> ColorRef {
            ColorRef(0)
        }
    }

    struct IdentityChain;
    impl ColorChain for IdentityChain {
        fn convert_one(&self, in_: &[f32]) -> [f32; 3] {
            [in_[0], in_.get(1).copied().unwrap_or(0.0), in_.get(2).copied().unwrap_or(0.0)]
        }
        fn convert_block(&self, in_: &[f32], out: &mut [f32]) {
            out.copy_from_slice(in_);
        }
    }

    struct FixedHalftone;
    impl FormAllocator for FixedHalftone {
        fn allocate(&self, _band: u32, size: usize) -> Vec<u8> {
            vec![0; size]
        }
    }
    impl HalftoneEngine for FixedHalftone {
        fn htmax(&self, _spot: SpotNo, _httype: HtType, _colorant: ColorantId) -> u16 {
            255
        }
        fn form_allocator(&self) -> &dyn FormAllocator {
            self
        }
    }

    #[derive(Default)]
    struct RecordingDevice {
        delivered: Vec<(u32, usize)>,
        done: bool,
    }

    impl PageBufferDevice for RecordingDevice {
        fn raster_requirements(
            &mut self,
            _starting: bool,
            _geometry: PageGeometry,
            _style: &RasterStyle,
            _min_bands: u32,
            scratch_size: usize,
            _scratch_band: &[u8],
        ) -> ScratchBuffer {
            ScratchBuffer::with_capacity(scratch_size)
        }

        fn deliver_band(&mut self, _plane: usize, band: u32, _colorant: ColorantId, _rows: u32, bytes: usize, _data: &[u8]) {
            self.delivered.push((band, bytes));
        }

        fn page_done(&mut self) {
            self.done = true;
        }
    }

    fn mono_colormap() -> Arc<BlitColorMap> {
        let channel = Channel::new(ColorantId::All, 0, 1);
        Arc::new(BlitColorMap::new(vec![channel], PackVariant::Mask, 1).unwrap())
    }

    #[test]
    fn render_band_delivers_painted_band_and_skips_blank_one() {
        let style = RasterStyle::new(1, 1, false);
        let geometry = PageGeometry { width: 64, height: 64 };
        let config = RenderConfig::new(16, 1, false, 0, 1, 0).unwrap();
        let mut renderer = PageRenderer::new(config, mono_colormap(), style, geometry).unwrap();

        let chain = IdentityChain;
        let halftone = FixedHalftone;
        let mut device = RecordingDevice::default();

        let mut painted = OneFlatObject {
            bbox: BBox { x0: 0, y0: 0, x1: 10, y1: 10 },
            done: false,
        };
        renderer.render_band(0, &mut painted, &chain, &halftone, &mut device).unwrap();
        assert_eq!(device.delivered.len(), 1);

        let mut empty = OneFlatObject {
            bbox: BBox { x0: 0, y0: 1000, x1: 10, y1: 1010 },
            done: false,
        };
        renderer.render_band(1, &mut empty, &chain, &halftone, &mut device).unwrap();
        assert_eq!(device.delivered.len(), 1, "band outside any object's bbox must not be delivered");

        renderer.finish(&mut device);
        assert!(device.done);
    }

    #[test]
    fn band_count_matches_layout() {
        let style = RasterStyle::new(1, 8, true);
        let geometry = PageGeometry { width: 64, height: 100 };
        let config = RenderConfig::new(25, 1, false, 0, 1, 0).unwrap();
        let renderer = PageRenderer::new(config, mono_colormap(), style, geometry).unwrap();
        assert_eq!(renderer.band_count(), 4);
    }
}
