//! On-the-fly colour conversion of a decoded scanline for direct-rendered
//! regions (`spec.md` §4.3 "On-the-fly conversion").

/// A chunked colour-conversion step, implemented by `rip-core` over a
/// `ColorChain`. Operates on whole pixels of `f32` components, matching the
/// `ColorChain::convert_block` shape used by the render core.
pub trait OnTheFlyConverter {
    fn convert_block(&self, input: &[f32], output: &mut [f32]);
}

/// The largest number of pixels converted per `convert_block` call, so a
/// single huge scanline doesn't force one unbounded conversion-object call.
pub const CONVERT_BATCH_PIXELS: usize = 256;

/// Converts `src` (`n_pixels` pixels of `in_components` each) through
/// `converter` in batches, writing `out_components`-wide pixels to `dst`.
///
/// If the converted (output) pixel width is wider than the source, the
/// source samples are first moved to the tail of `dst` so that conversion
/// can proceed head-to-head in place without the growing output
/// overwriting not-yet-read input, per `spec.md` §4.3 "If the converted
/// width is wider than the source, the source is first moved to the tail
/// of the scanline buffer".
pub fn convert_scanline_in_place(
    dst: &mut [f32],
    n_pixels: usize,
    in_components: usize,
    out_components: usize,
    converter: &dyn OnTheFlyConverter,
) {
    let in_len = n_pixels * in_components;
    let out_len = n_pixels * out_components;
    debug_assert!(dst.len() >= out_len.max(in_len));

    if out_components > in_components {
        // Shift the source block to the tail so growth never overwrites
        // unread input.
        let shift = out_len - in_len;
        for i in (0..in_len).rev() {
            dst[i + shift] = dst[i];
        }
        let src_start = shift;
        convert_in_batches(
            dst,
            src_start,
            0,
            n_pixels,
            in_components,
            out_components,
            converter,
        );
    } else {
        convert_in_batches(dst, 0, 0, n_pixels, in_components, out_components, converter);
    }
}

fn convert_in_batches(
    buf: &mut [f32],
    src_base: usize,
    dst_base: usize,
    n_pixels: usize,
    in_components: usize,
    out_components: usize,
    converter: &dyn OnTheFlyConverter,
) {
    let mut pix = 0usize;
    while pix < n_pixels {
        let batch = CONVERT_BATCH_PIXELS.min(n_pixels - pix);
        let src_off = src_base + pix * in_components;
        let dst_off = dst_base + pix * out_components;

        let mut scratch_in = vec![0.0f32; batch * in_components];
        scratch_in.copy_from_slice(&buf[src_off..src_off + batch * in_components]);
        let mut scratch_out = vec![0.0f32; batch * out_components];
        converter.convert_block(&scratch_in, &mut scratch_out);
        buf[dst_off..dst_off + batch * out_components].copy_from_slice(&scratch_out);

        pix += batch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;
    impl OnTheFlyConverter for Doubler {
        fn convert_block(&self, input: &[f32], output: &mut [f32]) {
            for (chunk_in, chunk_out) in input.chunks(1).zip(output.chunks_mut(2)) {
                chunk_out[0] = chunk_in[0];
                chunk_out[1] = chunk_in[0];
            }
        }
    }

    #[test]
    fn widening_conversion_moves_source_to_tail_first() {
        // 4 single-component pixels -> 4 two-component pixels, in place.
        let mut buf = vec![0.0f32; 8];
        buf[0] = 1.0;
        buf[1] = 2.0;
        buf[2] = 3.0;
        buf[3] = 4.0;
        convert_scanline_in_place(&mut buf, 4, 1, 2, &Doubler);
        assert_eq!(buf, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
    }

    struct Identity;
    impl OnTheFlyConverter for Identity {
        fn convert_block(&self, input: &[f32], output: &mut [f32]) {
            output.copy_from_slice(input);
        }
    }

    #[test]
    fn same_width_conversion_does_not_shift() {
        let mut buf = vec![1.0, 2.0, 3.0, 4.0];
        convert_scanline_in_place(&mut buf, 4, 1, 1, &Identity);
        assert_eq!(buf, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn batches_larger_than_batch_size_are_chunked() {
        let n = CONVERT_BATCH_PIXELS * 2 + 5;
        let mut buf: Vec<f32> = (0..n).map(|i| i as f32).collect();
        convert_scanline_in_place(&mut buf, n, 1, 1, &Identity);
        assert_eq!(buf, (0..n).map(|i| i as f32).collect::<Vec<_>>());
    }
}
