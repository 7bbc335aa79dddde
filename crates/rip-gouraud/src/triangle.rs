//! Gouraud-shaded triangle rasterization: plane-equation color setup,
//! scanline walking via the per-channel rational DDA, and the recursive
//! bisection used to split a triangle at caller-supplied band boundaries.

use crate::channel::{ChannelDda, Regime};
use crate::dda::Dda;
use crate::error::{Error, Result};
use crate::noise::NoiseGenerator;
use crate::workspace::ShadingWorkspace;

const COLORVALUE_MAX: u32 = u16::MAX as u32;

/// One corner of a Gouraud triangle: an integer device-space position and
/// one quantised colorvalue per rendered channel.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub x: i64,
    pub y: i64,
    pub colors: Vec<u16>,
}

impl Vertex {
    pub fn new(x: i64, y: i64, colors: Vec<u16>) -> Self {
        Self { x, y, colors }
    }
}

/// Receives the spans a fill produces. `emit_span_single` is the common
/// case (one rendered channel, e.g. a separation or mask); `emit_span_multi`
/// is the general N-channel path.
pub trait SpanSink {
    fn emit_span_single(&mut self, y: i64, x0: i64, len: u32, color: u16);
    fn emit_span_multi(&mut self, y: i64, x0: i64, len: u32, colors: &[u16]);
}

/// Polled at bisection and scanline boundaries; returning `true` aborts the
/// fill with [`Error::Interrupted`].
pub trait InterruptPoll {
    fn interrupted(&self) -> bool;
}

impl InterruptPoll for () {
    fn interrupted(&self) -> bool {
        false
    }
}

/// A triangle pending render, with the band-count target and per-channel
/// halftone maxima needed to set up each channel's DDA.
pub struct GouraudTriangle<'a> {
    pub vertices: [Vertex; 3],
    pub htmax: &'a [u16],
    pub mbands: u16,
}

/// The exact per-unit-step color derivative along one axis: `cqx + cex` (or
/// `cqy + cey`). `cqx` alone is an integer multiple of `cband`; folding in
/// `cex` recovers the true plane-equation derivative, so that stepping a
/// value by this combined DDA via ordinary `add`/`add_n` tracks the exact
/// color with no separate carry test needed — `Dda::add`'s own fractional
/// carry already does that work.
fn combined_step(q: Dda, e: Dda, adz: u32, maxband: u32) -> Dda {
    let mut step = q;
    step.add(e, adz, maxband);
    step
}

impl<'a> GouraudTriangle<'a> {
    /// Renders the whole triangle in one pass, with no bisection. Suitable
    /// once the caller has already split work at band boundaries (see
    /// [`Self::render_bisected`]).
    pub fn render(
        &self,
        workspace: &ShadingWorkspace,
        noise: &NoiseGenerator,
        colorant_indices: &[u32],
        sink: &mut dyn SpanSink,
        interrupt: &dyn InterruptPoll,
    ) -> Result<()> {
        let nchannels = self.vertices[0].colors.len();
        for v in &self.vertices[1..] {
            if v.colors.len() != nchannels {
                return Err(Error::ChannelCountMismatch {
                    expected: nchannels,
                    found: v.colors.len(),
                });
            }
        }

        // Sort corners by y so edge interpolation always walks top to bottom.
        let mut order = [0usize, 1, 2];
        order.sort_by_key(|&i| self.vertices[i].y);
        let [a, b, c] = order.map(|i| &self.vertices[i]);

        let dx1 = b.x - a.x;
        let dy1 = b.y - a.y;
        let dx2 = c.x - a.x;
        let dy2 = c.y - a.y;
        let mut cross_z = dx1 * dy2 - dx2 * dy1;
        if cross_z == 0 {
            return Ok(()); // zero-area triangle: nothing to paint
        }
        let adz_sign: i64 = if cross_z < 0 { -1 } else { 1 };
        cross_z *= adz_sign;
        let adz = cross_z.unsigned_abs().min(u32::MAX as u64) as u32;

        workspace.with_channel_ddas(nchannels, |ddas| {
            for ch in 0..nchannels {
                let dc1 = b.colors[ch] as i64 - a.colors[ch] as i64;
                let dc2 = c.colors[ch] as i64 - a.colors[ch] as i64;
                let cross_x = (dy1 * dc2 - dy2 * dc1) * adz_sign;
                let cross_y = (dx2 * dc1 - dx1 * dc2) * adz_sign;
                ddas[ch] = ChannelDda::setup(
                    a.colors[ch],
                    b.colors[ch],
                    c.colors[ch],
                    self.htmax.get(ch).copied().unwrap_or(u16::MAX),
                    self.mbands,
                    adz,
                    cross_x,
                    cross_y,
                );
            }

            workspace.with_span_colors(nchannels, |colors| {
                self.scan_fill(a, b, c, ddas, colors, noise, colorant_indices, sink, interrupt)
            })
        })
    }

    /// Bisects the triangle's Y-range according to a packed bitstream of
    /// split flags (one bit per recursion level: `1` = split the current
    /// range at its midpoint and recurse on both halves, `0` = render the
    /// current range directly). `max_depth` bounds recursion so a malformed
    /// bitstream can't recurse forever.
    pub fn render_bisected(
        &self,
        flags: &[bool],
        max_depth: u32,
        workspace: &ShadingWorkspace,
        noise: &NoiseGenerator,
        colorant_indices: &[u32],
        sink: &mut dyn SpanSink,
        interrupt: &dyn InterruptPoll,
    ) -> Result<()> {
        self.bisect(flags, 0, max_depth, workspace, noise, colorant_indices, sink, interrupt)
    }

    fn bisect(
        &self,
        flags: &[bool],
        depth: u32,
        max_depth: u32,
        workspace: &ShadingWorkspace,
        noise: &NoiseGenerator,
        colorant_indices: &[u32],
        sink: &mut dyn SpanSink,
        interrupt: &dyn InterruptPoll,
    ) -> Result<()> {
        if interrupt.interrupted() {
            return Err(Error::Interrupted);
        }
        if depth > max_depth {
            return Err(Error::BisectionDepthExceeded { depth });
        }

        let split = flags.get(depth as usize).copied().unwrap_or(false);
        if !split {
            return self.render(workspace, noise, colorant_indices, sink, interrupt);
        }

        let (lo, hi) = self.split_at_midpoint();
        lo.bisect(flags, depth + 1, max_depth, workspace, noise, colorant_indices, sink, interrupt)?;
        hi.bisect(flags, depth + 1, max_depth, workspace, noise, colorant_indices, sink, interrupt)
    }

    /// Splits the triangle's bounding Y-range at its midpoint, producing two
    /// triangles that together cover the same area and share interpolated
    /// colors along the cut (`GOURAUD_BISECT`'s 32.k fixed-point midpoint,
    /// here simplified to whole-pixel midpoints).
    fn split_at_midpoint(&self) -> (GouraudTriangle<'a>, GouraudTriangle<'a>) {
        let mut order = [0usize, 1, 2];
        order.sort_by_key(|&i| self.vertices[i].y);
        let top = self.vertices[order[0]].clone();
        let mid = self.vertices[order[1]].clone();
        let bot = self.vertices[order[2]].clone();

        let split_y = (top.y + bot.y) / 2;
        let interp_on_long_edge = lerp_vertex(&top, &bot, split_y);

        let lo = GouraudTriangle {
            vertices: [top, mid.clone(), interp_on_long_edge.clone()],
            htmax: self.htmax,
            mbands: self.mbands,
        };
        let hi = GouraudTriangle {
            vertices: [mid, interp_on_long_edge, bot],
            htmax: self.htmax,
            mbands: self.mbands,
        };
        (lo, hi)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_fill(
        &self,
        a: &Vertex,
        b: &Vertex,
        c: &Vertex,
        ddas: &[ChannelDda],
        span_colors: &mut [u16],
        noise: &NoiseGenerator,
        colorant_indices: &[u32],
        sink: &mut dyn SpanSink,
        interrupt: &dyn InterruptPoll,
    ) -> Result<()> {
        let y_top = a.y;
        let y_bot = c.y;
        if y_top >= y_bot {
            return Ok(());
        }
        let anchor_x = a.x;

        // Exact per-pixel / per-scanline color derivative, folding each
        // channel's band-aligned step (`cqx`/`cqy`) and its residual
        // (`cex`/`cey`) into one value: stepping by this via ordinary
        // `Dda::add`/`add_n` tracks the true plane-equation color with no
        // separate carry test, since `add`'s own fractional carry already
        // does that work.
        let steps: Vec<(Dda, Dda)> = ddas
            .iter()
            .map(|d| {
                (
                    combined_step(d.cqx, d.cex, d.adz_for_basis, d.maxband as u32),
                    combined_step(d.cqy, d.cey, d.adz_for_basis, d.maxband as u32),
                )
            })
            .collect();

        for y in y_top..y_bot {
            if interrupt.interrupted() {
                return Err(Error::Interrupted);
            }

            let (x_left, x_right) = scanline_bounds(a, b, c, y);
            if x_left >= x_right {
                continue;
            }

            let dy = (y - y_top) as u32;
            let dx = x_left - anchor_x;

            // Position every channel's value at (x_left, y) by jumping from
            // the setup anchor (vertex `a`) via add_n, rather than carrying
            // state incrementally scanline to scanline — exact regardless of
            // how far the left edge has slanted since the previous row.
            let mut values: Vec<Dda> = ddas.iter().map(|d| d.cquant).collect();
            for (ch, dda) in ddas.iter().enumerate() {
                if matches!(dda.regime, Regime::Flat) {
                    continue;
                }
                let adz = dda.adz_for_basis;
                let maxband = dda.maxband as u32;
                values[ch].add_n(steps[ch].1, dy, adz, maxband);
                if dx >= 0 {
                    values[ch].add_n(steps[ch].0, dx as u32, adz, maxband);
                } else {
                    let neg_step = steps[ch].0.negate(adz, maxband);
                    values[ch].add_n(neg_step, (-dx) as u32, adz, maxband);
                }
            }

            // Tracks each non-flat channel's pixels remaining in its current
            // band/unit span, starting from the setup-time phase so the
            // first span of the scanline isn't artificially shortened.
            let mut local_nxs: Vec<u32> = ddas.iter().map(|d| d.nxs.max(1)).collect();
            let noisy = noise.is_active();
            let mut px = x_left;
            let mut prev_span_len: u32 = 0;

            while px < x_right {
                for (ch, dda) in ddas.iter().enumerate() {
                    if prev_span_len > 0 && !matches!(dda.regime, Regime::Flat) {
                        values[ch].add_n(steps[ch].0, prev_span_len, dda.adz_for_basis, dda.maxband as u32);
                    }
                    let base = values[ch].round_to_u16(dda.adz_for_basis, dda.maxband as u32);
                    let colorant = colorant_indices.get(ch).copied().unwrap_or(ch as u32);
                    let perturbed = base as i32 + noise.sample(px as i32, y as i32, colorant);
                    span_colors[ch] = perturbed.clamp(0, COLORVALUE_MAX as i32) as u16;
                }

                // The generalised span routine tracks the minimum `nxs`
                // across channels and emits a run of that length; noise
                // addition forces single pixels, since every pixel needs its
                // own sample regardless of how long the color stays flat.
                let remaining = (x_right - px) as u32;
                let mut span_len = remaining;
                if noisy {
                    span_len = 1;
                } else {
                    for (ch, dda) in ddas.iter().enumerate() {
                        if !matches!(dda.regime, Regime::Flat) {
                            span_len = span_len.min(local_nxs[ch]);
                        }
                    }
                }
                span_len = span_len.clamp(1, remaining);

                if span_colors.len() == 1 {
                    sink.emit_span_single(y, px, span_len, span_colors[0]);
                } else {
                    sink.emit_span_multi(y, px, span_len, span_colors);
                }

                for (ch, dda) in ddas.iter().enumerate() {
                    if matches!(dda.regime, Regime::Flat) {
                        continue;
                    }
                    if local_nxs[ch] > span_len {
                        local_nxs[ch] -= span_len;
                    } else {
                        local_nxs[ch] = dda.xps.max(1);
                    }
                }

                px += span_len as i64;
                prev_span_len = span_len;
            }
        }

        Ok(())
    }
}

fn lerp_vertex(from: &Vertex, to: &Vertex, at_y: i64) -> Vertex {
    let dy = to.y - from.y;
    if dy == 0 {
        return from.clone();
    }
    let t_num = at_y - from.y;
    let x = from.x + (to.x - from.x) * t_num / dy;
    let colors = from
        .colors
        .iter()
        .zip(&to.colors)
        .map(|(&c0, &c1)| {
            let delta = c1 as i64 - c0 as i64;
            (c0 as i64 + delta * t_num / dy).clamp(0, COLORVALUE_MAX as i64) as u16
        })
        .collect();
    Vertex::new(x, at_y, colors)
}

/// Left/right pixel bounds (exclusive right) of the triangle at scanline
/// `y`, found by interpolating along whichever two edges straddle `y`.
fn scanline_bounds(a: &Vertex, b: &Vertex, c: &Vertex, y: i64) -> (i64, i64) {
    let on_edge = |p0: &Vertex, p1: &Vertex| -> Option<i64> {
        if y < p0.y || y >= p1.y || p0.y == p1.y {
            return None;
        }
        Some(p0.x + (p1.x - p0.x) * (y - p0.y) / (p1.y - p0.y))
    };

    let mut xs = [on_edge(a, b), on_edge(b, c), on_edge(a, c)]
        .into_iter()
        .flatten();
    let x0 = xs.next();
    let x1 = xs.next();
    match (x0, x1) {
        (Some(x0), Some(x1)) => (x0.min(x1), x0.max(x1)),
        (Some(x0), None) => (x0, x0),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectSink {
        spans: Vec<(i64, i64, u32, Vec<u16>)>,
    }

    impl SpanSink for CollectSink {
        fn emit_span_single(&mut self, y: i64, x0: i64, len: u32, color: u16) {
            self.spans.push((y, x0, len, vec![color]));
        }
        fn emit_span_multi(&mut self, y: i64, x0: i64, len: u32, colors: &[u16]) {
            self.spans.push((y, x0, len, colors.to_vec()));
        }
    }

    #[test]
    fn degenerate_triangle_emits_nothing() {
        let tri = GouraudTriangle {
            vertices: [
                Vertex::new(0, 0, vec![0]),
                Vertex::new(10, 0, vec![255]),
                Vertex::new(20, 0, vec![0]),
            ],
            htmax: &[255],
            mbands: 16,
        };
        let ws = ShadingWorkspace::new();
        let noise = NoiseGenerator::default();
        let mut sink = CollectSink { spans: Vec::new() };
        tri.render(&ws, &noise, &[0], &mut sink, &()).unwrap();
        assert!(sink.spans.is_empty());
    }

    #[test]
    fn simple_triangle_fills_expected_rows() {
        // v0=(0,0,0), v1=(100,0,65535), v2=(0,100,0): a right triangle whose
        // top edge carries the full color gradient and whose left edge is
        // constant at 0.
        let tri = GouraudTriangle {
            vertices: [
                Vertex::new(0, 0, vec![0]),
                Vertex::new(100, 0, vec![65535]),
                Vertex::new(0, 100, vec![0]),
            ],
            htmax: &[255],
            mbands: 16,
        };
        let ws = ShadingWorkspace::new();
        let noise = NoiseGenerator::default();
        let mut sink = CollectSink { spans: Vec::new() };
        tri.render(&ws, &noise, &[0], &mut sink, &()).unwrap();
        assert!(!sink.spans.is_empty());
        // Every row must start at x>=0 since the left edge is vertical.
        for (_, x0, _, _) in &sink.spans {
            assert!(*x0 >= 0);
        }
        // Along the top scanline, color must be non-decreasing left to right
        // (x=0 is the dark corner, x=99 approaches the bright corner).
        let mut top_row: Vec<_> = sink.spans.iter().filter(|(y, ..)| *y == 0).collect();
        top_row.sort_by_key(|(_, x0, ..)| *x0);
        assert!(top_row.first().unwrap().3[0] < top_row.last().unwrap().3[0]);
    }

    #[test]
    fn flat_color_triangle_emits_one_span_per_row() {
        // All three corners share a colorvalue, so the channel is `Flat`:
        // each row should come back as a single run covering its full width
        // rather than one span per pixel.
        let tri = GouraudTriangle {
            vertices: [
                Vertex::new(0, 0, vec![12345]),
                Vertex::new(50, 0, vec![12345]),
                Vertex::new(0, 20, vec![12345]),
            ],
            htmax: &[255],
            mbands: 16,
        };
        let ws = ShadingWorkspace::new();
        let noise = NoiseGenerator::default();
        let mut sink = CollectSink { spans: Vec::new() };
        tri.render(&ws, &noise, &[0], &mut sink, &()).unwrap();

        let row0: Vec<_> = sink.spans.iter().filter(|(y, ..)| *y == 0).collect();
        assert_eq!(row0.len(), 1, "a flat row should be a single run, got {row0:?}");
        assert!(row0[0].2 > 1, "span length should cover more than one pixel");
    }

    #[test]
    fn span_lengths_cover_each_row_exactly_once() {
        let tri = GouraudTriangle {
            vertices: [
                Vertex::new(0, 0, vec![0]),
                Vertex::new(100, 0, vec![65535]),
                Vertex::new(0, 100, vec![0]),
            ],
            htmax: &[255],
            mbands: 16,
        };
        let ws = ShadingWorkspace::new();
        let noise = NoiseGenerator::default();
        let mut sink = CollectSink { spans: Vec::new() };
        tri.render(&ws, &noise, &[0], &mut sink, &()).unwrap();

        let mut by_row: std::collections::HashMap<i64, Vec<&(i64, i64, u32, Vec<u16>)>> =
            std::collections::HashMap::new();
        for span in &sink.spans {
            by_row.entry(span.0).or_default().push(span);
        }
        for (_, mut spans) in by_row {
            spans.sort_by_key(|s| s.1);
            for w in spans.windows(2) {
                assert_eq!(w[0].1 + w[0].2 as i64, w[1].1, "spans must be contiguous, no gaps or overlaps");
            }
        }
    }

    #[test]
    fn channel_count_mismatch_is_rejected() {
        let tri = GouraudTriangle {
            vertices: [
                Vertex::new(0, 0, vec![0, 0]),
                Vertex::new(10, 0, vec![255]),
                Vertex::new(0, 10, vec![0, 0]),
            ],
            htmax: &[255, 255],
            mbands: 16,
        };
        let ws = ShadingWorkspace::new();
        let noise = NoiseGenerator::default();
        let mut sink = CollectSink { spans: Vec::new() };
        let err = tri.render(&ws, &noise, &[0, 1], &mut sink, &()).unwrap_err();
        assert!(matches!(err, Error::ChannelCountMismatch { .. }));
    }
}
