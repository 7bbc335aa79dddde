//! Per-channel DDA setup: turns three corner colorvalues and the triangle's
//! shared geometric cross product into the step/error state a scanline
//! walker advances pixel by pixel, per `rendersh.c`'s `GOURAUD_DDA` setup.

use crate::dda::Dda;

/// Colorvalue range a channel's `unpacked` samples live in (`COLORVALUE_MAX`
/// in the original source).
const COLORVALUE_MAX: u32 = u16::MAX as u32;

/// Which of the four interpolation regimes a channel's color gradient falls
/// into across X, chosen once at triangle setup and then fixed for every
/// scanline of this (sub)triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// All three corners quantise to the same band: the channel is constant
    /// across the whole triangle, no DDA stepping needed.
    Flat,
    /// The color changes by at least one band per pixel: step every pixel.
    FastX,
    /// The color changes by less than one band per pixel, but the walk
    /// still converges inside 32-bit arithmetic: step every `xps` pixels.
    SlowX,
    /// Like `SlowX` but the per-band pixel run is long enough that the
    /// scanline walker must re-test the Y phase more conservatively.
    VerySlowX,
}

/// Ceiling division for a possibly-negative numerator over a positive
/// denominator, using Euclidean (floor) division as the building block.
fn ceil_div_i128(numerator: i128, denom: i128) -> i128 {
    let q = numerator.div_euclid(denom);
    let r = numerator.rem_euclid(denom);
    if r == 0 {
        q
    } else {
        q + 1
    }
}

/// Builds a Dda representing `numerator / (dhi * dlo)`, where `numerator`
/// may be negative, per the quotient convention `ci = floor(value)`.
fn dda_from_signed_fraction(numerator: i128, dhi: u32, dlo: u32) -> Dda {
    let denom = dhi as i128 * dlo as i128;
    let ci = numerator.div_euclid(denom);
    let rem = numerator.rem_euclid(denom);
    let cfh = (rem / dlo as i128) as u32;
    let cfl = (rem % dlo as i128) as u32;
    Dda {
        ci: ci as i32,
        cfh,
        cfl,
    }
}

/// The smallest factor of `htmax` that is greater than or equal to
/// `mbands`, i.e. the coarsest banding that still gives the caller at least
/// `mbands` distinguishable levels (`rendersh.c`'s `maxband` search).
pub fn max_band(htmax: u16, mbands: u16) -> u16 {
    let htmax = htmax.max(1);
    let mut candidate = mbands.max(1);
    while candidate <= htmax {
        if htmax % candidate == 0 {
            return candidate;
        }
        candidate += 1;
    }
    htmax
}

/// Per-channel DDA state for one Gouraud-shaded triangle.
#[derive(Debug, Clone, Copy)]
pub struct ChannelDda {
    /// Color step for one band, on the `(adz, maxband)` basis.
    pub cband: Dda,
    /// Current quantised color, on the `(adz, maxband)` basis.
    pub cquant: Dda,
    /// Residual error against the true plane value; stays in `[0, cband)`.
    pub cerror: Dda,
    /// Per-pixel-in-X color step.
    pub cqx: Dda,
    /// Per-pixel-in-X error step; always in `(-cband, 0]`.
    pub cex: Dda,
    /// Per-scanline (per-Y) color step.
    pub cqy: Dda,
    /// Per-scanline error step; always in `(-cband, 0]`.
    pub cey: Dda,
    /// Pixels per band change in X (span length before a recolor).
    pub xps: u32,
    /// Pixels remaining until the next recolor in the current span.
    pub nxs: u32,
    /// Phase of the Y stepping within an `xps`-pixel span.
    pub xpy: u32,
    pub maxband: u16,
    pub regime: Regime,
    /// The triangle-wide geometric denominator this DDA's fractions are
    /// expressed against, carried alongside so callers holding only a
    /// `&ChannelDda` can still interpret `cquant`/`cerror`/etc.
    pub adz_for_basis: u32,
}

impl ChannelDda {
    /// Derives the DDA state for one channel of a triangle, given its three
    /// corner colorvalues, the shared geometric denominator `adz` (always
    /// positive), and this channel's color-plane cross products `cross_x`
    /// and `cross_y` (computed by the caller from the same vertex geometry).
    pub fn setup(
        c0: u16,
        c1: u16,
        c2: u16,
        htmax: u16,
        mbands: u16,
        adz: u32,
        cross_x: i64,
        cross_y: i64,
    ) -> Self {
        let maxband = max_band(htmax, mbands);

        let n0 = band_index(c0, maxband);
        let n1 = band_index(c1, maxband);
        let n2 = band_index(c2, maxband);

        let cband = Dda::from_ratio(COLORVALUE_MAX as u64, adz, maxband as u32);

        let bq0 = n0 as u64 * COLORVALUE_MAX as u64;
        let cquant = Dda::from_ratio(bq0, adz, maxband as u32);

        // cerror = cband/2 - cquant + c0, biased so 0 <= cerror < cband
        // (QUANTISE_BAND): since n0 is the *nearest* band, the real residual
        // `c0 - n0*cband_real` lies in `[-cband_real/2, cband_real/2)`.
        let mut cerror = cband;
        half(&mut cerror, adz, maxband as u32);
        cerror.subtract(cquant, adz, maxband as u32);
        cerror.ci += c0 as i32;

        let flat = n0 == n1 && n1 == n2;

        if flat {
            return Self {
                cband,
                cquant,
                cerror,
                cqx: Dda::from_integer(0),
                cex: Dda::from_integer(0),
                cqy: Dda::from_integer(0),
                cey: Dda::from_integer(0),
                xps: u32::MAX,
                nxs: u32::MAX,
                xpy: 0,
                maxband,
                regime: Regime::Flat,
                adz_for_basis: adz,
            };
        }

        let (cqx, cex, regime_x, xps) = step_for_axis(cross_x, adz, maxband, cband);
        let (cqy, cey, _, _) = step_for_axis(cross_y, adz, maxband, cband);

        Self {
            cband,
            cquant,
            cerror,
            cqx,
            cex,
            cqy,
            cey,
            xps,
            nxs: xps,
            xpy: 0,
            maxband,
            regime: regime_x,
            adz_for_basis: adz,
        }
    }
}

/// Nearest band index for a colorvalue, `round(c * maxband / COLORVALUE_MAX)`.
fn band_index(c: u16, maxband: u16) -> u32 {
    ((c as u64 * maxband as u64 + (COLORVALUE_MAX as u64) / 2) / COLORVALUE_MAX as u64) as u32
}

/// Halves a Dda in place (`DIVIDE_DDA_2`): halves the integral part, folding
/// its parity into the high fraction, then halves each fraction in turn,
/// folding remainders down into the lower-precision term.
fn half(v: &mut Dda, dhi: u32, dlo: u32) {
    let ci_carry = (v.ci & 1) as u32;
    v.ci >>= 1;
    let cfh_total = v.cfh + ci_carry * dhi;
    let cfh_carry = cfh_total & 1;
    v.cfh = cfh_total >> 1;
    let cfl_total = v.cfl as u64 + cfh_carry as u64 * dlo as u64;
    v.cfl = (cfl_total >> 1) as u32;
}

/// Computes the per-pixel step (`cqx`/`cex` or `cqy`/`cey`) for one axis,
/// given that axis's signed color-plane cross product. Chooses `n`, the
/// (possibly negative) number of bands crossed per unit step, so that the
/// residual `ce` always lands in `(-cband, 0]` (`rendersh.c`'s sign-restore
/// dance after `ADD_DDA_N`), and picks the regime (and `xps` span length)
/// the scanline walker should use: *fast* steps a band every pixel, *slow*
/// steps a band every `xps` pixels, and *very slow* — when a whole-band span
/// would be too long to track in 32 bits — steps a single fractional
/// colorvalue unit every `xps` pixels instead (`rendersh.c`'s "shift one
/// fractional colour value at a time" fallback).
fn step_for_axis(cross: i64, adz: u32, maxband: u16, cband: Dda) -> (Dda, Dda, Regime, u32) {
    if cross == 0 {
        return (Dda::from_integer(0), Dda::from_integer(0), Regime::Flat, u32::MAX);
    }

    let numerator = cross as i128 * maxband as i128;
    let denom = adz as i128 * COLORVALUE_MAX as i128;
    let n = ceil_div_i128(numerator, denom);

    let band_step = |n: i128| -> Dda {
        let mut cq = Dda::from_integer(0);
        if n >= 0 {
            cq.add_n(cband, n as u32, adz, maxband as u32);
        } else {
            cq.add_n(cband, (-n) as u32, adz, maxband as u32);
            cq = cq.negate(adz, maxband as u32);
        }
        cq
    };

    let abs_cross = cross.unsigned_abs();
    let is_fast = abs_cross as u128 * maxband as u128 >= adz as u128 * COLORVALUE_MAX as u128;

    if is_fast {
        let cq = band_step(n);
        let ce_numerator = numerator - n * denom;
        let ce = dda_from_signed_fraction(ce_numerator, adz, maxband as u32);
        return (cq, ce, Regime::FastX, 1);
    }

    // Pixels per whole band (`xpc = adz/adx` in the original), at full
    // precision: how long the walker can hold one quantised color before
    // crossing into the next band.
    let span_per_band = (adz as u128 * COLORVALUE_MAX as u128) / (abs_cross as u128 * maxband as u128);

    if span_per_band <= u32::MAX as u128 {
        let cq = band_step(n);
        let ce_numerator = numerator - n * denom;
        let ce = dda_from_signed_fraction(ce_numerator, adz, maxband as u32);
        let xps = span_per_band.clamp(1, u32::MAX as u128) as u32;
        return (cq, ce, Regime::SlowX, xps);
    }

    // The whole-band span would overflow a 32-bit pixel count to track, so
    // step one raw colorvalue unit at a time instead: pixels per unit is
    // `adz / adx`, `maxband` times shorter than pixels per band.
    let span_per_unit = adz as u128 / abs_cross as u128;
    if span_per_unit <= u32::MAX as u128 {
        // cqx stays zero; the lone colorvalue-unit derivative lives in cex,
        // signed to match the direction `cross` already encodes.
        let cex = Dda::from_integer(if cross < 0 { -1 } else { 1 });
        let xps = span_per_unit.clamp(1, u32::MAX as u128) as u32;
        return (Dda::from_integer(0), cex, Regime::VerySlowX, xps);
    }

    // So flat even a single fractional step can't be tracked: treat as no
    // horizontal color change at all.
    (Dda::from_integer(0), Dda::from_integer(0), Regime::Flat, u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_channel_has_zero_steps() {
        let d = ChannelDda::setup(100, 100, 100, 255, 16, 1, 0, 0);
        assert_eq!(d.regime, Regime::Flat);
        assert_eq!(d.cqx, Dda::from_integer(0));
        assert_eq!(d.cqy, Dda::from_integer(0));
    }

    #[test]
    fn cerror_is_bounded_by_cband() {
        let d = ChannelDda::setup(0, 65535, 0, 255, 16, 4096, 65536, 0);
        assert!(d.cerror.in_range(d.cband), "cerror={:?} cband={:?}", d.cerror, d.cband);
    }

    #[test]
    fn cey_is_nonpositive_and_bounded() {
        let d = ChannelDda::setup(0, 0, 65535, 255, 16, 4096, 0, 65536);
        assert!(d.cey.ci <= 0);
        let bound = d.cband;
        let neg_bound = Dda::from_integer(0).negate(4096, d.maxband as u32);
        let _ = neg_bound;
        assert!(d.cey.ci > -(bound.ci.max(1) + 1));
    }

    #[test]
    fn max_band_picks_smallest_divisor_at_least_mbands() {
        assert_eq!(max_band(256, 10), 16);
        assert_eq!(max_band(256, 16), 16);
        assert_eq!(max_band(255, 4), 5);
    }
}
