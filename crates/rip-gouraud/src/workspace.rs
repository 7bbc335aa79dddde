//! Scratch buffers shared across the worker threads rendering different
//! bands of the same page, so a Gouraud fill doesn't allocate per triangle.

use std::sync::RwLock;

use crate::channel::ChannelDda;

/// Per-page scratch state for the Gouraud renderer. One instance is shared
/// (behind an `Arc`) across all band workers; each worker only takes the
/// write lock while resizing, and otherwise reads its own slice.
#[derive(Debug, Default)]
pub struct ShadingWorkspace {
    inner: RwLock<WorkspaceBuffers>,
}

#[derive(Debug, Default)]
struct WorkspaceBuffers {
    /// Reused across triangles: one `ChannelDda` per blit channel.
    channel_ddas: Vec<ChannelDda>,
    /// Reused across bisection recursion: the packed flag bitstream cursor
    /// state doesn't live here, but the color accumulator for each
    /// recursion level does, indexed by depth.
    span_colors: Vec<u16>,
}

impl ShadingWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows (allocating if needed) a `nchannels`-long `ChannelDda`
    /// scratch slice for the duration of `f`.
    pub fn with_channel_ddas<R>(&self, nchannels: usize, f: impl FnOnce(&mut [ChannelDda]) -> R) -> R {
        let mut guard = self.inner.write().expect("shading workspace poisoned");
        if guard.channel_ddas.len() < nchannels {
            guard.channel_ddas.resize(nchannels, zeroed_channel_dda());
        }
        f(&mut guard.channel_ddas[..nchannels])
    }

    /// Borrows a `len`-long `u16` span-color scratch buffer for the
    /// duration of `f`.
    pub fn with_span_colors<R>(&self, len: usize, f: impl FnOnce(&mut [u16]) -> R) -> R {
        let mut guard = self.inner.write().expect("shading workspace poisoned");
        if guard.span_colors.len() < len {
            guard.span_colors.resize(len, 0);
        }
        f(&mut guard.span_colors[..len])
    }
}

fn zeroed_channel_dda() -> ChannelDda {
    use crate::dda::Dda;
    ChannelDda {
        cband: Dda::from_integer(0),
        cquant: Dda::from_integer(0),
        cerror: Dda::from_integer(0),
        cqx: Dda::from_integer(0),
        cex: Dda::from_integer(0),
        cqy: Dda::from_integer(0),
        cey: Dda::from_integer(0),
        xps: 0,
        nxs: 0,
        xpy: 0,
        maxband: 1,
        regime: crate::channel::Regime::Flat,
        adz_for_basis: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_dda_scratch_resizes_up_as_needed() {
        let ws = ShadingWorkspace::new();
        ws.with_channel_ddas(2, |s| assert_eq!(s.len(), 2));
        ws.with_channel_ddas(5, |s| assert_eq!(s.len(), 5));
    }

    #[test]
    fn span_colors_scratch_is_reused_across_calls() {
        let ws = ShadingWorkspace::new();
        ws.with_span_colors(4, |s| s[0] = 42);
        ws.with_span_colors(4, |s| assert_eq!(s[0], 42));
    }
}
