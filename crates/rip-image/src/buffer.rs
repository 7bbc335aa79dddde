//! The shared expansion-buffer cache and its low-memory solicit/release
//! protocol (`spec.md` §4.3 "Expansion-buffer cache").

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identifies the scanline currently held in an [`ExpansionBuffer`], so a
/// repeat `request` with the same key can be answered without re-decoding.
///
/// Per `spec.md` §3 the key is `(image, x, y, n, otf, expanded-to-plane
/// mapping)`, not just the coordinates: a repeat request at the same `(x, y,
/// n)` but a different channel mapping (or a toggled on-the-fly conversion)
/// must miss the cache, since it asks for different bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanlineKey {
    pub image_id: u32,
    pub x: u32,
    pub y: u32,
    pub n: u32,
    pub otf: bool,
    pub mapping: Vec<Option<usize>>,
}

/// One image's decode scratch space. Several images can end up pointing at
/// the same `ExpansionBuffer` after a [`LowMemoryHandler::release`] folds
/// them onto the largest.
#[derive(Debug)]
pub struct ExpansionBuffer {
    pub data: Vec<u8>,
    refcount: AtomicU32,
    key: Option<ScanlineKey>,
}

impl ExpansionBuffer {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            data: vec![0u8; size],
            refcount: AtomicU32::new(1),
            key: None,
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn refcount(&self) -> u32 {
        self.refcount.load(Ordering::Relaxed)
    }

    pub fn key(&self) -> Option<&ScanlineKey> {
        self.key.as_ref()
    }

    fn incref(&self) {
        self.refcount.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `true` if this was the last reference.
    fn decref(&self) -> bool {
        self.refcount.fetch_sub(1, Ordering::Relaxed) == 1
    }
}

/// One entry in the page's image list, as seen by the low-memory handler:
/// just enough to compute the solicit estimate and to perform the release
/// swap, without the handler needing to know anything else about the image.
struct Registration {
    buffer: Arc<ExpansionBuffer>,
}

/// Owned by the page (not module-scope mutable state, per `spec.md` §9
/// "Global mutable state"). Implements the solicit/release protocol of
/// `spec.md` §4.3 exactly.
#[derive(Default)]
pub struct LowMemoryHandler {
    images: Vec<Registration>,
    rendering: bool,
    last_offer: Option<usize>,
    shared: Option<Arc<ExpansionBuffer>>,
}

impl LowMemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image's buffer so it participates in future
    /// solicit/release rounds.
    pub fn register(&mut self, buffer: Arc<ExpansionBuffer>) {
        self.images.push(Registration { buffer });
    }

    pub fn unregister_all(&mut self) {
        self.images.clear();
        self.shared = None;
        self.last_offer = None;
    }

    /// Inhibits (`true`) or re-enables solicitation during active
    /// rendering, per `spec.md` §4.3 "Solicit is inhibited during
    /// rendering".
    pub fn set_rendering(&mut self, rendering: bool) {
        self.rendering = rendering;
    }

    /// Estimates reclaimable bytes: sums `(sizeof(header) + size) /
    /// refcount` across every registered buffer, minus the largest (which
    /// will be kept), per `spec.md` §4.3 "Solicit". Returns `None` while
    /// rendering is active, or if nothing changed since the last offer (the
    /// same estimate is re-presented rather than recomputed).
    pub fn solicit(&mut self, header_bytes: usize) -> Option<usize> {
        if self.rendering {
            return None;
        }
        if self.images.is_empty() {
            return None;
        }
        let largest = self
            .images
            .iter()
            .map(|r| r.buffer.size())
            .max()
            .unwrap_or(0);
        let total: usize = self
            .images
            .iter()
            .map(|r| {
                let refcount = r.buffer.refcount().max(1) as usize;
                (header_bytes + r.buffer.size()) / refcount
            })
            .sum();
        let estimate = total.saturating_sub(header_bytes + largest);

        if self.last_offer == Some(estimate) {
            return self.last_offer;
        }
        self.last_offer = Some(estimate);
        Some(estimate)
    }

    /// Switches every registered image to the currently largest buffer,
    /// decrementing (and freeing, at ref-count zero) each image's old
    /// buffer, and records the new shared pointer on the page, per
    /// `spec.md` §4.3 "Release".
    ///
    /// The page's own `self.shared` handle counts as a reference too, so it
    /// gets its own `incref` alongside each folded image's.
    pub fn release(&mut self) -> Option<Arc<ExpansionBuffer>> {
        let largest = self
            .images
            .iter()
            .map(|r| r.buffer.clone())
            .max_by_key(|b| b.size())?;

        for reg in &mut self.images {
            if !Arc::ptr_eq(&reg.buffer, &largest) {
                let old = std::mem::replace(&mut reg.buffer, largest.clone());
                largest.incref();
                if old.decref() {
                    tracing::trace!(size = old.size(), "expansion buffer freed at refcount 0");
                }
            }
        }
        largest.incref();
        self.shared = Some(largest.clone());
        Some(largest)
    }

    pub fn shared(&self) -> Option<&Arc<ExpansionBuffer>> {
        self.shared.as_ref()
    }
}
