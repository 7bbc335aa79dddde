//! [`PatternArena`]: a page-scoped, deduplicating, reference-counted store
//! of pattern-shape forms, replacing `patternshape.c`'s
//! parent/context/base pointer chase with arena ids (`spec.md` §9).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rip_grid::AlignedGrid;

use crate::form::{Form, Span};

/// Identifies one pattern (or clip shape) within a page's arena. Stable for
/// the lifetime of the page; recursive pattern nesting is expressed as a
/// list of these rather than a pointer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u32);

/// Key identifying an augmented mask: the full ancestor-id chain from the
/// pattern whose immediate parent is not its rendering context, down to
/// the pattern being rendered (`patternshape.c`'s `augmented_mask_t::ids`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AugmentedMaskKey(pub Vec<PatternId>);

/// Page-scoped store of pattern-shape forms: one set of per-band forms per
/// plain [`PatternId`], plus a side table of augmented masks keyed by
/// ancestor chain for patterns whose recursive context isn't their
/// immediate parent.
#[derive(Debug, Default)]
pub struct PatternArena {
    next_id: u32,
    /// `(pattern, band) -> form`, immutable and shared once built.
    forms: HashMap<(PatternId, u32), Arc<Form>>,
    augmented: HashMap<(AugmentedMaskKey, u32), Arc<Form>>,
}

impl PatternArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh pattern id.
    pub fn new_pattern(&mut self) -> PatternId {
        let id = PatternId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Rasterizes (picking the cheaper of bitmap/span-list) and stores the
    /// form for one band of a plain (non-augmented) pattern, returning the
    /// shared handle.
    pub fn set_band_form(
        &mut self,
        id: PatternId,
        band: u32,
        bitmap: AlignedGrid<u8>,
        spans: Vec<Span>,
    ) -> Arc<Form> {
        let form = Arc::new(Form::smaller_of(bitmap, spans));
        self.forms.insert((id, band), form.clone());
        form
    }

    /// Looks up a previously built band form.
    pub fn band_form(&self, id: PatternId, band: u32) -> Option<&Arc<Form>> {
        self.forms.get(&(id, band))
    }

    /// Returns the augmented mask for `key`/`band`, building it with
    /// `compute` only the first time this exact ancestor chain is seen for
    /// this band (`patternshape_findaugmentedmask` /
    /// `patternshape_newaugmentedmask`).
    pub fn build_augmented(
        &mut self,
        key: AugmentedMaskKey,
        band: u32,
        compute: impl FnOnce() -> Form,
    ) -> Arc<Form> {
        self.augmented
            .entry((key, band))
            .or_insert_with(|| Arc::new(compute()))
            .clone()
    }

    /// Looks up an already-built augmented mask without computing one.
    pub fn augmented(&self, key: &AugmentedMaskKey, band: u32) -> Option<&Arc<Form>> {
        self.augmented.get(&(key.clone(), band))
    }

    pub fn augmented_count(&self) -> usize {
        self.augmented.len()
    }

    /// Walks the final render's referenced ancestor-chain keys and deletes
    /// every augmented mask not among them, per `spec.md` §4.4 "the
    /// renderer walks the tree to build intermediate augmented masks, then
    /// deletes the ones not referenced in the final render".
    pub fn prune_unreferenced(&mut self, referenced: &HashSet<AugmentedMaskKey>) {
        self.augmented.retain(|(key, _), _| referenced.contains(key));
    }

    /// Drops every form and augmented mask, releasing their `Arc`s. Called
    /// at page teardown (`spec.md` §4.4 "deletion happens at page
    /// teardown"); any renderer still holding a clone of an `Arc<Form>`
    /// keeps the underlying memory alive until it drops its own handle.
    pub fn clear(&mut self) {
        self.forms.clear();
        self.augmented.clear();
    }
}
