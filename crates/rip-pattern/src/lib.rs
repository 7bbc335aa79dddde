//! Pattern-shape cache, implemented at the interface level summarised in
//! `spec.md` §4.4: the pattern-shape *construction* subsystem itself
//! (`patternshape.c`'s rasterizer) is out of scope, but the cache shape it
//! hands results to — per-band forms, augmented masks for nested pattern
//! contexts, reference-counted immutable sharing — is specified here.
//!
//! Grounded on `patternshape.c`'s `pattern_shape_t`/`augmented_mask_t`: the
//! parent/context/base pointer chase becomes walking a slice of
//! [`PatternId`]s into a [`PatternArena`] (`spec.md` §9 "Cyclic
//! pattern/clip graphs").

mod arena;
mod form;

pub use arena::{AugmentedMaskKey, PatternArena, PatternId};
pub use form::{Form, Span};

#[cfg(test)]
mod tests {
    use super::*;
    use rip_grid::AlignedGrid;

    #[test]
    fn band_form_picks_the_smaller_representation() {
        let mut arena = PatternArena::new();
        let id = arena.new_pattern();

        // A mostly-empty band: span-list (2 spans) beats a 100-byte bitmap.
        let bitmap = AlignedGrid::<u8>::with_alloc_tracker(100, 1, None).unwrap();
        let spans = vec![Span { x: 10, len: 5 }, Span { x: 50, len: 3 }];
        let form = arena.set_band_form(id, 0, bitmap, spans);
        assert!(matches!(form.as_ref(), Form::SpanList(_)));
    }

    #[test]
    fn band_form_picks_bitmap_when_denser() {
        let mut arena = PatternArena::new();
        let id = arena.new_pattern();

        let bitmap = AlignedGrid::<u8>::with_alloc_tracker(4, 1, None).unwrap();
        // 200 tiny spans would cost far more than a 4-byte bitmap.
        let spans: Vec<Span> = (0..200).map(|i| Span { x: i * 2, len: 1 }).collect();
        let form = arena.set_band_form(id, 0, bitmap, spans);
        assert!(matches!(form.as_ref(), Form::Bitmap(_)));
    }

    #[test]
    fn augmented_masks_are_memoized_by_ancestor_list() {
        let mut arena = PatternArena::new();
        let a = arena.new_pattern();
        let b = arena.new_pattern();
        let key = AugmentedMaskKey(vec![a, b]);

        let mut calls = 0;
        let first = arena.build_augmented(key.clone(), 0, || {
            calls += 1;
            Form::SpanList(vec![Span { x: 0, len: 1 }])
        });
        let second = arena.build_augmented(key, 0, || {
            calls += 1;
            Form::SpanList(vec![Span { x: 0, len: 1 }])
        });

        assert_eq!(calls, 1);
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn prune_unreferenced_drops_stale_augmented_masks() {
        let mut arena = PatternArena::new();
        let a = arena.new_pattern();
        let keep = AugmentedMaskKey(vec![a]);
        let drop_me = AugmentedMaskKey(vec![a, a]);

        arena.build_augmented(keep.clone(), 0, || Form::SpanList(vec![]));
        arena.build_augmented(drop_me.clone(), 0, || Form::SpanList(vec![]));
        assert_eq!(arena.augmented_count(), 2);

        let referenced = std::collections::HashSet::from([keep]);
        arena.prune_unreferenced(&referenced);

        assert_eq!(arena.augmented_count(), 1);
    }
}
