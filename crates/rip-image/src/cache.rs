//! Page-scoped, reference-counted sharing of built LUTs across images
//! (`spec.md` §4.3 "Image LUT sharing").

use std::collections::HashMap;
use std::sync::Arc;

use crate::lut::Lut;

/// Bit-for-bit hash key identifying a LUT's construction inputs. `decode`
/// (the color-chain decode array) is compared by value, so two images whose
/// color chain and sampling match exactly share one table regardless of the
/// order they were opened.
#[derive(Debug, Clone, PartialEq)]
pub struct LutKey {
    pub chain_fingerprint: u64,
    pub decode: Vec<f32>,
    pub n_components: u32,
    pub input_bits: u32,
    pub widened: bool,
}

impl LutKey {
    fn bits(&self) -> Vec<u32> {
        self.decode.iter().map(|f| f.to_bits()).collect()
    }
}

impl std::hash::Hash for LutKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.chain_fingerprint.hash(state);
        self.bits().hash(state);
        self.n_components.hash(state);
        self.input_bits.hash(state);
        self.widened.hash(state);
    }
}

impl Eq for LutKey {}

/// A display-list-scoped store of built LUTs. `get_or_build` is the only
/// entry point: a cache hit returns the existing `Arc` (the caller
/// disclaims ownership of a freshly built table by sharing it immediately),
/// a miss builds, stores, and returns one.
#[derive(Default)]
pub struct LutCache {
    table: HashMap<LutKey, Arc<Lut>>,
}

impl LutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, key: LutKey, build: impl FnOnce() -> Lut) -> Arc<Lut> {
        if let Some(existing) = self.table.get(&key) {
            return existing.clone();
        }
        let lut = Arc::new(build());
        self.table.insert(key, lut.clone());
        lut
    }

    pub fn get(&self, key: &LutKey) -> Option<&Arc<Lut>> {
        self.table.get(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Releases every cached LUT, dropping the cache's own reference. Any
    /// expander still holding a clone keeps the table alive until it drops
    /// its handle too (`spec.md` §5 "Image LUTs are similarly page-scoped
    /// and reference-counted").
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fp: u64) -> LutKey {
        LutKey {
            chain_fingerprint: fp,
            decode: vec![0.0, 1.0],
            n_components: 1,
            input_bits: 8,
            widened: false,
        }
    }

    #[test]
    fn identical_keys_share_one_table() {
        let mut cache = LutCache::new();
        let mut builds = 0;
        let a = cache.get_or_build(key(42), || {
            builds += 1;
            Lut::blank(8, 1)
        });
        let b = cache.get_or_build(key(42), || {
            builds += 1;
            Lut::blank(8, 1)
        });
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds, 1);
    }

    #[test]
    fn differing_keys_build_separate_tables() {
        let mut cache = LutCache::new();
        let a = cache.get_or_build(key(1), || Lut::blank(8, 1));
        let b = cache.get_or_build(key(2), || Lut::blank(8, 1));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }
}
