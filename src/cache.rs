//! Glyph cache — resolution-keyed glyph map plus the resolution-free
//! glyph-3D map.
//!
//! The cache is append-only for the lifetime of its `Font`: entries are
//! never evicted or replaced. Insertion is idempotent — when two callers
//! race to register the same key, the first entry wins and the duplicate
//! is discarded. Locking is the facade's responsibility; this type is
//! plain data behind `Font`'s cache mutex.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::glyph::{FontResolution, Glyph, Glyph3D};

/// Per-font glyph store keyed by (resolution, character code).
#[derive(Debug, Default)]
pub struct GlyphCache {
    /// Resolution → code → glyph. `BTreeMap` because resolutions are
    /// totally ordered; the inner map is a plain hash map.
    glyphs: BTreeMap<FontResolution, HashMap<char, Arc<Glyph>>>,
    /// Code → extruded geometry, independent of resolution.
    glyphs3d: HashMap<char, Arc<Glyph3D>>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a glyph. The resolution must already be normalized by the
    /// facade for backends without multi-resolution support.
    pub fn get(&self, resolution: FontResolution, code: char) -> Option<Arc<Glyph>> {
        self.glyphs.get(&resolution)?.get(&code).cloned()
    }

    pub fn get3d(&self, code: char) -> Option<Arc<Glyph3D>> {
        self.glyphs3d.get(&code).cloned()
    }

    /// Idempotent insert: if the key is already occupied, the existing
    /// glyph is kept and returned and `glyph` is dropped.
    pub fn insert(
        &mut self,
        resolution: FontResolution,
        code: char,
        glyph: Arc<Glyph>,
    ) -> Arc<Glyph> {
        self.glyphs
            .entry(resolution)
            .or_default()
            .entry(code)
            .or_insert(glyph)
            .clone()
    }

    /// Idempotent insert for the glyph-3D map.
    pub fn insert3d(&mut self, code: char, glyph: Arc<Glyph3D>) -> Arc<Glyph3D> {
        self.glyphs3d.entry(code).or_insert(glyph).clone()
    }

    /// Total number of cached 2D glyphs across all resolutions.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.values().map(HashMap::len).sum()
    }

    pub fn glyph3d_count(&self) -> usize {
        self.glyphs3d.len()
    }

    /// Number of distinct resolutions with at least one cached glyph.
    pub fn resolution_count(&self) -> usize {
        self.glyphs.len()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::GlyphMetrics;

    fn test_glyph(code: char, res: FontResolution) -> Arc<Glyph> {
        Arc::new(Glyph::new(
            code,
            res,
            1,
            1,
            vec![255],
            GlyphMetrics::default(),
            None,
        ))
    }

    #[test]
    fn test_empty_cache() {
        let cache = GlyphCache::new();
        assert!(cache.get(FontResolution::new(8, 8), 'A').is_none());
        assert!(cache.get3d('A').is_none());
        assert_eq!(cache.glyph_count(), 0);
        assert_eq!(cache.resolution_count(), 0);
    }

    #[test]
    fn test_insert_then_get() {
        let mut cache = GlyphCache::new();
        let res = FontResolution::new(12, 12);
        let glyph = test_glyph('A', res);
        cache.insert(res, 'A', glyph.clone());

        let hit = cache.get(res, 'A').expect("inserted glyph");
        assert!(Arc::ptr_eq(&hit, &glyph));
        assert_eq!(cache.glyph_count(), 1);
    }

    #[test]
    fn test_insert_is_idempotent_first_wins() {
        let mut cache = GlyphCache::new();
        let res = FontResolution::new(12, 12);
        let first = test_glyph('A', res);
        let second = test_glyph('A', res);

        let winner = cache.insert(res, 'A', first.clone());
        assert!(Arc::ptr_eq(&winner, &first));

        // The duplicate is discarded, the first entry survives.
        let winner = cache.insert(res, 'A', second);
        assert!(Arc::ptr_eq(&winner, &first));
        assert_eq!(cache.glyph_count(), 1);
    }

    #[test]
    fn test_distinct_resolutions_are_distinct_keys() {
        let mut cache = GlyphCache::new();
        let small = FontResolution::new(12, 12);
        let large = FontResolution::new(24, 24);
        cache.insert(small, 'A', test_glyph('A', small));
        cache.insert(large, 'A', test_glyph('A', large));

        assert_eq!(cache.glyph_count(), 2);
        assert_eq!(cache.resolution_count(), 2);
        let a = cache.get(small, 'A').unwrap();
        let b = cache.get(large, 'A').unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_glyph3d_map_is_resolution_free() {
        let mut cache = GlyphCache::new();
        let glyph = Arc::new(Glyph3D::new('B', vec![], vec![], vec![], vec![], 0.6));
        let first = cache.insert3d('B', glyph.clone());
        assert!(Arc::ptr_eq(&first, &glyph));

        let dup = Arc::new(Glyph3D::new('B', vec![], vec![], vec![], vec![], 0.7));
        let winner = cache.insert3d('B', dup);
        assert!(Arc::ptr_eq(&winner, &glyph));
        assert_eq!(cache.glyph3d_count(), 1);
    }
}
