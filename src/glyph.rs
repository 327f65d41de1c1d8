//! Glyph value types — immutable rasterization results and their keys.
//!
//! A [`Glyph`] is one character rasterized at one [`FontResolution`]; a
//! [`Glyph3D`] is the same character as extruded outline geometry,
//! independent of resolution. Both are frozen at construction and shared
//! as `Arc`s between the cache and whoever consumes them.

use bytemuck::{Pod, Zeroable};

use crate::atlas::AtlasPlacement;

// ── Font resolution ─────────────────────────────────────────────────

/// Texel dimensions at which glyphs are rasterized.
///
/// Orderable so it can key a `BTreeMap` in the glyph cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontResolution {
    /// Glyph cell width in texels.
    pub width: u32,
    /// Glyph cell height in texels.
    pub height: u32,
}

impl FontResolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ── Kerning ─────────────────────────────────────────────────────────

/// Metric space for kerning queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KerningType {
    /// No spacing adjustment; queries always return zero.
    None,
    /// Em-normalized design-unit space.
    DesignUnits,
    /// Scaled to pixels at the query resolution.
    Pixels,
}

// ── Glyph metrics ───────────────────────────────────────────────────

/// Advance and bearing for one glyph, in pixels at its resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphMetrics {
    /// Horizontal pen advance.
    pub advance: f32,
    /// Offset from the pen position to the bitmap's top-left corner
    /// (x right of pen, y above baseline).
    pub bearing: [f32; 2],
}

// ── Glyph ───────────────────────────────────────────────────────────

/// One character rasterized at one resolution.
///
/// Immutable once built: the bitmap, metrics, and atlas placement are all
/// fixed when the glyph is registered through `Font::add_glyph`.
#[derive(Clone, Debug)]
pub struct Glyph {
    code: char,
    resolution: FontResolution,
    width: u32,
    height: u32,
    /// A8 coverage, row-major, `width * height` bytes. Empty for glyphs
    /// with no ink (e.g. space).
    bitmap: Vec<u8>,
    metrics: GlyphMetrics,
    /// Where the bitmap was packed, if it has any pixels.
    placement: Option<AtlasPlacement>,
}

impl Glyph {
    pub(crate) fn new(
        code: char,
        resolution: FontResolution,
        width: u32,
        height: u32,
        bitmap: Vec<u8>,
        metrics: GlyphMetrics,
        placement: Option<AtlasPlacement>,
    ) -> Self {
        debug_assert_eq!(bitmap.len(), (width * height) as usize);
        Self {
            code,
            resolution,
            width,
            height,
            bitmap,
            metrics,
            placement,
        }
    }

    pub fn code(&self) -> char {
        self.code
    }

    /// The resolution this glyph was cached under (already normalized for
    /// backends without multi-resolution support).
    pub fn resolution(&self) -> FontResolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn metrics(&self) -> GlyphMetrics {
        self.metrics
    }

    pub fn placement(&self) -> Option<AtlasPlacement> {
        self.placement
    }

    /// True for glyphs that advance the pen but carry no pixels.
    pub fn is_blank(&self) -> bool {
        self.bitmap.is_empty()
    }
}

// ── Glyph3D ─────────────────────────────────────────────────────────

/// A 3D mesh vertex. Plain position data, ready for GPU upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex3 {
    pub position: [f32; 3],
}

impl Vertex3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
        }
    }
}

/// One character as extruded outline geometry, resolution-independent.
///
/// Coordinates are in em units (the glyph outline scaled by 1/units-per-em),
/// with the front cap at z = 0 and the back cap at z = -depth. The three
/// index lists all reference the shared `vertices` buffer.
#[derive(Clone, Debug)]
pub struct Glyph3D {
    code: char,
    vertices: Vec<Vertex3>,
    front: Vec<u32>,
    back: Vec<u32>,
    wall: Vec<u32>,
    /// Horizontal advance in em units.
    advance: f32,
}

impl Glyph3D {
    pub(crate) fn new(
        code: char,
        vertices: Vec<Vertex3>,
        front: Vec<u32>,
        back: Vec<u32>,
        wall: Vec<u32>,
        advance: f32,
    ) -> Self {
        Self {
            code,
            vertices,
            front,
            back,
            wall,
            advance,
        }
    }

    pub fn code(&self) -> char {
        self.code
    }

    pub fn vertices(&self) -> &[Vertex3] {
        &self.vertices
    }

    /// Triangle indices for the front cap (z = 0).
    pub fn front_indices(&self) -> &[u32] {
        &self.front
    }

    /// Triangle indices for the back cap (z = -depth), wound opposite to
    /// the front so both faces point outward.
    pub fn back_indices(&self) -> &[u32] {
        &self.back
    }

    /// Triangle indices for the extrusion walls connecting the caps.
    pub fn wall_indices(&self) -> &[u32] {
        &self.wall
    }

    pub fn advance(&self) -> f32 {
        self.advance
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_ordering() {
        let a = FontResolution::new(12, 12);
        let b = FontResolution::new(12, 24);
        let c = FontResolution::new(24, 12);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, FontResolution::new(12, 12));
    }

    #[test]
    fn test_resolution_usable_as_btree_key() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(FontResolution::new(24, 24), "large");
        map.insert(FontResolution::new(12, 12), "small");
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(
            keys,
            vec![FontResolution::new(12, 12), FontResolution::new(24, 24)]
        );
    }

    #[test]
    fn test_blank_glyph() {
        let glyph = Glyph::new(
            ' ',
            FontResolution::new(8, 8),
            0,
            0,
            Vec::new(),
            GlyphMetrics {
                advance: 8.0,
                bearing: [0.0, 0.0],
            },
            None,
        );
        assert!(glyph.is_blank());
        assert!(glyph.placement().is_none());
        assert_eq!(glyph.metrics().advance, 8.0);
    }

    #[test]
    fn test_glyph_accessors() {
        let glyph = Glyph::new(
            'A',
            FontResolution::new(8, 8),
            2,
            2,
            vec![0, 255, 255, 0],
            GlyphMetrics {
                advance: 3.0,
                bearing: [0.0, 2.0],
            },
            None,
        );
        assert_eq!(glyph.code(), 'A');
        assert_eq!(glyph.resolution(), FontResolution::new(8, 8));
        assert_eq!(glyph.bitmap(), &[0, 255, 255, 0]);
        assert!(!glyph.is_blank());
    }

    #[test]
    fn test_vertex3_pod_roundtrip() {
        let verts = [Vertex3::new(0.0, 1.0, -0.5), Vertex3::new(1.0, 0.0, 0.0)];
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 2 * 3 * 4);
        let back: &[Vertex3] = bytemuck::cast_slice(bytes);
        assert_eq!(back, &verts);
    }

    #[test]
    fn test_glyph3d_accessors() {
        let glyph = Glyph3D::new(
            'I',
            vec![
                Vertex3::new(0.0, 0.0, 0.0),
                Vertex3::new(1.0, 0.0, 0.0),
                Vertex3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
            vec![],
            vec![],
            0.5,
        );
        assert_eq!(glyph.code(), 'I');
        assert_eq!(glyph.front_indices(), &[0, 1, 2]);
        assert!(glyph.back_indices().is_empty());
        assert_eq!(glyph.advance(), 0.5);
    }
}
