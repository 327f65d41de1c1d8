//! The delegation contract between a `Font` and its rasterization
//! backend.
//!
//! A backend is chosen once at font construction and fixed for the font's
//! lifetime. It carries no back-pointer to its owner: the facade passes
//! itself into each rasterization call, and the backend registers results
//! through `Font::add_glyph` / `Font::add_glyph3d`. The facade never
//! holds its cache lock across these calls, so that reentrant
//! registration path cannot deadlock.

use std::sync::Arc;

use crate::font::Font;
use crate::glyph::{FontResolution, Glyph, Glyph3D, GlyphMetrics, KerningType};

/// Raw rasterization output handed to `Font::add_glyph`, which packs the
/// bitmap into an atlas and freezes the final [`Glyph`].
#[derive(Clone, Debug)]
pub struct GlyphImage {
    pub width: u32,
    pub height: u32,
    /// A8 coverage, row-major. Empty for glyphs with no ink.
    pub bitmap: Vec<u8>,
    pub metrics: GlyphMetrics,
}

impl GlyphImage {
    /// An ink-less glyph that only advances the pen.
    pub fn blank(advance: f32) -> Self {
        Self {
            width: 0,
            height: 0,
            bitmap: Vec::new(),
            metrics: GlyphMetrics {
                advance,
                bearing: [0.0, 0.0],
            },
        }
    }
}

/// Rasterization backend bound to one `Font`.
pub trait FontBackend: Send + Sync {
    /// Identity of the underlying font source (file name or a builtin
    /// label).
    fn file_name(&self) -> &str;

    /// Whether the backend can rasterize at arbitrary resolutions. When
    /// `false`, every cache lookup and insertion collapses onto
    /// [`native_resolution`](Self::native_resolution).
    fn supports_multiple_resolutions(&self) -> bool;

    /// The canonical resolution used when multi-resolution is
    /// unsupported.
    fn native_resolution(&self) -> FontResolution;

    /// Rasterize one character and register it through
    /// `font.add_glyph`. Returns `None` for codes the backend cannot
    /// represent; the facade propagates that to the caller unchanged.
    fn rasterize_glyph(
        &self,
        font: &Font,
        resolution: FontResolution,
        code: char,
    ) -> Option<Arc<Glyph>>;

    /// Build extruded outline geometry for one character and register it
    /// through `font.add_glyph3d`. `None` when the backend has no outline
    /// data (e.g. bitmap fonts).
    fn rasterize_glyph3d(&self, font: &Font, code: char) -> Option<Arc<Glyph3D>>;

    /// Spacing adjustment between a pair of characters in the requested
    /// metric space. `resolution` scales [`KerningType::Pixels`] results;
    /// design-unit results ignore it. Backends without kerning data
    /// return zero.
    fn kerning(
        &self,
        left: char,
        right: char,
        kerning: KerningType,
        resolution: FontResolution,
    ) -> [f32; 2] {
        let _ = (left, right, kerning, resolution);
        [0.0, 0.0]
    }

    /// Whether the backend carries vertical-writing metrics.
    fn supports_vertical(&self) -> bool {
        false
    }

    /// Ascender above the baseline, if the backend knows it.
    fn ascender(&self) -> Option<f32> {
        None
    }

    /// Descender below the baseline (negative), if the backend knows it.
    fn descender(&self) -> Option<f32> {
        None
    }
}
