//! Font facade — owns the glyph cache, the atlas list, the hint state,
//! and the rasterization backend; exposes the unified lookup contract.
//!
//! ## Lookup protocol
//!
//! ```text
//! get_glyph(resolution, code)
//!     │  normalize resolution (single-resolution backends collapse
//!     │  onto their native entry)
//!     ▼
//! GlyphCache ── hit ──► Arc<Glyph>
//!     │ miss
//!     ▼
//! FontBackend::rasterize_glyph(&font, …)
//!     │  backend registers the result back through add_glyph,
//!     │  which packs the bitmap into an atlas
//!     ▼
//! Arc<Glyph> (or None for codes the backend cannot represent)
//! ```
//!
//! The cache lock is never held across the backend call, so the
//! reentrant registration path cannot deadlock. Two threads missing on
//! the same key may both rasterize; `add_glyph` is idempotent and the
//! first insertion wins.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use thiserror::Error;

use crate::atlas::{AtlasList, AtlasSettings, TextureFilter};
use crate::backend::{FontBackend, GlyphImage};
use crate::bitmap::BitmapFontBackend;
use crate::cache::GlyphCache;
use crate::glyph::{FontResolution, Glyph, Glyph3D, KerningType};
use crate::outline::OutlineFontBackend;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to load font from {path}")]
    Load {
        path: String,
        #[source]
        source: font_kit::error::FontLoadingError,
    },
}

// ── Hints ───────────────────────────────────────────────────────────

/// Mutable rendering hints. Atlas-related hints are snapshotted into
/// frozen `AtlasSettings` when an atlas is created, so changing them
/// only affects atlases allocated afterward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontHints {
    /// Fixed inter-glyph atlas margin in texels.
    pub glyph_image_margin: u32,
    /// Additional margin as a ratio of the glyph's larger dimension.
    pub glyph_image_margin_ratio: f32,
    /// Width of newly created atlases.
    pub texture_width_hint: u32,
    /// Height of newly created atlases.
    pub texture_height_hint: u32,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    /// Extrusion depth for 3D glyphs, in em units.
    pub depth: f32,
    /// Samples per outline curve segment when flattening for extrusion
    /// walls.
    pub curve_samples: u32,
}

impl Default for FontHints {
    fn default() -> Self {
        Self {
            glyph_image_margin: 1,
            glyph_image_margin_ratio: 0.02,
            texture_width_hint: 1024,
            texture_height_hint: 1024,
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
            depth: 0.1,
            curve_samples: 10,
        }
    }
}

// ── Font ────────────────────────────────────────────────────────────

/// The cache owner. Shared per-font state (both cache maps, the atlas
/// list, the hints) each sit behind their own mutex; the backend is
/// fixed at construction.
pub struct Font {
    backend: Arc<dyn FontBackend>,
    cache: Mutex<GlyphCache>,
    atlases: Mutex<AtlasList>,
    hints: Mutex<FontHints>,
}

impl Font {
    /// Construct a font over an already-built backend.
    pub fn new(backend: Arc<dyn FontBackend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(GlyphCache::new()),
            atlases: Mutex::new(AtlasList::new()),
            hints: Mutex::new(FontHints::default()),
        }
    }

    /// Load an outline font file and bind it as this font's backend.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        Ok(Self::new(Arc::new(OutlineFontBackend::from_file(path)?)))
    }

    /// Load an in-memory outline font and bind it as this font's
    /// backend. `name` is used for identity and diagnostics.
    pub fn from_bytes(data: Vec<u8>, name: &str) -> Result<Self, FontError> {
        Ok(Self::new(Arc::new(OutlineFontBackend::from_bytes(data, name)?)))
    }

    pub fn backend(&self) -> &Arc<dyn FontBackend> {
        &self.backend
    }

    pub fn file_name(&self) -> &str {
        self.backend.file_name()
    }

    /// Collapse the requested resolution onto the backend's canonical
    /// entry when it cannot rasterize at arbitrary resolutions.
    fn normalize_resolution(&self, resolution: FontResolution) -> FontResolution {
        if self.backend.supports_multiple_resolutions() {
            resolution
        } else {
            self.backend.native_resolution()
        }
    }

    // ── Glyph lookup ────────────────────────────────────────────────

    /// Look up a glyph, rasterizing on first use. Returns `None` for
    /// codes the backend cannot represent — permanently, on every call,
    /// without error. The negative result is not cached; the backend's
    /// miss path is a cheap table probe.
    pub fn get_glyph(&self, resolution: FontResolution, code: char) -> Option<Arc<Glyph>> {
        let resolution = self.normalize_resolution(resolution);
        if let Some(glyph) = self.cache.lock().unwrap().get(resolution, code) {
            return Some(glyph);
        }
        // Miss: rasterize outside the cache lock. The backend registers
        // the result through add_glyph; concurrent misses on the same
        // key may each rasterize, and the first insertion wins.
        self.backend.rasterize_glyph(self, resolution, code)
    }

    /// Look up extruded 3D geometry, building it on first use. Same
    /// contract as [`get_glyph`](Self::get_glyph), keyed only by code.
    pub fn get_glyph3d(&self, code: char) -> Option<Arc<Glyph3D>> {
        if let Some(glyph) = self.cache.lock().unwrap().get3d(code) {
            return Some(glyph);
        }
        self.backend.rasterize_glyph3d(self, code)
    }

    /// Registration primitive used by backends (reentrantly, during
    /// `get_glyph`) and by direct callers. Packs the bitmap into an
    /// atlas, freezes the glyph, and inserts it idempotently — if the
    /// key is already cached the existing glyph is returned and the new
    /// one discarded.
    pub fn add_glyph(
        &self,
        resolution: FontResolution,
        code: char,
        image: GlyphImage,
    ) -> Arc<Glyph> {
        let resolution = self.normalize_resolution(resolution);

        let placement = if image.width == 0 || image.height == 0 {
            None
        } else {
            let settings = self.atlas_settings();
            let mut atlases = self.atlases.lock().unwrap();
            Some(atlases.pack(image.width, image.height, &image.bitmap, &settings))
        };

        let glyph = Arc::new(Glyph::new(
            code,
            resolution,
            image.width,
            image.height,
            image.bitmap,
            image.metrics,
            placement,
        ));
        self.cache.lock().unwrap().insert(resolution, code, glyph)
    }

    /// Registration primitive for 3D glyphs, same discipline as
    /// [`add_glyph`](Self::add_glyph).
    pub fn add_glyph3d(&self, code: char, glyph: Glyph3D) -> Arc<Glyph3D> {
        self.cache.lock().unwrap().insert3d(code, Arc::new(glyph))
    }

    /// Number of cached 2D glyphs.
    pub fn glyph_count(&self) -> usize {
        self.cache.lock().unwrap().glyph_count()
    }

    // ── Metrics delegation ──────────────────────────────────────────

    /// Kerning adjustment between two characters at the given resolution
    /// (normalized the same way as glyph lookups). `KerningType::None`
    /// short-circuits to zero without consulting the backend.
    pub fn get_kerning(
        &self,
        resolution: FontResolution,
        left: char,
        right: char,
        kerning: KerningType,
    ) -> [f32; 2] {
        match kerning {
            KerningType::None => [0.0, 0.0],
            _ => self
                .backend
                .kerning(left, right, kerning, self.normalize_resolution(resolution)),
        }
    }

    pub fn supports_vertical(&self) -> bool {
        self.backend.supports_vertical()
    }

    /// Ascender above the baseline, when the backend knows it.
    pub fn ascender(&self) -> Option<f32> {
        self.backend.ascender()
    }

    /// Descender below the baseline (negative), when the backend knows
    /// it.
    pub fn descender(&self) -> Option<f32> {
        self.backend.descender()
    }

    // ── Hint state ──────────────────────────────────────────────────

    /// Snapshot the atlas-relevant hints into frozen settings for a new
    /// atlas.
    fn atlas_settings(&self) -> AtlasSettings {
        let hints = self.hints.lock().unwrap();
        AtlasSettings {
            width: hints.texture_width_hint,
            height: hints.texture_height_hint,
            margin: hints.glyph_image_margin,
            margin_ratio: hints.glyph_image_margin_ratio,
            min_filter: hints.min_filter,
            mag_filter: hints.mag_filter,
        }
    }

    pub fn hints(&self) -> FontHints {
        *self.hints.lock().unwrap()
    }

    pub fn set_glyph_image_margin(&self, margin: u32) {
        self.hints.lock().unwrap().glyph_image_margin = margin;
    }

    pub fn set_glyph_image_margin_ratio(&self, ratio: f32) {
        self.hints.lock().unwrap().glyph_image_margin_ratio = ratio;
    }

    pub fn set_texture_size_hint(&self, width: u32, height: u32) {
        let mut hints = self.hints.lock().unwrap();
        hints.texture_width_hint = width;
        hints.texture_height_hint = height;
    }

    pub fn set_min_filter_hint(&self, filter: TextureFilter) {
        self.hints.lock().unwrap().min_filter = filter;
    }

    pub fn set_mag_filter_hint(&self, filter: TextureFilter) {
        self.hints.lock().unwrap().mag_filter = filter;
    }

    /// Extrusion depth used by subsequently built 3D glyphs, em units.
    pub fn set_depth_hint(&self, depth: f32) {
        self.hints.lock().unwrap().depth = depth;
    }

    pub fn depth_hint(&self) -> f32 {
        self.hints.lock().unwrap().depth
    }

    pub fn set_curve_samples_hint(&self, samples: u32) {
        self.hints.lock().unwrap().curve_samples = samples;
    }

    pub fn curve_samples_hint(&self) -> u32 {
        self.hints.lock().unwrap().curve_samples
    }

    // ── Atlas & GPU resource lifecycle ──────────────────────────────

    /// Access the atlas list, e.g. for upload by the rendering layer.
    /// Must not be held across calls back into this font.
    pub fn atlases(&self) -> MutexGuard<'_, AtlasList> {
        self.atlases.lock().unwrap()
    }

    pub fn atlas_count(&self) -> usize {
        self.atlases.lock().unwrap().len()
    }

    /// Propagate a per-rendering-context resource-slot count to every
    /// atlas. Safe to call repeatedly; never shrinks below live slots.
    pub fn resize_gpu_buffers(&self, max_contexts: usize) {
        self.atlases.lock().unwrap().resize_gpu_buffers(max_contexts);
    }

    /// Release GPU handles for one context, or all contexts when
    /// `context` is `None`. Idempotent.
    pub fn release_gpu_objects(&self, context: Option<usize>) {
        self.atlases.lock().unwrap().release_gpu_objects(context);
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("file_name", &self.file_name())
            .field("glyphs", &self.glyph_count())
            .field("atlases", &self.atlas_count())
            .finish()
    }
}

// ── Default font ────────────────────────────────────────────────────

static DEFAULT_FONT: OnceLock<Arc<Font>> = OnceLock::new();

/// The process-wide shared default font, constructed over the built-in
/// bitmap backend on first access and reused for the rest of the
/// process lifetime. Concurrent first access constructs exactly one
/// instance.
pub fn default_font() -> Arc<Font> {
    DEFAULT_FONT
        .get_or_init(|| {
            log::info!("constructing process default font (builtin 8x8 bitmap backend)");
            Arc::new(Font::new(Arc::new(BitmapFontBackend::new())))
        })
        .clone()
}

// ===================================================================
// Tests
// ===================================================================
