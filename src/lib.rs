//! # typeatlas
//!
//! Glyph-cache and texture-atlas core for text rendering. Given a
//! character code and a target resolution, a [`Font`] returns a reusable
//! rasterized glyph, rasterizing at most once per key and packing glyph
//! bitmaps into an append-only list of shelf-packed texture atlases.
//!
//! ## Architecture
//!
//! ```text
//! Font (facade: hints, caches, atlas list)
//!   │
//!   ├── GlyphCache ── (resolution, code) → Arc<Glyph>
//!   │                 code → Arc<Glyph3D>
//!   │
//!   ├── AtlasList ── GlyphTextureAtlas (shelf packing, GPU slots)
//!   │
//!   └── FontBackend (fixed at construction)
//!         ├── BitmapFontBackend  (builtin 8×8, default font)
//!         └── OutlineFontBackend (font-kit raster + lyon extrusion)
//! ```
//!
//! Cache misses delegate to the backend, which registers the rasterized
//! glyph back through [`Font::add_glyph`]; the glyph image is packed
//! into the first atlas with room (or a new one built from the current
//! hints) and frozen. Shaping, layout, GPU upload, and font discovery
//! are all collaborator concerns outside this crate.
//!
//! - **`glyph`** — immutable glyph value types and their keys.
//! - **`cache`** — the two cache maps and their insert discipline.
//! - **`atlas`** — shelf packing and per-context GPU resource slots.
//! - **`backend`** — the delegation contract.
//! - **`bitmap`** / **`outline`** — the concrete backends.
//! - **`font`** — the facade and the process default font.

pub mod atlas;
pub mod backend;
pub mod bitmap;
pub mod cache;
pub mod font;
pub mod glyph;
pub mod outline;

// Re-exports for ergonomic use.
pub use atlas::{
    AtlasList, AtlasPlacement, AtlasRegion, AtlasSettings, GlyphTextureAtlas, TextureFilter,
    TextureHandle,
};
pub use backend::{FontBackend, GlyphImage};
pub use bitmap::BitmapFontBackend;
pub use cache::GlyphCache;
pub use font::{default_font, Font, FontError, FontHints};
pub use glyph::{FontResolution, Glyph, Glyph3D, GlyphMetrics, KerningType, Vertex3};
pub use outline::OutlineFontBackend;
