//! Glyph texture atlases — shelf-packed A8 images plus the per-context
//! GPU resource slots that back them.
//!
//! Packing is row-based "shelf" allocation: each shelf's height is set by
//! the tallest glyph placed on it, and a glyph that doesn't fit any open
//! shelf starts a new one. Glyphs are separated by a margin (fixed texels
//! plus a ratio of the glyph size) so filtered sampling doesn't bleed
//! between neighbors.
//!
//! Atlas dimensions, margins, and filter hints are frozen into
//! [`AtlasSettings`] when the atlas is created; changing hints on the
//! owning `Font` afterward only affects atlases created later.

use uuid::Uuid;

// ── Settings & filters ──────────────────────────────────────────────

/// Texture sampling filter hint, recorded per atlas for the uploader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Immutable per-atlas configuration, snapshotted from the font's hints
/// at the moment the atlas is allocated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasSettings {
    /// Atlas width in texels.
    pub width: u32,
    /// Atlas height in texels.
    pub height: u32,
    /// Fixed inter-glyph margin in texels.
    pub margin: u32,
    /// Additional margin as a ratio of the glyph's larger dimension.
    pub margin_ratio: f32,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl AtlasSettings {
    /// Effective margin for a glyph of the given size.
    pub fn margin_for(&self, width: u32, height: u32) -> u32 {
        let ratio = self.margin_ratio * width.max(height) as f32;
        self.margin + ratio.round() as u32
    }
}

// ── Regions & placements ────────────────────────────────────────────

/// A region within an atlas texture, normalized to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

/// Which atlas a glyph landed in, and where.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasPlacement {
    /// Index into the owning font's atlas list.
    pub atlas_index: usize,
    pub region: AtlasRegion,
}

/// Pixel-space rectangle within the atlas.
#[derive(Clone, Copy, Debug)]
struct AtlasRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Shelf (row) in the atlas.
#[derive(Debug)]
struct Shelf {
    /// Y offset of this shelf.
    y: u32,
    /// Height of this shelf (tallest glyph placed on it).
    height: u32,
    /// Next free X position.
    cursor_x: u32,
}

// ── GPU resource slots ──────────────────────────────────────────────

/// Opaque identity of one GPU texture object. The upload itself belongs
/// to the rendering layer; this core only tracks residency per context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(Uuid);

impl TextureHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

// ── Atlas ───────────────────────────────────────────────────────────

/// One shelf-packed A8 glyph image with per-context GPU slots.
#[derive(Debug)]
pub struct GlyphTextureAtlas {
    settings: AtlasSettings,
    /// A8 coverage, `width * height` bytes.
    data: Vec<u8>,
    /// Whether `data` changed since the last upload.
    dirty: bool,
    shelves: Vec<Shelf>,
    /// One slot per rendering context, sized by `resize_gpu_buffers`.
    gpu_slots: Vec<Option<TextureHandle>>,
}

impl GlyphTextureAtlas {
    pub fn new(settings: AtlasSettings) -> Self {
        log::debug!(
            "allocating {}x{} glyph atlas (margin {} + ratio {})",
            settings.width,
            settings.height,
            settings.margin,
            settings.margin_ratio,
        );
        let pixel_count = (settings.width as usize) * (settings.height as usize);
        Self {
            settings,
            data: vec![0u8; pixel_count],
            dirty: false,
            shelves: Vec::new(),
            gpu_slots: Vec::new(),
        }
    }

    /// The configuration frozen at creation time.
    pub fn settings(&self) -> AtlasSettings {
        self.settings
    }

    pub fn width(&self) -> u32 {
        self.settings.width
    }

    pub fn height(&self) -> u32 {
        self.settings.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the uploader once `data` has been pushed to the GPU.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Try to pack a glyph bitmap, returning its region on success or
    /// `None` if no free space remains.
    pub fn try_insert(&mut self, width: u32, height: u32, bitmap: &[u8]) -> Option<AtlasRegion> {
        let rect = self.allocate(width, height)?;
        self.blit(&rect, bitmap);
        self.dirty = true;
        Some(self.rect_to_region(&rect))
    }

    /// Allocate a rect using shelf packing, honoring the frozen margin.
    fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRect> {
        let margin = self.settings.margin_for(width, height);
        let padded_w = width + margin;
        let padded_h = height + margin;

        // Try existing shelves first.
        for shelf in &mut self.shelves {
            if shelf.height >= padded_h && shelf.cursor_x + padded_w <= self.settings.width {
                let rect = AtlasRect {
                    x: shelf.cursor_x,
                    y: shelf.y,
                    width,
                    height,
                };
                shelf.cursor_x += padded_w;
                return Some(rect);
            }
        }

        // Start a new shelf.
        let shelf_y = self.shelves.last().map(|s| s.y + s.height).unwrap_or(0);
        if shelf_y + padded_h > self.settings.height || padded_w > self.settings.width {
            return None; // Atlas full, or glyph wider than the atlas.
        }

        let rect = AtlasRect {
            x: 0,
            y: shelf_y,
            width,
            height,
        };
        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: padded_w,
        });
        Some(rect)
    }

    fn blit(&mut self, rect: &AtlasRect, bitmap: &[u8]) {
        let atlas_w = self.settings.width as usize;
        let w = rect.width as usize;
        for row in 0..rect.height as usize {
            let src = row * w;
            let dst = (rect.y as usize + row) * atlas_w + rect.x as usize;
            self.data[dst..dst + w].copy_from_slice(&bitmap[src..src + w]);
        }
    }

    fn rect_to_region(&self, rect: &AtlasRect) -> AtlasRegion {
        let inv_w = 1.0 / self.settings.width as f32;
        let inv_h = 1.0 / self.settings.height as f32;
        AtlasRegion {
            u_min: rect.x as f32 * inv_w,
            v_min: rect.y as f32 * inv_h,
            u_max: (rect.x + rect.width) as f32 * inv_w,
            v_max: (rect.y + rect.height) as f32 * inv_h,
        }
    }

    // ── GPU slot lifecycle ──────────────────────────────────────────

    /// Resize the per-context slot arena. Growing is always honored;
    /// shrinking never drops below the highest context that still holds
    /// a live handle. Safe to call repeatedly.
    pub fn resize_gpu_buffers(&mut self, max_contexts: usize) {
        let floor = self
            .gpu_slots
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |i| i + 1);
        self.gpu_slots.resize(max_contexts.max(floor), None);
    }

    /// Release the texture handle for one context, or for all contexts
    /// when `context` is `None`. Idempotent.
    pub fn release_gpu_objects(&mut self, context: Option<usize>) {
        match context {
            Some(index) => {
                if let Some(slot) = self.gpu_slots.get_mut(index) {
                    *slot = None;
                }
            }
            None => {
                for slot in &mut self.gpu_slots {
                    *slot = None;
                }
            }
        }
    }

    /// Lazily materialize a handle for a context. Returns `None` only if
    /// the context index is beyond the current slot count.
    pub fn acquire_gpu_handle(&mut self, context: usize) -> Option<TextureHandle> {
        let slot = self.gpu_slots.get_mut(context)?;
        if slot.is_none() {
            *slot = Some(TextureHandle::new());
        }
        *slot
    }

    /// The handle currently resident for a context, if any.
    pub fn gpu_handle(&self, context: usize) -> Option<TextureHandle> {
        self.gpu_slots.get(context).copied().flatten()
    }

    /// Number of context slots currently allocated.
    pub fn context_count(&self) -> usize {
        self.gpu_slots.len()
    }
}

// ── Atlas list ──────────────────────────────────────────────────────

/// Ordered collection of atlases; grows by appending.
#[derive(Debug, Default)]
pub struct AtlasList {
    atlases: Vec<GlyphTextureAtlas>,
}

impl AtlasList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack a glyph bitmap: first fit into an existing atlas, otherwise
    /// append a new atlas built from `settings` (grown if the glyph plus
    /// its margin exceeds the hinted dimensions).
    pub fn pack(
        &mut self,
        width: u32,
        height: u32,
        bitmap: &[u8],
        settings: &AtlasSettings,
    ) -> AtlasPlacement {
        for (atlas_index, atlas) in self.atlases.iter_mut().enumerate() {
            if let Some(region) = atlas.try_insert(width, height, bitmap) {
                return AtlasPlacement {
                    atlas_index,
                    region,
                };
            }
        }

        // Nothing fits; allocate a fresh atlas from the current hints,
        // sized up if the glyph alone overflows them.
        let margin = settings.margin_for(width, height);
        let new_settings = AtlasSettings {
            width: settings.width.max(width + 2 * margin),
            height: settings.height.max(height + 2 * margin),
            ..*settings
        };
        let mut atlas = GlyphTextureAtlas::new(new_settings);
        let region = atlas
            .try_insert(width, height, bitmap)
            .unwrap_or_else(|| unreachable!("fresh atlas sized to fit the glyph"));
        self.atlases.push(atlas);
        AtlasPlacement {
            atlas_index: self.atlases.len() - 1,
            region,
        }
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GlyphTextureAtlas> {
        self.atlases.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut GlyphTextureAtlas> {
        self.atlases.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlyphTextureAtlas> {
        self.atlases.iter()
    }

    /// Propagate the per-context slot count to every atlas.
    pub fn resize_gpu_buffers(&mut self, max_contexts: usize) {
        for atlas in &mut self.atlases {
            atlas.resize_gpu_buffers(max_contexts);
        }
    }

    /// Release GPU handles on every atlas for one context, or all.
    pub fn release_gpu_objects(&mut self, context: Option<usize>) {
        for atlas in &mut self.atlases {
            atlas.release_gpu_objects(context);
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
