//! Outline backend — rasterizes glyphs from a font file via `font-kit`
//! and builds extruded [`Glyph3D`] geometry from the glyph outlines.
//!
//! Raster glyphs are drawn onto an A8 canvas at
//! `point_size = resolution.height`. 3D glyphs walk the outline through
//! an [`OutlineSink`], tessellating front/back caps with lyon and
//! extruding walls from the flattened contours. Outline coordinates are
//! scaled to em units (1/units-per-em), so 3D geometry is
//! resolution-independent.
//!
//! `font_kit::font::Font` wraps raw loader handles (an `FT_Face` under
//! freetype) and is neither `Send` nor `Sync`, so it lives in a
//! [`SyncFont`] that serializes every access through a mutex.

use std::path::Path;
use std::sync::{Arc, Mutex};

use font_kit::canvas::{Canvas, Format, RasterizationOptions};
use font_kit::font::Font as FkFont;
use font_kit::hinting::HintingOptions;
use font_kit::outline::OutlineSink;
use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use lyon::math::point;
use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::Vector2F;

use crate::backend::{FontBackend, GlyphImage};
use crate::font::{Font, FontError};
use crate::glyph::{FontResolution, Glyph, Glyph3D, GlyphMetrics, Vertex3};

/// Thread-safe holder for the loader handle. `FkFont` is `!Send` on the
/// freetype platform (it owns an `FT_Face` pointer), so the wrapper
/// asserts thread safety itself: the handle is constructed here, never
/// leaks a reference past the guard, and every use goes through
/// [`SyncFont::lock`].
struct SyncFont(Mutex<FkFont>);

// SAFETY: the inner `FkFont` is only reachable through the mutex, so
// all loader calls are serialized and the raw handle never races.
unsafe impl Send for SyncFont {}
// SAFETY: as above; shared references only hand out the lock.
unsafe impl Sync for SyncFont {}

impl SyncFont {
    fn new(font: FkFont) -> Self {
        Self(Mutex::new(font))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FkFont> {
        self.0.lock().unwrap()
    }
}

/// Backend over a loaded outline font (TrueType/OpenType via font-kit).
pub struct OutlineFontBackend {
    font: SyncFont,
    file_name: String,
}

impl OutlineFontBackend {
    /// Load the first face of a font file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref();
        let font = FkFont::from_path(path, 0).map_err(|source| FontError::Load {
            path: path.display().to_string(),
            source,
        })?;
        log::info!(
            "loaded outline font '{}' from {}",
            font.full_name(),
            path.display()
        );
        Ok(Self {
            font: SyncFont::new(font),
            file_name: path.display().to_string(),
        })
    }

    /// Load the first face from an in-memory font file.
    pub fn from_bytes(data: Vec<u8>, name: &str) -> Result<Self, FontError> {
        let font = FkFont::from_bytes(Arc::new(data), 0).map_err(|source| FontError::Load {
            path: name.to_string(),
            source,
        })?;
        log::info!("loaded outline font '{}' from memory", font.full_name());
        Ok(Self {
            font: SyncFont::new(font),
            file_name: name.to_string(),
        })
    }
}

impl FontBackend for OutlineFontBackend {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn supports_multiple_resolutions(&self) -> bool {
        true
    }

    fn native_resolution(&self) -> FontResolution {
        FontResolution::new(32, 32)
    }

    fn rasterize_glyph(
        &self,
        font: &Font,
        resolution: FontResolution,
        code: char,
    ) -> Option<Arc<Glyph>> {
        let fk = self.font.lock();
        let glyph_id = fk.glyph_for_char(code)?;
        let point_size = resolution.height as f32;
        let upem = fk.metrics().units_per_em as f32;
        let advance = fk.advance(glyph_id).ok()?.x() * point_size / upem;

        let bounds = fk
            .raster_bounds(
                glyph_id,
                point_size,
                Transform2F::default(),
                HintingOptions::None,
                RasterizationOptions::GrayscaleAa,
            )
            .ok()?;

        let image = if bounds.width() <= 0 || bounds.height() <= 0 {
            GlyphImage::blank(advance)
        } else {
            let mut canvas = Canvas::new(bounds.size(), Format::A8);
            fk.rasterize_glyph(
                &mut canvas,
                glyph_id,
                point_size,
                Transform2F::from_translation(-bounds.origin().to_f32()),
                HintingOptions::None,
                RasterizationOptions::GrayscaleAa,
            )
            .ok()?;

            // The canvas stride can exceed the glyph width; repack rows.
            let width = bounds.width() as u32;
            let height = bounds.height() as u32;
            let mut bitmap = vec![0u8; (width * height) as usize];
            for row in 0..height as usize {
                let src = row * canvas.stride;
                let dst = row * width as usize;
                bitmap[dst..dst + width as usize]
                    .copy_from_slice(&canvas.pixels[src..src + width as usize]);
            }

            GlyphImage {
                width,
                height,
                bitmap,
                metrics: GlyphMetrics {
                    advance,
                    bearing: [bounds.origin().x() as f32, -bounds.origin().y() as f32],
                },
            }
        };
        drop(fk);

        Some(font.add_glyph(resolution, code, image))
    }

    fn rasterize_glyph3d(&self, font: &Font, code: char) -> Option<Arc<Glyph3D>> {
        let fk = self.font.lock();
        let glyph_id = fk.glyph_for_char(code)?;
        let upem = fk.metrics().units_per_em as f32;
        let advance = fk.advance(glyph_id).ok()?.x() / upem;

        let mut collector = OutlineCollector::new(1.0 / upem, font.curve_samples_hint());
        fk.outline(glyph_id, HintingOptions::None, &mut collector)
            .ok()?;
        drop(fk);
        let (path, contours) = collector.finish();

        let mut geometry: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
        let mut tessellator = FillTessellator::new();
        let options = FillOptions::default()
            .with_fill_rule(FillRule::NonZero)
            .with_tolerance(0.002);
        let result = tessellator.tessellate(
            path.iter(),
            &options,
            &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        );
        if let Err(err) = result {
            log::warn!("outline tessellation failed for {code:?}: {err:?}");
            return None;
        }

        let depth = font.depth_hint();
        let mut vertices = Vec::with_capacity(geometry.vertices.len() * 2);

        // Front cap at z = 0, back cap at z = -depth with reversed winding.
        for &[x, y] in &geometry.vertices {
            vertices.push(Vertex3::new(x, y, 0.0));
        }
        let back_base = vertices.len() as u32;
        for &[x, y] in &geometry.vertices {
            vertices.push(Vertex3::new(x, y, -depth));
        }
        let front = geometry.indices.clone();
        let mut back = Vec::with_capacity(front.len());
        for tri in geometry.indices.chunks_exact(3) {
            back.extend_from_slice(&[
                back_base + tri[0],
                back_base + tri[2],
                back_base + tri[1],
            ]);
        }

        // Walls: one quad (two triangles) per flattened contour segment,
        // joining the z = 0 ring to the z = -depth ring.
        let mut wall = Vec::new();
        for contour in &contours {
            let ring_base = vertices.len() as u32;
            let n = contour.len() as u32;
            for &[x, y] in contour {
                vertices.push(Vertex3::new(x, y, 0.0));
            }
            for &[x, y] in contour {
                vertices.push(Vertex3::new(x, y, -depth));
            }
            for i in 0..n {
                let j = (i + 1) % n;
                let (f0, f1) = (ring_base + i, ring_base + j);
                let (b0, b1) = (ring_base + n + i, ring_base + n + j);
                wall.extend_from_slice(&[f0, f1, b1, f0, b1, b0]);
            }
        }

        Some(font.add_glyph3d(code, Glyph3D::new(code, vertices, front, back, wall, advance)))
    }

    fn ascender(&self) -> Option<f32> {
        let fk = self.font.lock();
        let metrics = fk.metrics();
        Some(metrics.ascent / metrics.units_per_em as f32)
    }

    fn descender(&self) -> Option<f32> {
        let fk = self.font.lock();
        let metrics = fk.metrics();
        Some(metrics.descent / metrics.units_per_em as f32)
    }
}

// ── Outline collection ──────────────────────────────────────────────

/// Bridges font-kit's `OutlineSink` to a lyon path (for cap
/// tessellation) while flattening each contour into a polyline ring
/// (for wall extrusion), sampling curves at the font's curve-sample
/// hint.
struct OutlineCollector {
    builder: lyon::path::path::Builder,
    contours: Vec<Vec<[f32; 2]>>,
    current: Vec<[f32; 2]>,
    scale: f32,
    curve_samples: u32,
    open: bool,
}

impl OutlineCollector {
    fn new(scale: f32, curve_samples: u32) -> Self {
        Self {
            builder: lyon::path::Path::builder(),
            contours: Vec::new(),
            current: Vec::new(),
            scale,
            curve_samples: curve_samples.max(1),
            open: false,
        }
    }

    fn scaled(&self, v: Vector2F) -> [f32; 2] {
        [v.x() * self.scale, v.y() * self.scale]
    }

    fn end_contour(&mut self, close: bool) {
        if !self.open {
            return;
        }
        self.builder.end(close);
        self.open = false;

        let mut ring = std::mem::take(&mut self.current);
        // Drop a duplicated closing point so the ring stays clean.
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if close && ring.len() >= 3 {
            self.contours.push(ring);
        }
    }

    /// Finish any open contour and hand back the path and rings.
    fn finish(mut self) -> (lyon::path::Path, Vec<Vec<[f32; 2]>>) {
        self.end_contour(false);
        (self.builder.build(), self.contours)
    }
}

impl OutlineSink for OutlineCollector {
    fn move_to(&mut self, to: Vector2F) {
        self.end_contour(false);
        let p = self.scaled(to);
        self.builder.begin(point(p[0], p[1]));
        self.open = true;
        self.current.push(p);
    }

    fn line_to(&mut self, to: Vector2F) {
        let p = self.scaled(to);
        self.builder.line_to(point(p[0], p[1]));
        self.current.push(p);
    }

    fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F) {
        let c = self.scaled(ctrl);
        let p = self.scaled(to);
        self.builder
            .quadratic_bezier_to(point(c[0], c[1]), point(p[0], p[1]));
        if let Some(&from) = self.current.last() {
            for i in 1..=self.curve_samples {
                let t = i as f32 / self.curve_samples as f32;
                self.current.push(quadratic_at(from, c, p, t));
            }
        }
    }

    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
        let c0 = self.scaled(ctrl.from());
        let c1 = self.scaled(ctrl.to());
        let p = self.scaled(to);
        self.builder.cubic_bezier_to(
            point(c0[0], c0[1]),
            point(c1[0], c1[1]),
            point(p[0], p[1]),
        );
        if let Some(&from) = self.current.last() {
            for i in 1..=self.curve_samples {
                let t = i as f32 / self.curve_samples as f32;
                self.current.push(cubic_at(from, c0, c1, p, t));
            }
        }
    }

    fn close(&mut self) {
        self.end_contour(true);
    }
}

fn lerp(a: [f32; 2], b: [f32; 2], t: f32) -> [f32; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

fn quadratic_at(p0: [f32; 2], c: [f32; 2], p1: [f32; 2], t: f32) -> [f32; 2] {
    lerp(lerp(p0, c, t), lerp(c, p1, t), t)
}

fn cubic_at(p0: [f32; 2], c0: [f32; 2], c1: [f32; 2], p1: [f32; 2], t: f32) -> [f32; 2] {
    let a = lerp(p0, c0, t);
    let b = lerp(c0, c1, t);
    let c = lerp(c1, p1, t);
    quadratic_at(a, b, c, t)
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Font as CacheFont;
    use std::fs;
    use std::path::PathBuf;

    /// Find any TrueType/OpenType file under the system font directories.
    /// Tests that need one skip gracefully when the machine has no fonts
    /// installed (e.g. minimal CI images).
    fn find_system_font() -> Option<PathBuf> {
        fn walk(dir: &std::path::Path, depth: u32) -> Option<PathBuf> {
            if depth == 0 {
                return None;
            }
            for entry in fs::read_dir(dir).ok()?.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    if let Some(found) = walk(&path, depth - 1) {
                        return Some(found);
                    }
                } else if matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("ttf") | Some("otf")
                ) {
                    return Some(path);
                }
            }
            None
        }
        ["/usr/share/fonts", "/usr/local/share/fonts", "/Library/Fonts", "C:\\Windows\\Fonts"]
            .iter()
            .find_map(|root| walk(std::path::Path::new(root), 5))
    }

    #[test]
    fn test_backend_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OutlineFontBackend>();
    }

    #[test]
    fn test_curve_evaluation() {
        // Quadratic endpoints.
        assert_eq!(
            quadratic_at([0.0, 0.0], [1.0, 2.0], [2.0, 0.0], 0.0),
            [0.0, 0.0]
        );
        assert_eq!(
            quadratic_at([0.0, 0.0], [1.0, 2.0], [2.0, 0.0], 1.0),
            [2.0, 0.0]
        );
        // Midpoint of a symmetric quadratic sits at half the control height.
        let mid = quadratic_at([0.0, 0.0], [1.0, 2.0], [2.0, 0.0], 0.5);
        assert_eq!(mid, [1.0, 1.0]);

        // Cubic endpoints.
        let p = cubic_at([0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], 1.0);
        assert!((p[0] - 1.0).abs() < 1e-6 && p[1].abs() < 1e-6);
    }

    #[test]
    fn test_collector_builds_rings() {
        let mut collector = OutlineCollector::new(1.0, 4);
        collector.move_to(Vector2F::new(0.0, 0.0));
        collector.line_to(Vector2F::new(10.0, 0.0));
        collector.line_to(Vector2F::new(10.0, 10.0));
        collector.line_to(Vector2F::new(0.0, 10.0));
        collector.close();
        let (_, contours) = collector.finish();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 4);
    }

    #[test]
    fn test_collector_samples_curves() {
        let mut collector = OutlineCollector::new(1.0, 8);
        collector.move_to(Vector2F::new(0.0, 0.0));
        collector.quadratic_curve_to(Vector2F::new(5.0, 10.0), Vector2F::new(10.0, 0.0));
        collector.line_to(Vector2F::new(5.0, -5.0));
        collector.close();
        let (_, contours) = collector.finish();
        assert_eq!(contours.len(), 1);
        // start + 8 curve samples + 1 line point.
        assert_eq!(contours[0].len(), 10);
    }

    #[test]
    fn test_unclosed_contour_is_dropped_from_rings() {
        let mut collector = OutlineCollector::new(1.0, 4);
        collector.move_to(Vector2F::new(0.0, 0.0));
        collector.line_to(Vector2F::new(1.0, 0.0));
        let (_, contours) = collector.finish();
        assert!(contours.is_empty());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = OutlineFontBackend::from_file("/nonexistent/not-a-font.ttf");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_bytes_garbage_errors() {
        let result = OutlineFontBackend::from_bytes(vec![0u8; 64], "garbage");
        assert!(result.is_err());
    }

    #[test]
    fn test_rasterize_from_system_font() {
        let Some(path) = find_system_font() else {
            return; // no fonts installed, skip
        };
        let font = match CacheFont::from_file(&path) {
            Ok(font) => font,
            Err(_) => return, // unsupported face in this file, skip
        };

        let glyph = font.get_glyph(FontResolution::new(24, 24), 'A');
        let Some(glyph) = glyph else {
            return; // exotic font without 'A'
        };
        assert!(glyph.width() > 0);
        assert!(glyph.height() > 0);
        assert_eq!(glyph.bitmap().len(), (glyph.width() * glyph.height()) as usize);
        assert!(glyph.metrics().advance > 0.0);
        // Something should have been packed.
        assert!(glyph.placement().is_some());
    }

    #[test]
    fn test_glyph3d_from_system_font() {
        let Some(path) = find_system_font() else {
            return;
        };
        let font = match CacheFont::from_file(&path) {
            Ok(font) => font,
            Err(_) => return,
        };

        let Some(glyph) = font.get_glyph3d('A') else {
            return;
        };
        assert!(!glyph.vertices().is_empty());
        // Front and back caps triangulate identically.
        assert_eq!(glyph.front_indices().len(), glyph.back_indices().len());
        assert_eq!(glyph.front_indices().len() % 3, 0);
        assert!(!glyph.wall_indices().is_empty());
        assert!(glyph.advance() > 0.0);

        // Back-cap vertices sit at z = -depth.
        let depth = font.depth_hint();
        let any_back = glyph.back_indices().first().copied();
        if let Some(index) = any_back {
            let z = glyph.vertices()[index as usize].position[2];
            assert!((z + depth).abs() < 1e-6);
        }
    }
}
