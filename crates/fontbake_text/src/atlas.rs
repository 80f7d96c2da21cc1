//! Glyph atlas packing
//!
//! Lays out rasterized glyph bitmaps into a single fixed-size grayscale
//! canvas using shelf packing: glyphs go left to right along a shelf, and
//! a new shelf is opened below when the next glyph would reach the right
//! edge. It is a single forward pass; shelves are never revisited.
//!
//! Glyphs that do not fit below the last shelf are dropped from the
//! table. The canvas never grows and there is only one page.

use crate::glyph::{FaceMetrics, Glyph, GlyphBitmap, GlyphTable, Vec2};

/// Atlas canvas width in pixels
pub const ATLAS_WIDTH: u32 = 512;

/// Atlas canvas height in pixels
pub const ATLAS_HEIGHT: u32 = 512;

/// Horizontal gap after every glyph
const GLYPH_PADDING: u32 = 1;

/// Vertical gap between shelves
const SHELF_PADDING: u32 = 1;

/// Region in the atlas canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRegion {
    /// X position in atlas (pixels)
    pub x: u32,
    /// Y position in atlas (pixels)
    pub y: u32,
    /// Width in atlas (pixels)
    pub width: u32,
    /// Height in atlas (pixels)
    pub height: u32,
}

impl AtlasRegion {
    /// Get UV coordinates for this region given atlas dimensions
    pub fn uv_bounds(&self, atlas_width: u32, atlas_height: u32) -> [f32; 4] {
        let u_min = self.x as f32 / atlas_width as f32;
        let v_min = self.y as f32 / atlas_height as f32;
        let u_max = (self.x + self.width) as f32 / atlas_width as f32;
        let v_max = (self.y + self.height) as f32 / atlas_height as f32;
        [u_min, v_min, u_max, v_max]
    }

    /// Corner UVs in top-left, top-right, bottom-right, bottom-left order
    pub fn texcoords(&self, atlas_width: u32, atlas_height: u32) -> [Vec2; 4] {
        let [u_min, v_min, u_max, v_max] = self.uv_bounds(atlas_width, atlas_height);
        [
            Vec2::new(u_min, v_min),
            Vec2::new(u_max, v_min),
            Vec2::new(u_max, v_max),
            Vec2::new(u_min, v_max),
        ]
    }

    /// Flattened index of the top-left pixel
    pub fn offset(&self, atlas_width: u32) -> u32 {
        self.y * atlas_width + self.x
    }

    /// Whether two regions share any pixel
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// The shelf currently being filled
#[derive(Debug)]
struct Shelf {
    /// Y position of this shelf
    y: u32,
    /// Height reserved for this shelf (line height, or taller glyph)
    height: u32,
    /// Current X position (next free space)
    x: u32,
}

/// Fixed-size glyph atlas filled by one packing pass
pub struct GlyphAtlas {
    /// Atlas width in pixels
    width: u32,
    /// Atlas height in pixels
    height: u32,
    /// Pixel data (single channel, 8-bit grayscale)
    pixels: Vec<u8>,
    /// Packed glyphs by code point
    glyphs: GlyphTable,
    /// Shelf advance in pixels
    line_height: u32,
    shelf: Shelf,
    /// Glyphs that did not fit
    dropped: usize,
}

impl GlyphAtlas {
    /// Create an empty, zero-filled atlas
    pub fn new(width: u32, height: u32, line_height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
            glyphs: GlyphTable::default(),
            line_height,
            shelf: Shelf {
                y: 0,
                height: line_height,
                x: 0,
            },
            dropped: 0,
        }
    }

    /// Get atlas dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get raw pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Packed glyphs
    pub fn glyphs(&self) -> &GlyphTable {
        &self.glyphs
    }

    /// Get number of packed glyphs
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Number of glyphs rejected for lack of space
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Calculate atlas utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f32 {
        let used_height = (self.shelf.y + self.shelf.height).min(self.height);
        used_height as f32 / self.height as f32
    }

    /// Reserve a region on the current shelf, opening a new shelf if needed
    fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRegion> {
        if self.shelf.x.saturating_add(width) >= self.width {
            self.shelf.y = self
                .shelf
                .y
                .saturating_add(self.shelf.height)
                .saturating_add(SHELF_PADDING);
            self.shelf.x = 0;
            self.shelf.height = self.line_height;
        }

        if self.shelf.x.saturating_add(width) > self.width
            || self.shelf.y.saturating_add(height) > self.height
        {
            return None;
        }

        let region = AtlasRegion {
            x: self.shelf.x,
            y: self.shelf.y,
            width,
            height,
        };
        self.shelf.x += width + GLYPH_PADDING;
        // A glyph taller than the line would otherwise bleed into the next shelf
        self.shelf.height = self.shelf.height.max(height);
        Some(region)
    }

    /// Place a rasterized glyph, copying its pixels into the canvas
    ///
    /// Returns `None` and leaves the atlas untouched (apart from possibly
    /// opening a new shelf) when the glyph does not fit.
    pub fn insert_glyph(&mut self, bitmap: &GlyphBitmap) -> Option<Glyph> {
        let Some(region) = self.allocate(bitmap.width, bitmap.height) else {
            self.dropped += 1;
            tracing::debug!(
                "Glyph U+{:04X} ({}x{}) does not fit in the {}x{} atlas",
                bitmap.code_point,
                bitmap.width,
                bitmap.height,
                self.width,
                self.height
            );
            return None;
        };

        for row in 0..region.height {
            let Some(src) = bitmap.row(row) else {
                break;
            };
            let dst_offset = ((region.y + row) * self.width + region.x) as usize;
            self.pixels[dst_offset..dst_offset + src.len()].copy_from_slice(src);
        }

        let glyph = Glyph {
            advance: (bitmap.advance_64.max(0) >> 6) as u32,
            offset: region.offset(self.width),
            bearing: Vec2::new(bitmap.left as f32, bitmap.top as f32),
            size: Vec2::new(bitmap.width as f32, bitmap.height as f32),
            texcoords: region.texcoords(self.width, self.height),
        };
        self.glyphs.insert(bitmap.code_point, glyph);
        Some(glyph)
    }

    /// Expand the grayscale canvas to opaque RGBA (gray copied to R, G and B)
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&gray| [gray, gray, gray, 0xff])
            .collect()
    }

    /// Take the packed glyph table
    pub fn into_glyphs(self) -> GlyphTable {
        self.glyphs
    }
}

impl Default for GlyphAtlas {
    fn default() -> Self {
        Self::new(ATLAS_WIDTH, ATLAS_HEIGHT, 0)
    }
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("dimensions", &(self.width, self.height))
            .field("glyph_count", &self.glyphs.len())
            .field("dropped", &self.dropped)
            .field(
                "utilization",
                &format!("{:.1}%", self.utilization() * 100.0),
            )
            .finish()
    }
}

/// Result of packing one code-point range
#[derive(Debug)]
pub struct PackedAtlas {
    /// Filled canvas and glyph table
    pub atlas: GlyphAtlas,
    /// Half of the ascent-to-descent span, in pixels
    pub text_height: f32,
    /// Copied from the face's fixed-pitch flag
    pub is_monospaced: bool,
}

/// Pack a sequence of bitmaps, in the order given, into a fresh 512x512 atlas
pub fn pack<I>(metrics: FaceMetrics, bitmaps: I) -> PackedAtlas
where
    I: IntoIterator<Item = GlyphBitmap>,
{
    let mut atlas = GlyphAtlas::new(ATLAS_WIDTH, ATLAS_HEIGHT, metrics.line_height_px());
    for bitmap in bitmaps {
        atlas.insert_glyph(&bitmap);
    }

    if atlas.dropped_count() > 0 {
        tracing::warn!(
            "{} glyph(s) did not fit in the {}x{} atlas and were left out",
            atlas.dropped_count(),
            ATLAS_WIDTH,
            ATLAS_HEIGHT
        );
    }
    tracing::debug!("Packed atlas: {:?}", atlas);

    PackedAtlas {
        atlas,
        text_height: metrics.text_height(),
        is_monospaced: metrics.is_fixed_pitch,
    }
}
