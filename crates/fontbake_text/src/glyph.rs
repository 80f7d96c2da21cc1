//! Glyph data model
//!
//! [`GlyphBitmap`] and [`FaceMetrics`] are what a rasterizer hands to the
//! atlas packer. [`Glyph`] is the persisted per-code-point record the
//! packer produces and the metrics cache stores.

use rustc_hash::FxHashMap;

/// 2D float pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Placement and metric data for one packed glyph
///
/// Encodes to a fixed 64-byte record (see [`crate::cache::GLYPH_RECORD_SIZE`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Glyph {
    /// Horizontal advance in whole pixels
    pub advance: u32,
    /// Index of the glyph's top-left pixel in the flattened atlas (`y * width + x`)
    pub offset: u32,
    /// Left and top bearing in pixels
    pub bearing: Vec2,
    /// Bitmap width and height in pixels
    pub size: Vec2,
    /// Normalized atlas coordinates: top-left, top-right, bottom-right, bottom-left
    pub texcoords: [Vec2; 4],
}

impl Glyph {
    /// UV bounds as `[u_min, v_min, u_max, v_max]`
    pub fn uv_bounds(&self) -> [f32; 4] {
        [
            self.texcoords[0].x,
            self.texcoords[0].y,
            self.texcoords[2].x,
            self.texcoords[2].y,
        ]
    }
}

/// Code point to glyph mapping
pub type GlyphTable = FxHashMap<u32, Glyph>;

/// A rasterized glyph bitmap, owned by the packing pass that consumes it
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmap {
    /// Unicode code point this bitmap renders
    pub code_point: u32,
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels (rows)
    pub height: u32,
    /// Bytes per source row
    pub stride: usize,
    /// 8-bit grayscale coverage
    pub buffer: Vec<u8>,
    /// Offset from pen position to the bitmap's left edge, in pixels
    pub left: i32,
    /// Offset from baseline to the bitmap's top edge, in pixels (up is positive)
    pub top: i32,
    /// Horizontal advance in 1/64 pixel
    pub advance_64: i32,
}

impl GlyphBitmap {
    /// The visible pixels of source row `row`, or `None` if the buffer is short
    pub fn row(&self, row: u32) -> Option<&[u8]> {
        let start = row as usize * self.stride;
        self.buffer.get(start..start + self.width as usize)
    }
}

/// Face-level metrics at the requested size, in 1/64 pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceMetrics {
    /// Distance from baseline to the top of the face (positive)
    pub ascender_64: i32,
    /// Distance from baseline to the bottom of the face (negative)
    pub descender_64: i32,
    /// Baseline-to-baseline distance
    pub line_height_64: i32,
    /// Whether every glyph shares one advance width
    pub is_fixed_pitch: bool,
}

impl FaceMetrics {
    /// Half of the ascent-to-descent span, in pixels
    pub fn text_height(&self) -> f32 {
        let ascent = self.ascender_64 as f32 / 64.0;
        let descent = self.descender_64 as f32 / 64.0;
        (ascent - descent) * 0.5
    }

    /// Line height rounded down to whole pixels
    pub fn line_height_px(&self) -> u32 {
        (self.line_height_64.max(0) >> 6) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_height_is_half_span() {
        let metrics = FaceMetrics {
            ascender_64: 12 * 64,
            descender_64: -4 * 64,
            line_height_64: 18 * 64,
            is_fixed_pitch: false,
        };
        assert_eq!(metrics.text_height(), 8.0);
        assert_eq!(metrics.line_height_px(), 18);
    }

    #[test]
    fn test_bitmap_row_respects_stride() {
        let bitmap = GlyphBitmap {
            width: 2,
            height: 2,
            stride: 4,
            buffer: vec![1, 2, 0, 0, 3, 4, 0, 0],
            ..Default::default()
        };
        assert_eq!(bitmap.row(0), Some(&[1u8, 2][..]));
        assert_eq!(bitmap.row(1), Some(&[3u8, 4][..]));
        assert_eq!(bitmap.row(2), None);
    }
}
