//! Glyph rasterization using swash
//!
//! A [`Rasterizer`] is the engine handle: it is created once, owned by the
//! caller and lent to the font data service by `&mut`. Opening a face
//! borrows the engine for as long as the face lives, so a face is always
//! released before the engine can be used for anything else, including on
//! early returns.
//!
//! The engine is not shared between threads; `&mut self` on every entry
//! point keeps access to one caller at a time.

use std::path::Path;

use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Transform};

use crate::glyph::{FaceMetrics, GlyphBitmap};
use crate::request::FontRequest;
use crate::{FontError, Result};

/// Source of rasterized faces
pub trait Rasterizer {
    /// Load the request's font at its point size and DPI
    ///
    /// Failing to read or parse the font is fatal to the request.
    fn open_face<'a>(&'a mut self, request: &FontRequest) -> Result<Box<dyn FontFace + 'a>>;
}

/// A font face sized for one request
pub trait FontFace {
    /// Face-wide metrics in 1/64 pixel
    fn metrics(&self) -> FaceMetrics;

    /// Render one code point, or `None` if the face cannot produce it
    fn rasterize(&mut self, code_point: u32) -> Option<GlyphBitmap>;
}

/// Convert pixels to 26.6 fixed point
fn to_fixed(px: f32) -> i32 {
    (px * 64.0).round() as i32
}

/// Glyph rasterizer using swash
pub struct SwashRasterizer {
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
}

impl SwashRasterizer {
    /// Create a new glyph rasterizer
    pub fn new() -> Self {
        Self {
            scale_context: ScaleContext::new(),
        }
    }
}

impl Default for SwashRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SwashRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashRasterizer").finish_non_exhaustive()
    }
}

fn load_error(path: &Path, reason: impl Into<String>) -> FontError {
    FontError::FontLoad {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Face-level metrics rounded the way a hinting rasterizer reports them
fn face_metrics(face: &ttf_parser::Face<'_>, pixels_per_em: f32) -> FaceMetrics {
    let scale = pixels_per_em / f32::from(face.units_per_em());
    let ascender = f32::from(face.ascender()) * scale;
    let descender = f32::from(face.descender()) * scale;
    let line_gap = f32::from(face.line_gap()) * scale;

    FaceMetrics {
        ascender_64: to_fixed(ascender.ceil()),
        descender_64: to_fixed(descender.floor()),
        line_height_64: to_fixed((ascender - descender + line_gap).round()),
        is_fixed_pitch: face.is_monospaced(),
    }
}

impl Rasterizer for SwashRasterizer {
    fn open_face<'a>(&'a mut self, request: &FontRequest) -> Result<Box<dyn FontFace + 'a>> {
        let path = request.path();
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let face =
            ttf_parser::Face::parse(&data, 0).map_err(|e| load_error(path, e.to_string()))?;
        if face.units_per_em() == 0 {
            return Err(load_error(path, "units per em is zero"));
        }

        let pixels_per_em = request.pixels_per_em();
        let metrics = face_metrics(&face, pixels_per_em);

        if swash::FontRef::from_index(&data, 0).is_none() {
            return Err(load_error(path, "unsupported font data"));
        }

        let dpi = request.dpi();
        tracing::debug!(
            "Opened {} at {}pt, {}x{} DPI ({} px/em)",
            path.display(),
            request.point_size(),
            dpi.x,
            dpi.y,
            pixels_per_em
        );

        Ok(Box::new(SwashFace {
            scale_context: &mut self.scale_context,
            data,
            metrics,
            pixels_per_em,
            x_scale: dpi.x / dpi.y,
        }))
    }
}

/// A loaded face borrowing the engine's scale context
struct SwashFace<'a> {
    scale_context: &'a mut ScaleContext,
    data: Vec<u8>,
    metrics: FaceMetrics,
    pixels_per_em: f32,
    /// Horizontal stretch for anisotropic DPI
    x_scale: f32,
}

impl FontFace for SwashFace<'_> {
    fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    fn rasterize(&mut self, code_point: u32) -> Option<GlyphBitmap> {
        let font = swash::FontRef::from_index(&self.data, 0)?;

        let glyph_id = font.charmap().map(code_point);
        if glyph_id == 0 {
            return None;
        }

        let mut scaler = self
            .scale_context
            .builder(font)
            .size(self.pixels_per_em)
            .hint(true)
            .build();

        let units_per_em = font.metrics(&[]).units_per_em;
        let scale = self.pixels_per_em / f32::from(units_per_em);
        // Hinted advances land on whole pixels
        let advance = (font.glyph_metrics(&[]).advance_width(glyph_id) * scale * self.x_scale)
            .round();

        let mut render = Render::new(&[Source::Outline, Source::Bitmap(StrikeWith::BestFit)]);
        render.format(Format::Alpha);
        if self.x_scale != 1.0 {
            render.transform(Some(Transform::scale(self.x_scale, 1.0)));
        }

        let empty = GlyphBitmap {
            code_point,
            advance_64: to_fixed(advance),
            ..Default::default()
        };

        match render.render(&mut scaler, glyph_id) {
            // Blank glyphs (like space) keep only their advance
            Some(image) if image.placement.width == 0 || image.placement.height == 0 => {
                Some(empty)
            }
            Some(image) => {
                if image.content != Content::Mask {
                    tracing::debug!("Skipping U+{:04X}: not a grayscale glyph", code_point);
                    return None;
                }
                let width = image.placement.width;
                Some(GlyphBitmap {
                    height: image.placement.height,
                    width,
                    stride: width as usize,
                    buffer: image.data,
                    left: image.placement.left,
                    top: image.placement.top,
                    ..empty
                })
            }
            None => Some(empty),
        }
    }
}
