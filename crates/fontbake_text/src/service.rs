//! Font data service
//!
//! Decides between serving a request from the cache and baking it from
//! the font file. A request ends in exactly one of two ways:
//!
//! - **Hit**: the `.bin` and `.png` for the request's cache key both exist.
//!   The metrics are decoded and the image is trusted as-is.
//! - **Miss**: the rasterizer renders every code point in the range, the
//!   results are packed, and both cache files are (re)written.
//!
//! A metrics file that exists but fails to decode (stale version,
//! truncation) is treated as a miss. Nothing is retried.

use std::path::{Path, PathBuf};

use crate::atlas::{self, ATLAS_HEIGHT, ATLAS_WIDTH};
use crate::cache::{AtlasMetrics, CacheKey, CachePaths, CacheStore};
use crate::encoder::write_png;
use crate::glyph::GlyphTable;
use crate::rasterizer::Rasterizer;
use crate::request::FontRequest;
use crate::Result;

/// A baked font: glyph metrics plus where its atlas image lives
#[derive(Debug, Clone, PartialEq)]
pub struct FontData {
    pub glyphs: GlyphTable,
    /// Half of the ascent-to-descent span, in pixels
    pub text_height: f32,
    pub is_monospaced: bool,
    /// Font file base name
    pub name: String,
    /// Atlas image in the cache directory
    pub image_path: PathBuf,
}

impl FontData {
    /// Number of glyphs in the table
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    fn from_metrics(metrics: AtlasMetrics, name: String, image_path: PathBuf) -> Self {
        Self {
            glyphs: metrics.glyphs,
            text_height: metrics.text_height,
            is_monospaced: metrics.is_monospaced,
            name,
            image_path,
        }
    }
}

/// Serves font data from a cache directory, baking on demand
pub struct FontDataService<'r, R: Rasterizer + ?Sized> {
    rasterizer: &'r mut R,
    cache: CacheStore,
}

impl<'r, R: Rasterizer + ?Sized> FontDataService<'r, R> {
    /// Use `rasterizer` for misses and `<cache_dir>/Fonts` for the cache
    pub fn new(rasterizer: &'r mut R, cache_dir: impl AsRef<Path>) -> Self {
        Self {
            rasterizer,
            cache: CacheStore::new(cache_dir),
        }
    }

    /// The underlying cache store
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Produce font data for `request`, from the cache when possible
    pub fn load(&mut self, request: &FontRequest) -> Result<FontData> {
        let key = CacheKey::from_request(request);
        let paths = self.cache.paths(&key)?;

        let metrics = if paths.is_complete() {
            match self.cache.load(&paths.metrics) {
                Ok(metrics) => {
                    tracing::info!("Cache hit for {}", key.file_stem());
                    metrics
                }
                Err(e) if e.is_integrity_failure() => {
                    tracing::warn!(
                        "Discarding cached metrics {}: {}",
                        paths.metrics.display(),
                        e
                    );
                    self.bake(request, &paths)?
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            tracing::info!(
                "Cache miss for {}, rasterizing {} code points",
                key.file_stem(),
                request.range().len()
            );
            self.bake(request, &paths)?
        };

        Ok(FontData::from_metrics(metrics, key.name, paths.image))
    }

    /// Rasterize, pack and write both cache files
    fn bake(&mut self, request: &FontRequest, paths: &CachePaths) -> Result<AtlasMetrics> {
        let mut face = self.rasterizer.open_face(request)?;
        let face_metrics = face.metrics();

        let bitmaps = request.range().iter().filter_map(|code_point| {
            let bitmap = face.rasterize(code_point);
            if bitmap.is_none() {
                tracing::debug!("No glyph for U+{:04X}", code_point);
            }
            bitmap
        });
        let packed = atlas::pack(face_metrics, bitmaps);

        write_png(
            &paths.image,
            ATLAS_WIDTH,
            ATLAS_HEIGHT,
            packed.atlas.to_rgba(),
        )?;

        let metrics = AtlasMetrics {
            glyphs: packed.atlas.into_glyphs(),
            text_height: packed.text_height,
            is_monospaced: packed.is_monospaced,
        };
        self.cache.save(&paths.metrics, &metrics)?;
        tracing::info!(
            "Baked {} glyphs into {}",
            metrics.glyphs.len(),
            paths.image.display()
        );

        Ok(metrics)
    }
}

/// Load or bake font data for a single request
pub fn create_font_data<R: Rasterizer + ?Sized>(
    rasterizer: &mut R,
    cache_dir: impl AsRef<Path>,
    request: &FontRequest,
) -> Result<FontData> {
    FontDataService::new(rasterizer, cache_dir).load(request)
}
