//! Glyph atlas baking for fontbake
//!
//! This crate provides:
//! - Byte buffer codec for the binary metrics format
//! - Glyph rasterization (swash, with ttf-parser for face metrics)
//! - Shelf-packed 512x512 glyph atlas with normalized texture coordinates
//! - Versioned on-disk metrics cache keyed by font, size and range
//! - A font data service that serves from the cache or bakes on a miss
//!
//! Everything runs synchronously on the calling thread.

pub mod atlas;
pub mod cache;
pub mod codec;
pub mod encoder;
pub mod glyph;
pub mod rasterizer;
pub mod request;
pub mod service;

pub use atlas::{pack, AtlasRegion, GlyphAtlas, PackedAtlas, ATLAS_HEIGHT, ATLAS_WIDTH};
pub use cache::{
    AtlasMetrics, CacheError, CacheKey, CachePaths, CacheStore, FORMAT_VERSION,
    GLYPH_RECORD_SIZE,
};
pub use codec::{ByteReader, ByteWriter, CodecError};
pub use glyph::{FaceMetrics, Glyph, GlyphBitmap, GlyphTable, Vec2};
pub use rasterizer::{FontFace, Rasterizer, SwashRasterizer};
pub use request::{
    parse_dpi, parse_point_size, parse_range, CodePointRange, Dpi, FontRequest, RequestError,
};
pub use service::{create_font_data, FontData, FontDataService};

use std::path::PathBuf;

use thiserror::Error;

/// Font baking errors
#[derive(Error, Debug)]
pub enum FontError {
    /// Malformed request field
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Failed to load font {}: {reason}", .path.display())]
    FontLoad { path: PathBuf, reason: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to write atlas image {}: {reason}", .path.display())]
    Image { path: PathBuf, reason: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FontError>;
