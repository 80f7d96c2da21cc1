//! Metrics cache
//!
//! A cache entry is a pair of files under `<cache_dir>/Fonts/` sharing the
//! stem `<font file name>_<range start>_<range end>_<point size>`:
//!
//! - `<stem>.png`: the RGBA atlas image
//! - `<stem>.bin`: the glyph metrics table
//!
//! An entry is only trusted when both files exist. DPI is not part of the
//! key, so requests differing only in DPI share an entry.
//!
//! # Metrics file layout
//!
//! Little-endian, no padding:
//!
//! ```text
//! u32   format version   (major << 24 | minor << 16 | patch << 8)
//! u64   glyph count
//! f32   text height
//! u8    is monospaced    (0 or 1)
//! glyph count times, ascending by code point:
//!   u32  code point
//!   u32  advance
//!   u32  offset
//!   f32  bearing x, bearing y
//!   f32  size x, size y
//!   f32  texcoords[0..4] as x, y pairs
//!   u64  reserved (written as 0, ignored on read)
//! ```
//!
//! The cache directory belongs to one process at a time. Nothing is
//! locked and the metrics file is written in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::codec::{ByteReader, ByteWriter, CodecError};
use crate::glyph::{Glyph, GlyphTable, Vec2};
use crate::request::{CodePointRange, FontRequest};

pub const FORMAT_VERSION_MAJOR: u32 = 1;
pub const FORMAT_VERSION_MINOR: u32 = 0;
pub const FORMAT_VERSION_PATCH: u32 = 0;

/// Running metrics format version
pub const FORMAT_VERSION: u32 =
    pack_version(FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR, FORMAT_VERSION_PATCH);

/// Encoded size of one [`Glyph`], excluding its code point
pub const GLYPH_RECORD_SIZE: usize = 64;

/// Bytes before the first glyph entry
const HEADER_SIZE: usize = 4 + 8 + 4 + 1;

/// Subdirectory of the cache directory holding font entries
const FONTS_DIR: &str = "Fonts";

/// Pack a semantic version into the header tag
pub const fn pack_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 24) | (minor << 16) | (patch << 8)
}

/// Render a header tag as `major.minor.patch`
pub fn version_string(version: u32) -> String {
    format!(
        "{}.{}.{}",
        version >> 24,
        (version >> 16) & 0xff,
        (version >> 8) & 0xff
    )
}

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// The metrics file was written by a different format version
    #[error("cache format version mismatch: found {found:#010x}, expected {expected:#010x}")]
    VersionMismatch { found: u32, expected: u32 },

    /// The metrics file is truncated or malformed
    #[error("corrupt metrics cache: {0}")]
    Codec(#[from] CodecError),

    /// A cache file or directory could not be accessed
    #[error("cache I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Whether the entry exists but cannot be trusted
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. } | Self::Codec(_))
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The persisted part of a baked font
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtlasMetrics {
    pub glyphs: GlyphTable,
    pub text_height: f32,
    pub is_monospaced: bool,
}

/// Encode a metrics table
pub fn encode_metrics(metrics: &AtlasMetrics) -> Vec<u8> {
    let mut writer =
        ByteWriter::with_capacity(HEADER_SIZE + metrics.glyphs.len() * (4 + GLYPH_RECORD_SIZE));
    writer
        .write(FORMAT_VERSION)
        .write(metrics.glyphs.len() as u64)
        .write(metrics.text_height)
        .write(metrics.is_monospaced);

    let mut code_points: Vec<u32> = metrics.glyphs.keys().copied().collect();
    code_points.sort_unstable();
    for code_point in code_points {
        writer.write(code_point);
        write_glyph(&mut writer, &metrics.glyphs[&code_point]);
    }
    writer.into_bytes()
}

fn write_glyph(writer: &mut ByteWriter, glyph: &Glyph) {
    writer
        .write(glyph.advance)
        .write(glyph.offset)
        .write(glyph.bearing.x)
        .write(glyph.bearing.y)
        .write(glyph.size.x)
        .write(glyph.size.y);
    for uv in &glyph.texcoords {
        writer.write(uv.x).write(uv.y);
    }
    writer.write(0u64);
}

/// Decode a metrics table, rejecting any other format version
pub fn decode_metrics(bytes: &[u8]) -> Result<AtlasMetrics, CacheError> {
    let mut reader = ByteReader::new(bytes);

    let found = reader.read::<u32>()?;
    if found != FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            found,
            expected: FORMAT_VERSION,
        });
    }

    let count = reader.read::<u64>()?;
    let text_height = reader.read::<f32>()?;
    let is_monospaced = reader.read::<bool>()?;

    // Don't trust the count for preallocation beyond what the buffer can hold
    let capacity = (count as usize).min(reader.remaining() / (4 + GLYPH_RECORD_SIZE));
    let mut glyphs = GlyphTable::with_capacity_and_hasher(capacity, Default::default());
    for _ in 0..count {
        let code_point = reader.read::<u32>()?;
        let glyph = read_glyph(&mut reader)?;
        glyphs.insert(code_point, glyph);
    }

    Ok(AtlasMetrics {
        glyphs,
        text_height,
        is_monospaced,
    })
}

fn read_vec2(reader: &mut ByteReader<'_>) -> Result<Vec2, CodecError> {
    Ok(Vec2::new(reader.read()?, reader.read()?))
}

fn read_glyph(reader: &mut ByteReader<'_>) -> Result<Glyph, CodecError> {
    let advance = reader.read()?;
    let offset = reader.read()?;
    let bearing = read_vec2(reader)?;
    let size = read_vec2(reader)?;
    let texcoords = [
        read_vec2(reader)?,
        read_vec2(reader)?,
        read_vec2(reader)?,
        read_vec2(reader)?,
    ];
    reader.skip(8)?;
    Ok(Glyph {
        advance,
        offset,
        bearing,
        size,
        texcoords,
    })
}

/// Identity of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Font file base name, extension included
    pub name: String,
    pub point_size: u32,
    pub range: CodePointRange,
}

impl CacheKey {
    pub fn from_request(request: &FontRequest) -> Self {
        Self {
            name: request.name(),
            point_size: request.point_size(),
            range: request.range(),
        }
    }

    /// `<name>_<start>_<end>_<pt>`
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.name, self.range.start, self.range.end, self.point_size
        )
    }
}

/// The two files making up one cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub metrics: PathBuf,
    pub image: PathBuf,
}

impl CachePaths {
    /// Both files must be present for the entry to count
    pub fn is_complete(&self) -> bool {
        self.metrics.is_file() && self.image.is_file()
    }
}

/// Font cache rooted at `<cache_dir>/Fonts`
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Create a store under `cache_dir`; nothing is touched on disk yet
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: cache_dir.as_ref().join(FONTS_DIR),
        }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derive the file pair for `key`, creating the cache directory if needed
    pub fn paths(&self, key: &CacheKey) -> Result<CachePaths, CacheError> {
        if !self.dir.is_dir() {
            tracing::debug!("Creating cache directory {}", self.dir.display());
            fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        }
        let stem = key.file_stem();
        Ok(CachePaths {
            metrics: self.dir.join(format!("{stem}.bin")),
            image: self.dir.join(format!("{stem}.png")),
        })
    }

    /// Read and decode a metrics file
    pub fn load(&self, path: &Path) -> Result<AtlasMetrics, CacheError> {
        let bytes = fs::read(path).map_err(|e| CacheError::io(path, e))?;
        let metrics = decode_metrics(&bytes)?;
        tracing::debug!(
            "Loaded {} glyph metrics from {}",
            metrics.glyphs.len(),
            path.display()
        );
        Ok(metrics)
    }

    /// Encode and write a metrics file, replacing any previous content
    pub fn save(&self, path: &Path, metrics: &AtlasMetrics) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        fs::write(path, encode_metrics(metrics)).map_err(|e| CacheError::io(path, e))?;
        tracing::debug!(
            "Saved {} glyph metrics to {}",
            metrics.glyphs.len(),
            path.display()
        );
        Ok(())
    }
}
