//! Font requests
//!
//! A [`FontRequest`] fully determines what gets rasterized and which cache
//! entry it maps to. The `parse_*` helpers turn the textual forms accepted
//! on the command line (`"12"`, `"96,96"`, `"32,128"`) into typed values,
//! reporting which field was malformed.

use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default point size
pub const DEFAULT_POINT_SIZE: u32 = 12;

/// Default horizontal and vertical DPI
pub const DEFAULT_DPI: Dpi = Dpi { x: 96.0, y: 96.0 };

/// Default code-point range (printable ASCII)
pub const DEFAULT_RANGE: CodePointRange = CodePointRange {
    start: 32,
    end: 128,
};

/// Configuration errors, one variant per request field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Failed to parse 'pt': ({input}). {reason}.")]
    PointSize { input: String, reason: String },

    #[error("Failed to parse 'dpi': ({input}). {reason}.")]
    Dpi { input: String, reason: String },

    #[error("Failed to parse 'range': ({input}). {reason}.")]
    Range { input: String, reason: String },

    #[error("No font file given")]
    EmptyFontPath,
}

/// Dots per inch on each axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dpi {
    pub x: f32,
    pub y: f32,
}

impl Default for Dpi {
    fn default() -> Self {
        DEFAULT_DPI
    }
}

/// Half-open range of code points, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodePointRange {
    pub start: u32,
    pub end: u32,
}

impl CodePointRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of code points covered
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Whether the range covers nothing
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Code points in increasing order
    pub fn iter(&self) -> Range<u32> {
        self.start..self.end
    }
}

impl Default for CodePointRange {
    fn default() -> Self {
        DEFAULT_RANGE
    }
}

/// Everything needed to rasterize one font at one size
#[derive(Debug, Clone, PartialEq)]
pub struct FontRequest {
    path: PathBuf,
    point_size: u32,
    dpi: Dpi,
    range: CodePointRange,
    verbose: bool,
}

impl FontRequest {
    /// Create a request for `path` with default size, DPI and range
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, RequestError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(RequestError::EmptyFontPath);
        }
        Ok(Self {
            path,
            point_size: DEFAULT_POINT_SIZE,
            dpi: DEFAULT_DPI,
            range: DEFAULT_RANGE,
            verbose: false,
        })
    }

    /// Set the point size
    pub fn with_point_size(mut self, point_size: u32) -> Self {
        self.point_size = point_size;
        self
    }

    /// Set the DPI
    pub fn with_dpi(mut self, dpi: Dpi) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the code-point range
    pub fn with_range(mut self, range: CodePointRange) -> Self {
        self.range = range;
        self
    }

    /// Enable verbose reporting
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Source font file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point size
    pub fn point_size(&self) -> u32 {
        self.point_size
    }

    pub fn dpi(&self) -> Dpi {
        self.dpi
    }

    pub fn range(&self) -> CodePointRange {
        self.range
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Display name: the font file's base name, extension included
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Pixels per em on the vertical axis
    pub fn pixels_per_em(&self) -> f32 {
        self.point_size as f32 * self.dpi.y / 72.0
    }
}

/// Parse a point size such as `"12"`
pub fn parse_point_size(input: &str) -> Result<u32, RequestError> {
    let err = |reason: String| RequestError::PointSize {
        input: input.to_string(),
        reason,
    };
    let value: u32 = input.trim().parse().map_err(|e| err(format!("{e}")))?;
    if value == 0 {
        return Err(err("point size must be greater than zero".to_string()));
    }
    Ok(value)
}

/// Split `"a,b"` into exactly two trimmed fields
fn split_pair(input: &str) -> Option<(&str, &str)> {
    let mut fields = input.split(',').map(str::trim);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(a), Some(b), None) => Some((a, b)),
        _ => None,
    }
}

/// Parse a DPI pair such as `"96,96"`
pub fn parse_dpi(input: &str) -> Result<Dpi, RequestError> {
    let err = |reason: String| RequestError::Dpi {
        input: input.to_string(),
        reason,
    };
    let (x, y) = split_pair(input).ok_or_else(|| {
        err("DPI must contain two comma-separated floats (e.g. \"96,96\")".to_string())
    })?;

    let parse = |field: &str| -> Result<f32, RequestError> {
        let value: f32 = field.parse().map_err(|e| err(format!("{e}")))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(err(format!("{field} is not a positive DPI")));
        }
        Ok(value)
    };
    Ok(Dpi {
        x: parse(x)?,
        y: parse(y)?,
    })
}

/// Parse a code-point range such as `"32,128"`
pub fn parse_range(input: &str) -> Result<CodePointRange, RequestError> {
    let err = |reason: String| RequestError::Range {
        input: input.to_string(),
        reason,
    };
    let (start, end) = split_pair(input).ok_or_else(|| {
        err("Character range must contain two comma-separated integers (e.g. \"32,128\")"
            .to_string())
    })?;

    let start: u32 = start.parse().map_err(|e| err(format!("{e}")))?;
    let end: u32 = end.parse().map_err(|e| err(format!("{e}")))?;
    CodePointRange::new(start, end)
        .ok_or_else(|| err(format!("start {start} is past end {end}")))
}
