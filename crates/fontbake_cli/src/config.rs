//! fontbake configuration file handling

use anyhow::{Context, Result};
use fontbake_text::{
    parse_dpi, parse_point_size, parse_range, CodePointRange, Dpi, FontRequest,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when `--config` is absent
pub const CONFIG_FILE_NAME: &str = "fontbake.toml";

/// Top-level configuration (fontbake.toml)
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct BakeConfig {
    #[serde(default)]
    pub font: FontConfig,
}

/// Request defaults; anything left out falls back to the built-in default
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FontConfig {
    /// Point size
    #[serde(default)]
    pub pt: Option<u32>,
    /// Horizontal and vertical DPI
    #[serde(default)]
    pub dpi: Option<[f32; 2]>,
    /// Code-point range, end exclusive
    #[serde(default)]
    pub range: Option<[u32; 2]>,
    /// Directory the `Fonts/` cache folder is created in
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Request fields as given on the command line, still in text form
#[derive(Debug, Default, Clone)]
pub struct RequestArgs {
    pub file: PathBuf,
    pub pt: Option<String>,
    pub dpi: Option<String>,
    pub range: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl BakeConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: BakeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Load `fontbake.toml` from a directory if there is one
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!("Using configuration from {}", path.display());
        Self::load(&path).map(Some)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Combine command-line fields with this configuration
    ///
    /// Command-line values win over the file, which wins over the defaults.
    /// Every field is validated before anything touches the disk.
    pub fn resolve(&self, args: &RequestArgs) -> Result<(FontRequest, PathBuf)> {
        let mut request = FontRequest::new(&args.file)?.with_verbose(args.verbose);

        if let Some(pt) = &args.pt {
            request = request.with_point_size(parse_point_size(pt)?);
        } else if let Some(pt) = self.font.pt {
            request = request.with_point_size(parse_point_size(&pt.to_string())?);
        }

        if let Some(dpi) = &args.dpi {
            request = request.with_dpi(parse_dpi(dpi)?);
        } else if let Some([x, y]) = self.font.dpi {
            request = request.with_dpi(parse_dpi(&format!("{x},{y}"))?);
        }

        if let Some(range) = &args.range {
            request = request.with_range(parse_range(range)?);
        } else if let Some([start, end]) = self.font.range {
            let range = CodePointRange::new(start, end).with_context(|| {
                format!("Invalid range in {CONFIG_FILE_NAME}: start {start} is past end {end}")
            })?;
            request = request.with_range(range);
        }

        let cache_dir = args
            .cache_dir
            .clone()
            .or_else(|| self.font.cache_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok((request, cache_dir))
    }
}

/// DPI as shown in reports
pub fn format_dpi(dpi: Dpi) -> String {
    format!("({}, {})", dpi.x, dpi.y)
}
