//! fontbake CLI - bake a font's glyph range into a cached atlas

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fontbake_text::cache::{version_string, FORMAT_VERSION};
use fontbake_text::{FontDataService, SwashRasterizer};

use config::{format_dpi, BakeConfig, RequestArgs};

#[derive(Parser, Debug)]
#[command(
    name = "fontbake",
    about = "Rasterize a font's glyph range into a PNG atlas with a cached metrics table",
    disable_version_flag = true
)]
struct Cli {
    /// Font file to load
    #[arg(long, required_unless_present = "version")]
    file: Option<PathBuf>,

    /// Requested point size of font (Default: '12')
    #[arg(long)]
    pt: Option<String>,

    /// Dots per inch (Default: '96,96')
    #[arg(long)]
    dpi: Option<String>,

    /// Character range to load, end exclusive (Default: '32,128')
    #[arg(long)]
    range: Option<String>,

    /// Directory to output the cached png and binary glyph table to (Default: '.')
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Configuration file (Default: './fontbake.toml' if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose log messages
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Display version number and build info
    #[arg(long)]
    version: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<BakeConfig> {
    match &cli.config {
        Some(path) => BakeConfig::load(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            Ok(BakeConfig::discover(&cwd)?.unwrap_or_default())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.version {
        let build_mode = if cfg!(debug_assertions) {
            "Debug"
        } else {
            "Release"
        };
        println!(
            "fontbake {} (cache format {}) {}",
            env!("CARGO_PKG_VERSION"),
            version_string(FORMAT_VERSION),
            build_mode
        );
        return Ok(());
    }

    let config = load_config(&cli)?;
    let args = RequestArgs {
        file: cli.file.clone().unwrap_or_default(),
        pt: cli.pt.clone(),
        dpi: cli.dpi.clone(),
        range: cli.range.clone(),
        cache_dir: cli.cache_dir.clone(),
        verbose: cli.verbose,
    };
    let (request, cache_dir) = config.resolve(&args)?;

    let mut rasterizer = SwashRasterizer::new();
    let data = FontDataService::new(&mut rasterizer, &cache_dir)
        .load(&request)
        .with_context(|| format!("Failed to load font file {}", request.path().display()))?;

    let image_path =
        std::fs::canonicalize(&data.image_path).unwrap_or_else(|_| data.image_path.clone());
    let range = request.range();

    println!("Successfully loaded font file: {}", request.path().display());
    println!(" -- Name:        {}", data.name);
    println!(" -- Glyphs:      {}", data.glyph_count());
    println!(" -- Monospaced:  {}", data.is_monospaced);
    println!(" -- Text Height: {}", data.text_height);
    println!(" -- Output PNG:  {}", image_path.display());
    println!(" -- Point Size:  {}", request.point_size());
    println!(" -- DPI:         {}", format_dpi(request.dpi()));
    println!(" -- Char Range:  ({}, {})", range.start, range.end);

    if request.verbose() {
        let mut code_points: Vec<_> = data.glyphs.keys().copied().collect();
        code_points.sort_unstable();
        for code_point in code_points {
            let glyph = &data.glyphs[&code_point];
            println!(
                "    U+{:04X}  advance {:>3}  size {}x{}  bearing ({}, {})  uv {:?}",
                code_point,
                glyph.advance,
                glyph.size.x,
                glyph.size.y,
                glyph.bearing.x,
                glyph.bearing.y,
                glyph.uv_bounds()
            );
        }
    }

    Ok(())
}
