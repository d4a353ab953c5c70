//! CLI configuration for the converter.
//!
//! Options come from command-line arguments via clap, with `WSIC_`-prefixed
//! environment variable fallbacks and defaults matching the conversion
//! engine's sweet spot (read big, write small).
//!
//! # Environment Variables
//!
//! - `WSIC_TILE_SIZE` - Output tile size (default: 256)
//! - `WSIC_READ_TILE_SIZE` - Source fetch tile size (default: 512)
//! - `WSIC_WORKERS` - Worker count (default: available parallelism)
//! - `WSIC_QUALITY` - JPEG quality (default: 80)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::writer::{TileFormat, DEFAULT_JPEG_QUALITY};

/// Default yield (output) tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default read tile size in pixels.
pub const DEFAULT_READ_TILE_SIZE: u32 = 512;

/// WSI Converter - convert Whole Slide Images between container formats.
///
/// Tiles are fetched from the source in parallel with one tile size and
/// emitted to the destination with another; the output container is
/// selected by the destination file extension.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-converter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert a slide to another container format.
    Convert(ConvertConfig),
    /// Inspect a slide and print its tiling geometry.
    Info(InfoConfig),
}

/// Options for the `convert` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ConvertConfig {
    /// Path of the image to read from.
    #[arg(short, long, env = "WSIC_IN_PATH")]
    pub in_path: PathBuf,

    /// Path to write the output container to (.dzi, .png, .jpg).
    #[arg(short, long, env = "WSIC_OUT_PATH")]
    pub out_path: PathBuf,

    /// Size of the square tiles to write.
    #[arg(short, long, default_value_t = DEFAULT_TILE_SIZE, env = "WSIC_TILE_SIZE")]
    pub tile_size: u32,

    /// Size of the square tiles to read from the source.
    ///
    /// When this differs from --tile-size, fetched tiles are re-buffered
    /// through an in-memory staging frame before output tiles are cut.
    #[arg(short, long, default_value_t = DEFAULT_READ_TILE_SIZE, env = "WSIC_READ_TILE_SIZE")]
    pub read_tile_size: u32,

    /// Number of parallel fetch workers.
    ///
    /// Defaults to the available parallelism, never fewer than 2.
    #[arg(short, long, env = "WSIC_WORKERS")]
    pub workers: Option<usize>,

    /// Encoding for Deep Zoom tile files.
    #[arg(long, value_enum, default_value_t = TileFormat::Jpeg, env = "WSIC_FORMAT")]
    pub format: TileFormat,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSIC_QUALITY")]
    pub quality: u8,

    /// Overwrite the output if it already exists.
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ConvertConfig {
    /// Validate the configuration before any work starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.read_tile_size == 0 {
            return Err("read_tile_size must be greater than 0".to_string());
        }
        if self.workers == Some(0) {
            return Err("workers must be greater than 0".to_string());
        }
        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }
        Ok(())
    }
}

/// Options for the `info` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InfoConfig {
    /// Path of the image to inspect.
    #[arg(short, long, env = "WSIC_IN_PATH")]
    pub in_path: PathBuf,

    /// Tile size to compute grid dimensions for.
    #[arg(short, long, default_value_t = DEFAULT_TILE_SIZE, env = "WSIC_TILE_SIZE")]
    pub tile_size: u32,

    /// Read tile size to compute the fetch grid for.
    #[arg(short, long, default_value_t = DEFAULT_READ_TILE_SIZE, env = "WSIC_READ_TILE_SIZE")]
    pub read_tile_size: u32,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 || self.read_tile_size == 0 {
            return Err("tile sizes must be greater than 0".to_string());
        }
        Ok(())
    }
}
