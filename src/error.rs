use std::path::PathBuf;
use thiserror::Error;

use crate::tile::TileCoord;

/// Configuration errors detected before any work starts.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Tile dimensions must be strictly positive
    #[error("Invalid tile size: {height}x{width} (dimensions must be > 0)")]
    ZeroTileDimension { height: u32, width: u32 },

    /// Read and yield tile sizes differ but no intermediate store was supplied
    #[error(
        "Read tile size {read_height}x{read_width} != yield tile size \
         {yield_height}x{yield_width} and no intermediate store is set. \
         Re-tiling requires a randomly addressable staging buffer."
    )]
    MismatchedTileSizes {
        read_height: u32,
        read_width: u32,
        yield_height: u32,
        yield_width: u32,
    },

    /// Worker count must be strictly positive
    #[error("Worker count must be greater than 0")]
    ZeroWorkers,

    /// Input file type not recognized by any source implementation
    #[error("Unsupported input type: {0}")]
    UnsupportedInput(String),

    /// Output file extension does not map to a known container
    #[error("Unsupported output type: {0}")]
    UnsupportedOutput(String),

    /// Only grayscale and RGB frames are supported
    #[error("Unsupported channel count: {0} (expected 1 or 3)")]
    UnsupportedChannels(u32),

    /// JPEG quality out of range
    #[error("Invalid JPEG quality: {0} (must be 1-100)")]
    InvalidQuality(u8),

    /// Downsample factors must be strictly positive
    #[error("Invalid downsample factor: {0} (must be > 0)")]
    ZeroDownsampleFactor(u32),
}

/// Fatal source-side errors. A failed fetch is never retried; the first
/// failure aborts the whole run.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Opening a source handle failed
    #[error("Failed to open source: {0}")]
    Open(String),

    /// Reading a pixel window failed
    #[error("Failed to read window for tile {coord:?}: {message}")]
    Read { coord: TileCoord, message: String },

    /// Decoding the source image failed
    #[error("Failed to decode source: {0}")]
    Decode(String),

    /// A fetch exceeded the configured per-fetch timeout
    #[error("Fetch for tile {coord:?} timed out")]
    Timeout { coord: TileCoord },

    /// A worker task terminated without publishing a result
    #[error("Worker for tile {coord:?} terminated without a result")]
    WorkerLost { coord: TileCoord },
}

/// Fatal sink-side errors from the intermediate store or final container.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// Writing a window to the intermediate store failed
    #[error("Failed to write window to intermediate store: {0}")]
    Write(String),

    /// Reading a window back from the intermediate store failed
    #[error("Failed to read window from intermediate store: {0}")]
    Read(String),

    /// Tile shape does not match the window being written
    #[error(
        "Shape mismatch writing window: window is {window_height}x{window_width}, \
         tile is {tile_height}x{tile_width}"
    )]
    ShapeMismatch {
        window_height: u32,
        window_width: u32,
        tile_height: u32,
        tile_width: u32,
    },

    /// Encoding an output tile failed
    #[error("Failed to encode tile: {0}")]
    Encode(String),

    /// Destination exists and overwrite was not requested
    #[error("Destination already exists: {0} (use --overwrite to replace it)")]
    AlreadyExists(PathBuf),

    /// Filesystem error while writing the destination
    #[error("I/O error writing destination: {0}")]
    Io(String),
}

/// Errors surfaced by the tile pipeline itself.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The pipeline was stepped again after yielding its final tile
    #[error("Pipeline is exhausted: all tiles have been yielded")]
    Exhausted,

    /// No in-flight work, nothing buffered, and the current yield window is
    /// incomplete. Coverage tracking makes this unreachable; kept as a guard.
    #[error("Pipeline stalled: no further progress is possible")]
    Stalled,
}

/// Top-level conversion errors reported by the CLI.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
