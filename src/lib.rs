//! # WSI Converter
//!
//! Converts very large multi-resolution microscopy images (Whole Slide
//! Images) between container formats, decoupling the tile size used to
//! fetch source pixels from the tile size used to emit output, and
//! parallelizing pixel fetches across a bounded worker pool.
//!
//! ## Architecture
//!
//! The core is a tile pipeline: source pixels flow through N parallel
//! fetch tasks into a result channel, through a reordering buffer that
//! absorbs out-of-order completions, optionally through an intermediate
//! random-access store when the read and output tile grids differ, and
//! out to the writer in strict row-major order.
//!
//! - [`source`] - source handle factory and windowed readers
//! - [`tile`] - tile grids, the fetch pool, the reordering buffer, and
//!   the orchestrating pipeline state machine
//! - [`store`] - the intermediate store used for re-tiling
//! - [`pyramid`] - area-average downsampling behind a pluggable strategy
//! - [`writer`] - Deep Zoom and flat-image container writers
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wsi_converter::{
//!     ArraySource, PipelineOptions, TileBuffer, TilePipeline, TileSize,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let frame = TileBuffer::zeroed(1000, 1000, 3);
//!     let source = Arc::new(ArraySource::new(frame)?);
//!
//!     let options = PipelineOptions::new(TileSize::square(512)).with_workers(3);
//!     let mut pipeline = TilePipeline::new(source, options, None)?;
//!
//!     while let Some(tile) = pipeline.next_tile().await? {
//!         // tiles arrive in row-major order of the output grid
//!         let _ = (tile.coord, tile.data);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod pyramid;
pub mod source;
pub mod store;
pub mod tile;
pub mod writer;

// Re-export commonly used types
pub use config::{Cli, Command, ConvertConfig, InfoConfig};
pub use error::{ConfigError, ConvertError, PipelineError, SinkError, SourceError};
pub use frame::{FrameShape, PixelWindow, TileBuffer};
pub use pyramid::{default_resampler, AreaAverage, PyramidBuilder, Resampler};
pub use source::{ArraySource, ImageFileSource, RegionReader, SlideSource};
pub use store::{MemoryStore, TileStore};
pub use tile::{
    FetchPool, PipelineOptions, PipelineState, PipelineTile, ReorderBuffer, TileCoord, TileGrid,
    TilePipeline, TileSize,
};
pub use writer::{
    write_pipeline, DeepZoomWriter, ImageWriter, OutputFormat, TileEncoder, TileFormat,
    WriterOptions, DEFAULT_JPEG_QUALITY,
};
