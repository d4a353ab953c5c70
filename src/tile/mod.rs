//! The tile pipeline: grid math, parallel fetching, reordering, and the
//! orchestrating state machine.

pub mod fetch;
pub mod grid;
pub mod pipeline;
pub mod reorder;

pub use fetch::{FetchPool, FetchResult};
pub use grid::{TileCoord, TileGrid, TileSize};
pub use pipeline::{
    PipelineOptions, PipelineState, PipelineTile, TilePipeline, DEFAULT_POLL_INTERVAL,
};
pub use reorder::ReorderBuffer;
