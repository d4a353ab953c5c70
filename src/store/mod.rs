//! Intermediate store: the staging buffer for re-tiling.
//!
//! When the read and yield tile grids differ, fetched tiles are written
//! into a randomly addressable store at their absolute frame offsets and
//! read back out through the yield grid's windows. The store is written
//! only by the pipeline's own coordinating task.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::frame::{PixelWindow, TileBuffer};

/// Windowed read/write access in absolute frame pixel coordinates.
#[async_trait]
pub trait TileStore: Send {
    /// Read the window as a dense tile.
    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SinkError>;

    /// Write `tile` at the window's offset. The tile shape must equal the
    /// window shape (edge tiles arrive pre-clipped).
    async fn write_window(
        &mut self,
        window: &PixelWindow,
        tile: &TileBuffer,
    ) -> Result<(), SinkError>;
}
