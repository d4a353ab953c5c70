//! Dense in-memory intermediate store.

use async_trait::async_trait;

use crate::error::SinkError;
use crate::frame::{FrameShape, PixelWindow, TileBuffer};

use super::TileStore;

/// A zero-initialised frame buffer implementing [`TileStore`].
///
/// Holds the whole frame in memory. Disk-backed stores can implement the
/// same trait for frames that do not fit.
pub struct MemoryStore {
    frame: TileBuffer,
    shape: FrameShape,
}

impl MemoryStore {
    pub fn new(shape: FrameShape) -> Self {
        Self {
            frame: TileBuffer::zeroed(shape.height, shape.width, shape.channels),
            shape,
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }
}

#[async_trait]
impl TileStore for MemoryStore {
    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SinkError> {
        let clipped = window.clipped_to(&self.shape);
        Ok(self.frame.extract(clipped.rows, clipped.cols))
    }

    async fn write_window(
        &mut self,
        window: &PixelWindow,
        tile: &TileBuffer,
    ) -> Result<(), SinkError> {
        if window.height() != tile.height() || window.width() != tile.width() {
            return Err(SinkError::ShapeMismatch {
                window_height: window.height(),
                window_width: window.width(),
                tile_height: tile.height(),
                tile_width: tile.width(),
            });
        }
        if window.rows.end > self.shape.height || window.cols.end > self.shape.width {
            return Err(SinkError::Write(format!(
                "window rows {:?} cols {:?} exceeds store shape {:?}",
                window.rows, window.cols, self.shape
            )));
        }
        self.frame.blit(window.rows.start, window.cols.start, tile);
        Ok(())
    }
}
