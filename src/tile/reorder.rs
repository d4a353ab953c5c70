//! Reordering buffer for out-of-order fetch completions.
//!
//! Workers finish in arbitrary order; the buffer owns the result channel's
//! receiving end and parks completed tiles by coordinate until the pipeline
//! asks for them in row-major order.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use crate::error::SourceError;
use crate::frame::TileBuffer;

use super::fetch::FetchResult;
use super::grid::TileCoord;

/// Coordinate-indexed buffer of completed tiles.
pub struct ReorderBuffer {
    rx: mpsc::UnboundedReceiver<FetchResult>,
    ready: HashMap<TileCoord, TileBuffer>,
}

impl ReorderBuffer {
    pub fn new(rx: mpsc::UnboundedReceiver<FetchResult>) -> Self {
        Self {
            rx,
            ready: HashMap::new(),
        }
    }

    /// Move every currently available completion into the buffer.
    ///
    /// Non-blocking. Returns the coordinates drained this call so the
    /// caller can retire them from its pending set — a coordinate is never
    /// simultaneously pending and buffered. The first failed fetch
    /// encountered aborts the drain and surfaces as the fatal error.
    pub fn drain(&mut self) -> Result<Vec<TileCoord>, SourceError> {
        let mut drained = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok((coord, Ok(tile))) => {
                    debug!(row = coord.row, col = coord.col, "tile completed");
                    self.ready.insert(coord, tile);
                    drained.push(coord);
                }
                Ok((_, Err(e))) => return Err(e),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(drained),
            }
        }
    }

    /// Remove and return the tile for `coord` if it has completed.
    pub fn take(&mut self, coord: TileCoord) -> Option<TileBuffer> {
        self.ready.remove(&coord)
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Drop buffered tiles and stop accepting new completions.
    pub fn clear(&mut self) {
        self.rx.close();
        self.ready.clear();
    }
}
