//! Tile grid math.
//!
//! A [`TileGrid`] partitions a frame into `ceil(H / tile_h)` rows and
//! `ceil(W / tile_w)` columns of tiles. Read and yield grids are computed
//! independently over the same frame and may have different cardinalities.

use crate::error::ConfigError;
use crate::frame::{FrameShape, PixelWindow};

/// A tile size as (height, width) in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    pub height: u32,
    pub width: u32,
}

impl TileSize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// A square tile size.
    pub fn square(side: u32) -> Self {
        Self {
            height: side,
            width: side,
        }
    }
}

/// The (row, col) index of a tile within a grid, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub row: u32,
    pub col: u32,
}

impl TileCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// A tile partitioning of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    frame: FrameShape,
    tile: TileSize,
    rows: u32,
    cols: u32,
}

impl TileGrid {
    /// Compute the grid for `frame` partitioned into `tile`-sized tiles.
    ///
    /// Rejects tile sizes with a zero dimension; otherwise pure and total.
    pub fn new(frame: FrameShape, tile: TileSize) -> Result<Self, ConfigError> {
        if tile.height == 0 || tile.width == 0 {
            return Err(ConfigError::ZeroTileDimension {
                height: tile.height,
                width: tile.width,
            });
        }
        Ok(Self {
            frame,
            tile,
            rows: frame.height.div_ceil(tile.height),
            cols: frame.width.div_ceil(tile.width),
        })
    }

    pub fn frame(&self) -> FrameShape {
        self.frame
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Total number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The coordinate at row-major position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn coord_at(&self, index: usize) -> TileCoord {
        assert!(index < self.len(), "tile index {} out of range", index);
        TileCoord {
            row: (index / self.cols as usize) as u32,
            col: (index % self.cols as usize) as u32,
        }
    }

    /// Row-major enumeration of all coordinates.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.len()).map(|i| self.coord_at(i))
    }

    /// The absolute pixel window covered by `coord`, clipped to the frame.
    ///
    /// Edge tiles shrink; the window is never empty for an in-grid
    /// coordinate.
    pub fn window(&self, coord: TileCoord) -> PixelWindow {
        let row_start = coord.row * self.tile.height;
        let col_start = coord.col * self.tile.width;
        PixelWindow::new(
            row_start..row_start.saturating_add(self.tile.height),
            col_start..col_start.saturating_add(self.tile.width),
        )
        .clipped_to(&self.frame)
    }
}
