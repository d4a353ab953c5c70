//! Frame geometry and dense pixel buffers.
//!
//! All pixel data in the pipeline flows through [`TileBuffer`], a dense
//! row-major `u8` buffer with an explicit height/width/channel shape.
//! Windows are always expressed in absolute frame pixel coordinates via
//! [`PixelWindow`].

use std::ops::Range;

/// The shape of a frame: (height, width, channels), fixed for a pipeline run.
///
/// Samples are 8-bit; the slide formats this tool targets are 8-bit
/// grayscale or RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

impl FrameShape {
    pub fn new(height: u32, width: u32, channels: u32) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Total number of samples (height * width * channels).
    pub fn num_samples(&self) -> usize {
        self.height as usize * self.width as usize * self.channels as usize
    }
}

/// A rectangular pixel window in absolute frame coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelWindow {
    pub rows: Range<u32>,
    pub cols: Range<u32>,
}

impl PixelWindow {
    pub fn new(rows: Range<u32>, cols: Range<u32>) -> Self {
        Self { rows, cols }
    }

    pub fn height(&self) -> u32 {
        self.rows.end.saturating_sub(self.rows.start)
    }

    pub fn width(&self) -> u32 {
        self.cols.end.saturating_sub(self.cols.start)
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// Clip this window to the in-bounds intersection with `shape`.
    ///
    /// Windows extending past the frame edge shrink silently; a window
    /// entirely outside the frame becomes empty. Never errors.
    pub fn clipped_to(&self, shape: &FrameShape) -> PixelWindow {
        PixelWindow {
            rows: self.rows.start.min(shape.height)..self.rows.end.min(shape.height),
            cols: self.cols.start.min(shape.width)..self.cols.end.min(shape.width),
        }
    }
}

/// A dense rectangular pixel array in row-major sample order.
///
/// Edge tiles are clipped to the frame boundary, so a tile's shape can be
/// smaller than the nominal tile size. Tiles are never padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBuffer {
    data: Vec<u8>,
    height: u32,
    width: u32,
    channels: u32,
}

impl TileBuffer {
    /// Create a zero-filled buffer with the given shape.
    pub fn zeroed(height: u32, width: u32, channels: u32) -> Self {
        let len = height as usize * width as usize * channels as usize;
        Self {
            data: vec![0; len],
            height,
            width,
            channels,
        }
    }

    /// Wrap an existing sample vector.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match the shape. Shapes are computed
    /// by the caller from clipped windows, so a mismatch is a logic error.
    pub fn from_vec(data: Vec<u8>, height: u32, width: u32, channels: u32) -> Self {
        let expected = height as usize * width as usize * channels as usize;
        assert_eq!(
            data.len(),
            expected,
            "sample count {} does not match shape {}x{}x{}",
            data.len(),
            height,
            width,
            channels
        );
        Self {
            data,
            height,
            width,
            channels,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// One row of samples.
    pub fn row(&self, row: u32) -> &[u8] {
        let stride = self.width as usize * self.channels as usize;
        let start = row as usize * stride;
        &self.data[start..start + stride]
    }

    fn row_mut(&mut self, row: u32) -> &mut [u8] {
        let stride = self.width as usize * self.channels as usize;
        let start = row as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Extract the sub-rectangle `rows` x `cols` (local coordinates) into a
    /// new buffer. Ranges must be in bounds.
    pub fn extract(&self, rows: Range<u32>, cols: Range<u32>) -> TileBuffer {
        debug_assert!(rows.end <= self.height && cols.end <= self.width);
        let ch = self.channels as usize;
        let out_h = rows.end - rows.start;
        let out_w = cols.end - cols.start;
        let mut data = Vec::with_capacity(out_h as usize * out_w as usize * ch);
        for r in rows {
            let row = self.row(r);
            let start = cols.start as usize * ch;
            let end = cols.end as usize * ch;
            data.extend_from_slice(&row[start..end]);
        }
        TileBuffer::from_vec(data, out_h, out_w, self.channels)
    }

    /// Copy `tile` into this buffer with its top-left corner at
    /// (`row_off`, `col_off`) (local coordinates). The tile must fit.
    pub fn blit(&mut self, row_off: u32, col_off: u32, tile: &TileBuffer) {
        debug_assert_eq!(self.channels, tile.channels);
        debug_assert!(row_off + tile.height <= self.height);
        debug_assert!(col_off + tile.width <= self.width);
        let ch = self.channels as usize;
        for r in 0..tile.height {
            let src = tile.row(r);
            let dst = self.row_mut(row_off + r);
            let start = col_off as usize * ch;
            dst[start..start + src.len()].copy_from_slice(src);
        }
    }
}
