//! Test utilities for integration tests.
//!
//! Provides deterministic frames and instrumented sources: one that tracks
//! concurrent open handles, one that fails a chosen tile, and one that
//! delays a chosen tile to force out-of-order completions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use wsi_converter::{
    ArraySource, FrameShape, PipelineTile, PixelWindow, RegionReader, SlideSource, SourceError,
    TileBuffer, TileCoord, TilePipeline, TileSize,
};

// =============================================================================
// Frames
// =============================================================================

/// A deterministic non-constant frame: sample i has value (i * 31 + 7) % 256.
pub fn ramp_frame(height: u32, width: u32, channels: u32) -> TileBuffer {
    let len = height as usize * width as usize * channels as usize;
    let data: Vec<u8> = (0..len).map(|i| ((i * 31 + 7) % 256) as u8).collect();
    TileBuffer::from_vec(data, height, width, channels)
}

pub fn ramp_source(height: u32, width: u32, channels: u32) -> Arc<ArraySource> {
    Arc::new(ArraySource::new(ramp_frame(height, width, channels)).unwrap())
}

/// Drain a pipeline to completion, collecting every yielded tile.
pub async fn collect_tiles<S: SlideSource>(
    pipeline: &mut TilePipeline<S>,
) -> Vec<PipelineTile> {
    let mut tiles = Vec::new();
    while let Some(tile) = pipeline.next_tile().await.unwrap() {
        tiles.push(tile);
    }
    tiles
}

/// Reassemble yielded tiles into a full frame using the pipeline's yield
/// grid geometry.
pub fn reassemble(tiles: &[PipelineTile], grid: &wsi_converter::TileGrid) -> TileBuffer {
    let shape = grid.frame();
    let mut frame = TileBuffer::zeroed(shape.height, shape.width, shape.channels);
    for tile in tiles {
        let window = grid.window(tile.coord);
        frame.blit(window.rows.start, window.cols.start, &tile.data);
    }
    frame
}

// =============================================================================
// Tracking Source
// =============================================================================

/// A source that counts concurrently open handles.
///
/// Each open handle corresponds to one in-flight fetch, so the high-water
/// mark observes the pipeline's worker budget from the outside.
pub struct TrackingSource {
    inner: ArraySource,
    current: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
    read_delay: Duration,
}

impl TrackingSource {
    pub fn new(frame: TileBuffer, read_delay: Duration) -> Self {
        Self {
            inner: ArraySource::new(frame).unwrap(),
            current: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
            read_delay,
        }
    }

    /// Maximum number of handles that were ever open at once.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Number of handles open right now.
    pub fn live_handles(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

pub struct TrackingReader {
    inner: wsi_converter::source::ArrayReader,
    current: Arc<AtomicUsize>,
    read_delay: Duration,
}

#[async_trait]
impl SlideSource for TrackingSource {
    type Reader = TrackingReader;

    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn open(&self) -> Result<Self::Reader, SourceError> {
        let live = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(live, Ordering::SeqCst);
        Ok(TrackingReader {
            inner: self.inner.open().await?,
            current: Arc::clone(&self.current),
            read_delay: self.read_delay,
        })
    }
}

#[async_trait]
impl RegionReader for TrackingReader {
    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SourceError> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.read_window(window).await
    }
}

impl Drop for TrackingReader {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Failing Source
// =============================================================================

/// A source whose read fails for one chosen read-grid tile.
pub struct FailingSource {
    inner: ArraySource,
    fail_coord: TileCoord,
    fail_origin: (u32, u32),
    current: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl FailingSource {
    pub fn new(frame: TileBuffer, fail_coord: TileCoord, read_tile: TileSize) -> Self {
        Self {
            inner: ArraySource::new(frame).unwrap(),
            fail_coord,
            fail_origin: (
                fail_coord.row * read_tile.height,
                fail_coord.col * read_tile.width,
            ),
            current: Arc::new(AtomicUsize::new(0)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live_handles(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Total number of handles ever opened.
    pub fn total_opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

pub struct FailingReader {
    inner: wsi_converter::source::ArrayReader,
    fail_coord: TileCoord,
    fail_origin: (u32, u32),
    current: Arc<AtomicUsize>,
}

#[async_trait]
impl SlideSource for FailingSource {
    type Reader = FailingReader;

    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn open(&self) -> Result<Self::Reader, SourceError> {
        self.current.fetch_add(1, Ordering::SeqCst);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(FailingReader {
            inner: self.inner.open().await?,
            fail_coord: self.fail_coord,
            fail_origin: self.fail_origin,
            current: Arc::clone(&self.current),
        })
    }
}

#[async_trait]
impl RegionReader for FailingReader {
    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SourceError> {
        if (window.rows.start, window.cols.start) == self.fail_origin {
            return Err(SourceError::Read {
                coord: self.fail_coord,
                message: "injected read failure".into(),
            });
        }
        self.inner.read_window(window).await
    }
}

impl Drop for FailingReader {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Slow Source
// =============================================================================

/// A source that delays the read of the window starting at `slow_at`,
/// forcing it to complete after every other in-flight tile.
pub struct SlowSource {
    inner: ArraySource,
    slow_at: (u32, u32),
    delay: Duration,
}

impl SlowSource {
    pub fn new(frame: TileBuffer, slow_at: (u32, u32), delay: Duration) -> Self {
        Self {
            inner: ArraySource::new(frame).unwrap(),
            slow_at,
            delay,
        }
    }
}

pub struct SlowReader {
    inner: wsi_converter::source::ArrayReader,
    slow_at: (u32, u32),
    delay: Duration,
}

#[async_trait]
impl SlideSource for SlowSource {
    type Reader = SlowReader;

    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn open(&self) -> Result<Self::Reader, SourceError> {
        Ok(SlowReader {
            inner: self.inner.open().await?,
            slow_at: self.slow_at,
            delay: self.delay,
        })
    }
}

#[async_trait]
impl RegionReader for SlowReader {
    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SourceError> {
        if (window.rows.start, window.cols.start) == self.slow_at {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.read_window(window).await
    }
}
