//! In-memory array source.
//!
//! Serves windows from a frame already resident in memory. The frame sits
//! behind an `Arc`, so every `open()` yields a fresh reader over the same
//! immutable pixels. Used programmatically, by tests, and as the decoded
//! backing of [`super::ImageFileSource`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConfigError, SourceError};
use crate::frame::{FrameShape, PixelWindow, TileBuffer};

use super::{RegionReader, SlideSource};

/// A source backed by an in-memory frame.
#[derive(Debug, Clone)]
pub struct ArraySource {
    frame: Arc<TileBuffer>,
    shape: FrameShape,
}

impl ArraySource {
    /// Wrap a frame buffer as a source.
    ///
    /// Rejects channel counts other than 1 (grayscale) and 3 (RGB).
    pub fn new(frame: TileBuffer) -> Result<Self, ConfigError> {
        if frame.channels() != 1 && frame.channels() != 3 {
            return Err(ConfigError::UnsupportedChannels(frame.channels()));
        }
        let shape = FrameShape::new(frame.height(), frame.width(), frame.channels());
        Ok(Self {
            frame: Arc::new(frame),
            shape,
        })
    }
}

#[async_trait]
impl SlideSource for ArraySource {
    type Reader = ArrayReader;

    fn shape(&self) -> FrameShape {
        self.shape
    }

    async fn open(&self) -> Result<Self::Reader, SourceError> {
        Ok(ArrayReader {
            frame: Arc::clone(&self.frame),
            shape: self.shape,
        })
    }
}

/// Reader over a shared in-memory frame.
pub struct ArrayReader {
    frame: Arc<TileBuffer>,
    shape: FrameShape,
}

#[async_trait]
impl RegionReader for ArrayReader {
    fn shape(&self) -> FrameShape {
        self.shape
    }

    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SourceError> {
        let clipped = window.clipped_to(&self.shape);
        Ok(self.frame.extract(clipped.rows, clipped.cols))
    }
}
