//! Source abstraction: where pixels come from.
//!
//! The pipeline never reads the caller's handle directly. Every worker task
//! opens its own [`RegionReader`] through the [`SlideSource`] factory —
//! many slide backends are unsafe for concurrent use of a single handle,
//! so handles are strictly per-task.

mod array;
mod file;

pub use array::{ArrayReader, ArraySource};
pub use file::ImageFileSource;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::frame::{FrameShape, PixelWindow, TileBuffer};

/// Factory for per-worker source handles.
///
/// `open()` must return a handle that is independent of every other handle;
/// implementations may share immutable state (e.g. a decoded frame behind an
/// `Arc`) but never a mutable cursor or backend session.
#[async_trait]
pub trait SlideSource: Send + Sync + 'static {
    /// The reader type this source hands out.
    type Reader: RegionReader + 'static;

    /// Frame shape, known without opening a reader.
    fn shape(&self) -> FrameShape;

    /// Open an independent reader over the source pixels.
    async fn open(&self) -> Result<Self::Reader, SourceError>;
}

/// Windowed pixel access over a single source handle.
///
/// `read_window` clips the requested window to the in-bounds intersection
/// with the frame instead of erroring; reads past the image edge return the
/// in-bounds portion silently.
#[async_trait]
pub trait RegionReader: Send {
    fn shape(&self) -> FrameShape;

    /// Read the clipped window as a dense tile.
    async fn read_window(&mut self, window: &PixelWindow) -> Result<TileBuffer, SourceError>;
}
