//! File-backed image source.
//!
//! Decodes a PNG, JPEG, or TIFF file once at construction and serves
//! windows from the decoded frame. Decoding per-worker would repeat the
//! work `N` times for nothing: the decoded pixels are immutable, so a
//! single shared frame with per-worker readers gives the same isolation.

use std::path::Path;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use crate::error::{ConfigError, ConvertError, SourceError};
use crate::frame::{FrameShape, PixelWindow, TileBuffer};

use super::{ArrayReader, ArraySource, RegionReader, SlideSource};

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff"];

/// A source that decodes an image file at construction.
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    inner: ArraySource,
}

impl ImageFileSource {
    /// Open and decode `path`.
    ///
    /// The extension selects the decoder; unsupported extensions are a
    /// configuration error, decode failures a source error.
    pub fn open_path(path: &Path) -> Result<Self, ConvertError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ConfigError::UnsupportedInput(path.display().to_string()).into());
        }

        let img = image::open(path).map_err(|e| SourceError::Decode(e.to_string()))?;
        let frame = frame_from_image(img);
        debug!(
            path = %path.display(),
            height = frame.height(),
            width = frame.width(),
            channels = frame.channels(),
            "decoded source image"
        );
        let inner = ArraySource::new(frame)?;
        Ok(Self { inner })
    }
}

/// Flatten a decoded image to an 8-bit grayscale or RGB frame.
fn frame_from_image(img: DynamicImage) -> TileBuffer {
    match img {
        DynamicImage::ImageLuma8(gray) => {
            let (w, h) = (gray.width(), gray.height());
            TileBuffer::from_vec(gray.into_raw(), h, w, 1)
        }
        other => {
            let rgb = other.to_rgb8();
            let (w, h) = (rgb.width(), rgb.height());
            TileBuffer::from_vec(rgb.into_raw(), h, w, 3)
        }
    }
}

#[async_trait]
impl SlideSource for ImageFileSource {
    type Reader = ArrayReader;

    fn shape(&self) -> FrameShape {
        self.inner.shape()
    }

    async fn open(&self) -> Result<Self::Reader, SourceError> {
        self.inner.open().await
    }
}
