//! Tile encoding for output containers.
//!
//! Turns dense pixel tiles into encoded JPEG or PNG blobs via the `image`
//! crate. Tiles are encoded at their actual (possibly edge-clipped) size;
//! nothing is resized or padded here.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::SinkError;
use crate::frame::TileBuffer;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Encoded tile format for tiled containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TileFormat {
    #[default]
    Jpeg,
    Png,
}

impl TileFormat {
    /// File extension used for tile files.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Jpeg => "jpg",
            TileFormat::Png => "png",
        }
    }
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileFormat::Jpeg => f.write_str("jpeg"),
            TileFormat::Png => f.write_str("png"),
        }
    }
}

/// Stateless tile encoder.
#[derive(Debug, Clone, Default)]
pub struct TileEncoder;

impl TileEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a tile. `quality` applies to JPEG only.
    pub fn encode(
        &self,
        tile: &TileBuffer,
        format: TileFormat,
        quality: u8,
    ) -> Result<Bytes, SinkError> {
        let color = match tile.channels() {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            n => {
                return Err(SinkError::Encode(format!(
                    "unsupported channel count: {}",
                    n
                )))
            }
        };
        let mut out = Vec::new();
        match format {
            TileFormat::Jpeg => JpegEncoder::new_with_quality(&mut out, quality)
                .encode(tile.as_slice(), tile.width(), tile.height(), color)
                .map_err(|e| SinkError::Encode(e.to_string()))?,
            TileFormat::Png => PngEncoder::new(&mut out)
                .write_image(tile.as_slice(), tile.width(), tile.height(), color)
                .map_err(|e| SinkError::Encode(e.to_string()))?,
        }
        Ok(Bytes::from(out))
    }
}
