//! Flat single-image writer.
//!
//! Assembles the yielded tiles into one full frame and saves it as a
//! plain PNG or JPEG. No pyramid; large frames cost a full frame of
//! memory, matching the in-memory decode on the input side.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ConvertError, SinkError};
use crate::frame::TileBuffer;
use crate::source::SlideSource;
use crate::tile::TilePipeline;

use super::encoder::{TileEncoder, TileFormat};
use super::WriterOptions;

/// Writer for flat PNG/JPEG output.
pub struct ImageWriter {
    dest: PathBuf,
    format: TileFormat,
    quality: u8,
    encoder: TileEncoder,
}

impl ImageWriter {
    /// Prepare the destination, honoring the overwrite flag.
    pub fn create(
        dest: &Path,
        format: TileFormat,
        options: &WriterOptions,
    ) -> Result<Self, ConvertError> {
        if dest.exists() && !options.overwrite {
            return Err(SinkError::AlreadyExists(dest.to_path_buf()).into());
        }
        Ok(Self {
            dest: dest.to_path_buf(),
            format,
            quality: options.quality,
            encoder: TileEncoder::new(),
        })
    }

    /// Consume the pipeline, assemble the frame, and save it.
    pub async fn write_from<S: SlideSource>(
        &self,
        pipeline: &mut TilePipeline<S>,
    ) -> Result<(), ConvertError> {
        let shape = pipeline.frame_shape();
        let mut assembly = TileBuffer::zeroed(shape.height, shape.width, shape.channels);
        while let Some(tile) = pipeline.next_tile().await? {
            let window = pipeline.yield_grid().window(tile.coord);
            assembly.blit(window.rows.start, window.cols.start, &tile.data);
        }

        let bytes = self.encoder.encode(&assembly, self.format, self.quality)?;
        fs::write(&self.dest, &bytes).map_err(|e| SinkError::Io(e.to_string()))?;
        info!(
            dest = %self.dest.display(),
            width = shape.width,
            height = shape.height,
            "wrote flat image"
        );
        Ok(())
    }
}
