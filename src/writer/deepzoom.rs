//! Deep Zoom (DZI) container writer.
//!
//! Writes a static Deep Zoom tree: an XML descriptor next to a
//! `<name>_files/<level>/<col>_<row>.<ext>` tile directory. Deep Zoom
//! numbers levels from 0 (1x1 pixel) up to `max_level` (full resolution);
//! full-resolution tiles stream straight from the pipeline while lower
//! levels are produced by successive factor-2 area averaging of the
//! assembled frame.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConvertError, SinkError};
use crate::frame::{FrameShape, TileBuffer};
use crate::pyramid::PyramidBuilder;
use crate::source::SlideSource;
use crate::tile::{TileGrid, TilePipeline, TileSize};

use super::encoder::{TileEncoder, TileFormat};
use super::WriterOptions;

/// Maximum Deep Zoom level: `ceil(log2(max(width, height)))`.
pub fn max_dzi_level(width: u32, height: u32) -> u32 {
    let max_dim = u64::from(width.max(height));
    if max_dim <= 1 {
        return 0;
    }
    (max_dim - 1).ilog2() + 1
}

/// Dimensions at a Deep Zoom level: `ceil(dim / 2^(max_level - level))`.
pub fn dzi_level_dimensions(
    width: u32,
    height: u32,
    level: u32,
    max_level: u32,
) -> (u32, u32) {
    let scale = 1u64 << (max_level - level);
    (
        (u64::from(width).div_ceil(scale) as u32).max(1),
        (u64::from(height).div_ceil(scale) as u32).max(1),
    )
}

/// The DZI XML descriptor.
pub fn dzi_descriptor_xml(
    width: u32,
    height: u32,
    tile_size: u32,
    format: TileFormat,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
       TileSize="{tile_size}"
       Overlap="0"
       Format="{format}">
  <Size Width="{width}" Height="{height}" />
</Image>"#,
        format = format.extension(),
    )
}

/// Writer for a static Deep Zoom container.
pub struct DeepZoomWriter {
    descriptor_path: PathBuf,
    files_dir: PathBuf,
    shape: FrameShape,
    tile_size: TileSize,
    tile_format: TileFormat,
    quality: u8,
    encoder: TileEncoder,
    pyramid: PyramidBuilder,
}

impl DeepZoomWriter {
    /// Prepare the destination. Refuses to clobber an existing container
    /// unless `options.overwrite` is set.
    pub fn create(
        dest: &Path,
        shape: FrameShape,
        tile_size: TileSize,
        options: &WriterOptions,
    ) -> Result<Self, ConvertError> {
        if tile_size.height != tile_size.width {
            return Err(ConfigError::UnsupportedOutput(format!(
                "{}: Deep Zoom requires a square tile size, got {}x{}",
                dest.display(),
                tile_size.height,
                tile_size.width
            ))
            .into());
        }

        let stem = dest
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::UnsupportedOutput(dest.display().to_string()))?;
        let files_dir = dest.with_file_name(format!("{stem}_files"));

        for existing in [dest, files_dir.as_path()] {
            if existing.exists() {
                if !options.overwrite {
                    return Err(SinkError::AlreadyExists(existing.to_path_buf()).into());
                }
                let removed = if existing.is_dir() {
                    fs::remove_dir_all(existing)
                } else {
                    fs::remove_file(existing)
                };
                removed.map_err(|e| SinkError::Io(e.to_string()))?;
            }
        }
        fs::create_dir_all(&files_dir).map_err(|e| SinkError::Io(e.to_string()))?;

        Ok(Self {
            descriptor_path: dest.to_path_buf(),
            files_dir,
            shape,
            tile_size,
            tile_format: options.tile_format,
            quality: options.quality,
            encoder: TileEncoder::new(),
            pyramid: PyramidBuilder::new(),
        })
    }

    /// Consume the pipeline and write the full container.
    ///
    /// Full-resolution tiles are written as they are yielded; the frame is
    /// assembled alongside so the lower pyramid levels can be generated
    /// afterwards. The descriptor is written last, once everything else
    /// has succeeded.
    pub async fn write_from<S: SlideSource>(
        &self,
        pipeline: &mut TilePipeline<S>,
    ) -> Result<(), ConvertError> {
        let max_level = max_dzi_level(self.shape.width, self.shape.height);
        let mut assembly =
            TileBuffer::zeroed(self.shape.height, self.shape.width, self.shape.channels);

        let level_dir = self.files_dir.join(max_level.to_string());
        fs::create_dir_all(&level_dir).map_err(|e| SinkError::Io(e.to_string()))?;

        let total = pipeline.len();
        let mut written = 0usize;
        while let Some(tile) = pipeline.next_tile().await? {
            let window = pipeline.yield_grid().window(tile.coord);
            self.write_tile(&level_dir, tile.coord.col, tile.coord.row, &tile.data)?;
            assembly.blit(window.rows.start, window.cols.start, &tile.data);
            written += 1;
            debug!(
                row = tile.coord.row,
                col = tile.coord.col,
                written,
                total,
                "wrote full-resolution tile"
            );
        }
        info!(level = max_level, tiles = written, "full-resolution level done");

        // Lower levels by successive halving down to 1x1.
        let mut level_frame = assembly;
        for level in (0..max_level).rev() {
            level_frame = self.pyramid.downsample(&level_frame, 2)?;
            let level_dir = self.files_dir.join(level.to_string());
            fs::create_dir_all(&level_dir).map_err(|e| SinkError::Io(e.to_string()))?;

            let level_shape =
                FrameShape::new(level_frame.height(), level_frame.width(), self.shape.channels);
            let grid = TileGrid::new(level_shape, self.tile_size)?;
            for coord in grid.coords() {
                let window = grid.window(coord);
                let tile = level_frame.extract(window.rows.clone(), window.cols.clone());
                self.write_tile(&level_dir, coord.col, coord.row, &tile)?;
            }
            info!(
                level,
                width = level_shape.width,
                height = level_shape.height,
                tiles = grid.len(),
                "pyramid level done"
            );
        }

        let descriptor = dzi_descriptor_xml(
            self.shape.width,
            self.shape.height,
            self.tile_size.width,
            self.tile_format,
        );
        fs::write(&self.descriptor_path, descriptor).map_err(|e| SinkError::Io(e.to_string()))?;
        Ok(())
    }

    fn write_tile(
        &self,
        level_dir: &Path,
        col: u32,
        row: u32,
        tile: &TileBuffer,
    ) -> Result<(), ConvertError> {
        let bytes = self.encoder.encode(tile, self.tile_format, self.quality)?;
        let path = level_dir.join(format!("{}_{}.{}", col, row, self.tile_format.extension()));
        fs::write(path, &bytes).map_err(|e| SinkError::Io(e.to_string()))?;
        Ok(())
    }
}
