//! Output writers: the pipeline's consumers.
//!
//! A writer iterates [`TilePipeline::next_tile`], tracks each tile's
//! row-major position, and encodes it into the destination container. The
//! container is selected by destination file extension.

mod deepzoom;
mod encoder;
mod flat;

pub use deepzoom::{dzi_descriptor_xml, dzi_level_dimensions, max_dzi_level, DeepZoomWriter};
pub use encoder::{TileEncoder, TileFormat, DEFAULT_JPEG_QUALITY};
pub use flat::ImageWriter;

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConvertError};
use crate::source::SlideSource;
use crate::tile::TilePipeline;

/// Output container, selected by destination extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `.dzi`: Deep Zoom descriptor plus tile directory, with pyramid.
    DeepZoom,
    /// `.png` / `.jpg` / `.jpeg`: one flat image, no pyramid.
    Flat(TileFormat),
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "dzi" => Ok(OutputFormat::DeepZoom),
            "png" => Ok(OutputFormat::Flat(TileFormat::Png)),
            "jpg" | "jpeg" => Ok(OutputFormat::Flat(TileFormat::Jpeg)),
            _ => Err(ConfigError::UnsupportedOutput(path.display().to_string())),
        }
    }
}

/// Writer behavior shared across containers.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Encoding for Deep Zoom tile files.
    pub tile_format: TileFormat,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Replace an existing destination instead of refusing.
    pub overwrite: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            tile_format: TileFormat::Jpeg,
            quality: DEFAULT_JPEG_QUALITY,
            overwrite: false,
        }
    }
}

/// Drive `pipeline` into the container selected by `dest`'s extension.
pub async fn write_pipeline<S: SlideSource>(
    pipeline: &mut TilePipeline<S>,
    dest: &Path,
    options: &WriterOptions,
) -> Result<(), ConvertError> {
    match OutputFormat::from_path(dest)? {
        OutputFormat::DeepZoom => {
            let writer = DeepZoomWriter::create(
                dest,
                pipeline.frame_shape(),
                pipeline.yield_grid().tile_size(),
                options,
            )?;
            writer.write_from(pipeline).await
        }
        OutputFormat::Flat(format) => {
            let writer = ImageWriter::create(dest, format, options)?;
            writer.write_from(pipeline).await
        }
    }
}

/// Best-effort cleanup of a failed run's destination so a partial output
/// is never left looking complete.
pub fn remove_partial_output(dest: &Path) {
    let _ = fs::remove_file(dest);
    if let Some(stem) = dest.file_stem().and_then(|s| s.to_str()) {
        let files_dir = dest.with_file_name(format!("{stem}_files"));
        if files_dir.is_dir() {
            let _ = fs::remove_dir_all(files_dir);
        }
    }
}
