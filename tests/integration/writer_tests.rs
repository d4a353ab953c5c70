//! Container writers: Deep Zoom trees and flat images.

use std::fs;
use std::sync::Arc;

use wsi_converter::{
    writer, ArraySource, ConvertError, PipelineOptions, SinkError, TileFormat, TilePipeline,
    TileSize, WriterOptions,
};

use super::test_utils::ramp_frame;

fn pipeline_over_ramp(
    height: u32,
    width: u32,
    tile: u32,
) -> TilePipeline<ArraySource> {
    let source = Arc::new(ArraySource::new(ramp_frame(height, width, 3)).unwrap());
    let options = PipelineOptions::new(TileSize::square(tile)).with_workers(2);
    TilePipeline::new(source, options, None).unwrap()
}

fn png_options() -> WriterOptions {
    WriterOptions {
        tile_format: TileFormat::Png,
        ..WriterOptions::default()
    }
}

#[tokio::test]
async fn test_deepzoom_tree_layout() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("slide.dzi");

    let mut pipeline = pipeline_over_ramp(100, 80, 64);
    writer::write_pipeline(&mut pipeline, &dest, &png_options())
        .await
        .unwrap();

    let descriptor = fs::read_to_string(&dest).unwrap();
    assert!(descriptor.contains(r#"TileSize="64""#));
    assert!(descriptor.contains(r#"Format="png""#));
    assert!(descriptor.contains(r#"Width="80""#));
    assert!(descriptor.contains(r#"Height="100""#));

    // max level = ceil(log2(100)) = 7; levels 0..=7 all exist.
    let files_dir = dir.path().join("slide_files");
    for level in 0..=7 {
        assert!(
            files_dir.join(level.to_string()).is_dir(),
            "missing level {}",
            level
        );
    }
    assert!(!files_dir.join("8").exists());

    // Full resolution is a 2x2 grid of 64px tiles.
    let full = files_dir.join("7");
    for name in ["0_0.png", "1_0.png", "0_1.png", "1_1.png"] {
        assert!(full.join(name).is_file(), "missing tile {}", name);
    }

    // The lowest level is a single 1x1 tile.
    let tiny = image::open(files_dir.join("0").join("0_0.png")).unwrap();
    assert_eq!((tiny.width(), tiny.height()), (1, 1));
}

#[tokio::test]
async fn test_deepzoom_full_level_tiles_match_source() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("slide.dzi");

    let mut pipeline = pipeline_over_ramp(100, 80, 64);
    writer::write_pipeline(&mut pipeline, &dest, &png_options())
        .await
        .unwrap();

    let frame = ramp_frame(100, 80, 3);
    let tile = image::open(dir.path().join("slide_files/7/1_1.png"))
        .unwrap()
        .to_rgb8();
    // Bottom-right edge tile: 36 px tall, 16 px wide.
    assert_eq!((tile.height(), tile.width()), (36, 16));
    assert_eq!(tile.into_raw(), frame.extract(64..100, 64..80).into_vec());
}

#[tokio::test]
async fn test_deepzoom_refuses_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("slide.dzi");
    fs::write(&dest, "stale").unwrap();

    let mut pipeline = pipeline_over_ramp(64, 64, 64);
    let err = writer::write_pipeline(&mut pipeline, &dest, &png_options())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Sink(SinkError::AlreadyExists(_))
    ));
    // The stale file is untouched.
    assert_eq!(fs::read_to_string(&dest).unwrap(), "stale");
}

#[tokio::test]
async fn test_deepzoom_overwrite_replaces_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("slide.dzi");
    fs::write(&dest, "stale").unwrap();
    fs::create_dir_all(dir.path().join("slide_files/99")).unwrap();

    let mut pipeline = pipeline_over_ramp(64, 64, 64);
    let options = WriterOptions {
        overwrite: true,
        ..png_options()
    };
    writer::write_pipeline(&mut pipeline, &dest, &options)
        .await
        .unwrap();

    assert!(fs::read_to_string(&dest).unwrap().contains("<Image"));
    assert!(!dir.path().join("slide_files/99").exists());
}

#[tokio::test]
async fn test_flat_png_reproduces_source_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.png");

    let mut pipeline = pipeline_over_ramp(90, 70, 32);
    writer::write_pipeline(&mut pipeline, &dest, &WriterOptions::default())
        .await
        .unwrap();

    let decoded = image::open(&dest).unwrap().to_rgb8();
    assert_eq!((decoded.height(), decoded.width()), (90, 70));
    assert_eq!(decoded.into_raw(), ramp_frame(90, 70, 3).into_vec());
}

#[tokio::test]
async fn test_flat_jpeg_is_decodable() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.jpg");

    let mut pipeline = pipeline_over_ramp(50, 40, 32);
    writer::write_pipeline(&mut pipeline, &dest, &WriterOptions::default())
        .await
        .unwrap();

    let decoded = image::open(&dest).unwrap();
    assert_eq!((decoded.height(), decoded.width()), (50, 40));
}

#[tokio::test]
async fn test_flat_writer_honors_overwrite_flag() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.png");
    fs::write(&dest, "stale").unwrap();

    let mut pipeline = pipeline_over_ramp(32, 32, 32);
    let err = writer::write_pipeline(&mut pipeline, &dest, &WriterOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Sink(SinkError::AlreadyExists(_))
    ));

    let mut pipeline = pipeline_over_ramp(32, 32, 32);
    let options = WriterOptions {
        overwrite: true,
        ..WriterOptions::default()
    };
    writer::write_pipeline(&mut pipeline, &dest, &options)
        .await
        .unwrap();
    assert!(image::open(&dest).is_ok());
}

#[tokio::test]
async fn test_unsupported_destination_extension() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.zarr");
    let mut pipeline = pipeline_over_ramp(32, 32, 32);
    let err = writer::write_pipeline(&mut pipeline, &dest, &WriterOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Config(_)));
}

#[test]
fn test_remove_partial_output_cleans_tree() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("slide.dzi");
    fs::write(&dest, "partial").unwrap();
    fs::create_dir_all(dir.path().join("slide_files/7")).unwrap();

    writer::remove_partial_output(&dest);
    assert!(!dest.exists());
    assert!(!dir.path().join("slide_files").exists());
}
