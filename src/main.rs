//! WSI Converter - convert Whole Slide Images between container formats.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_converter::{
    config::{Cli, Command, ConvertConfig, InfoConfig},
    source::{ImageFileSource, SlideSource},
    store::{MemoryStore, TileStore},
    tile::{PipelineOptions, TileGrid, TilePipeline, TileSize},
    writer::{self, dzi_level_dimensions, max_dzi_level, WriterOptions},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(config) => run_convert(config).await,
        Command::Info(config) => run_info(config),
    }
}

// =============================================================================
// Convert Command
// =============================================================================

async fn run_convert(config: ConvertConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Converting {} -> {}", config.in_path.display(), config.out_path.display());

    let source = match ImageFileSource::open_path(&config.in_path) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Failed to open input: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let shape = source.shape();
    info!(
        "Source: {}x{} pixels, {} channel(s)",
        shape.width, shape.height, shape.channels
    );

    let read_size = TileSize::square(config.read_tile_size);
    let yield_size = TileSize::square(config.tile_size);

    let mut options = PipelineOptions::new(read_size).with_yield_tile_size(yield_size);
    if let Some(workers) = config.workers {
        options = options.with_workers(workers);
    }

    // Differing grids need a randomly addressable staging buffer.
    let store = if read_size != yield_size {
        info!(
            "Re-tiling {}px reads into {}px output tiles via in-memory staging",
            config.read_tile_size, config.tile_size
        );
        Some(Box::new(MemoryStore::new(shape)) as Box<dyn TileStore>)
    } else {
        None
    };

    let mut pipeline = match TilePipeline::new(source, options, store) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let writer_options = WriterOptions {
        tile_format: config.format,
        quality: config.quality,
        overwrite: config.overwrite,
    };

    let started = Instant::now();
    let tiles = pipeline.len();
    match writer::write_pipeline(&mut pipeline, &config.out_path, &writer_options).await {
        Ok(()) => {
            info!(
                "Wrote {} tile(s) to {} in {:.2?}",
                tiles,
                config.out_path.display(),
                started.elapsed()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Conversion failed: {}", e);
            // Never leave a partial output looking complete.
            writer::remove_partial_output(&config.out_path);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = match ImageFileSource::open_path(&config.in_path) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open input: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let shape = source.shape();

    let yield_grid = match TileGrid::new(shape, TileSize::square(config.tile_size)) {
        Ok(grid) => grid,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let read_grid = match TileGrid::new(shape, TileSize::square(config.read_tile_size)) {
        Ok(grid) => grid,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let max_level = max_dzi_level(shape.width, shape.height);

    if config.json {
        let level_dimensions: Vec<_> = (0..=max_level)
            .map(|level| {
                let (w, h) = dzi_level_dimensions(shape.width, shape.height, level, max_level);
                serde_json::json!({ "level": level, "width": w, "height": h })
            })
            .collect();
        let report = serde_json::json!({
            "path": config.in_path.display().to_string(),
            "width": shape.width,
            "height": shape.height,
            "channels": shape.channels,
            "tile_size": config.tile_size,
            "tile_grid": { "rows": yield_grid.rows(), "cols": yield_grid.cols() },
            "read_tile_size": config.read_tile_size,
            "read_grid": { "rows": read_grid.rows(), "cols": read_grid.cols() },
            "deepzoom_levels": max_level + 1,
            "deepzoom_level_dimensions": level_dimensions,
        });
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    } else {
        println!("{}", config.in_path.display());
        println!("  Size: {}x{} pixels, {} channel(s)", shape.width, shape.height, shape.channels);
        println!(
            "  Output grid: {} rows x {} cols of {}px tiles ({} tiles)",
            yield_grid.rows(),
            yield_grid.cols(),
            config.tile_size,
            yield_grid.len()
        );
        println!(
            "  Read grid: {} rows x {} cols of {}px tiles ({} tiles)",
            read_grid.rows(),
            read_grid.cols(),
            config.read_tile_size,
            read_grid.len()
        );
        println!("  Deep Zoom levels: {}", max_level + 1);
        for level in (0..=max_level).rev() {
            let (w, h) = dzi_level_dimensions(shape.width, shape.height, level, max_level);
            println!("    level {:>2}: {}x{}", level, w, h);
        }
    }
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_converter=debug"
    } else {
        "wsi_converter=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
