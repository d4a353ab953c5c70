//! Fatal error propagation and teardown.

use std::sync::Arc;
use std::time::Duration;

use wsi_converter::{
    PipelineError, PipelineOptions, PipelineState, SourceError, TileCoord, TilePipeline, TileSize,
};

use super::test_utils::{collect_tiles, ramp_frame, FailingSource, TrackingSource};

#[tokio::test]
async fn test_failed_fetch_aborts_the_run() {
    // The read for tile (1, 0) fails; the pipeline must surface that
    // coordinate's SourceError and leave no live worker handles behind.
    let fail_coord = TileCoord::new(1, 0);
    let source = Arc::new(FailingSource::new(
        ramp_frame(1000, 1000, 3),
        fail_coord,
        TileSize::square(512),
    ));
    let options = PipelineOptions::new(TileSize::square(512)).with_workers(3);
    let mut pipeline = TilePipeline::new(Arc::clone(&source), options, None).unwrap();

    let mut failure = None;
    for _ in 0..pipeline.len() {
        match pipeline.next_tile().await {
            Ok(_) => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    assert!(matches!(
        failure,
        Some(PipelineError::Source(SourceError::Read { coord, .. })) if coord == fail_coord
    ));
    assert_eq!(pipeline.in_flight(), 0);

    // Aborted tasks drop their readers shortly after shutdown.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.live_handles(), 0);
}

#[tokio::test]
async fn test_no_retry_after_failure() {
    // Stepping again after the fatal error must repeat the same error
    // without resurrecting workers or opening new source handles.
    let fail_coord = TileCoord::new(0, 0);
    let source = Arc::new(FailingSource::new(
        ramp_frame(200, 200, 1),
        fail_coord,
        TileSize::square(100),
    ));
    let options = PipelineOptions::new(TileSize::square(100)).with_workers(2);
    let mut pipeline = TilePipeline::new(Arc::clone(&source), options, None).unwrap();

    assert!(pipeline.next_tile().await.is_err());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.live_handles(), 0);
    let opens_after_failure = source.total_opens();

    for _ in 0..3 {
        assert!(matches!(
            pipeline.next_tile().await,
            Err(PipelineError::Source(SourceError::Read { coord, .. })) if coord == fail_coord
        ));
    }
    assert_eq!(pipeline.in_flight(), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.total_opens(), opens_after_failure);
    assert_eq!(source.live_handles(), 0);
}

#[tokio::test]
async fn test_exhaustion_error_after_completion() {
    let source = Arc::new(TrackingSource::new(ramp_frame(100, 100, 3), Duration::ZERO));
    let options = PipelineOptions::new(TileSize::square(64)).with_workers(2);
    let mut pipeline = TilePipeline::new(source, options, None).unwrap();

    let tiles = collect_tiles(&mut pipeline).await;
    assert_eq!(tiles.len(), 4);
    assert_eq!(pipeline.state(), PipelineState::Exhausted);
    assert!(matches!(
        pipeline.next_tile().await,
        Err(PipelineError::Exhausted)
    ));
    // The error is sticky.
    assert!(matches!(
        pipeline.next_tile().await,
        Err(PipelineError::Exhausted)
    ));
}

#[tokio::test]
async fn test_early_drop_releases_workers() {
    // Abandon iteration after one tile; outstanding fetches must be
    // cancelled when the pipeline is dropped.
    let source = Arc::new(TrackingSource::new(
        ramp_frame(800, 800, 3),
        Duration::from_millis(20),
    ));
    let options = PipelineOptions::new(TileSize::square(100)).with_workers(4);
    {
        let mut pipeline = TilePipeline::new(Arc::clone(&source), options, None).unwrap();
        let first = pipeline.next_tile().await.unwrap();
        assert!(first.is_some());
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.live_handles(), 0);
}

#[tokio::test]
async fn test_fetch_timeout_fails_the_run() {
    // Every read sleeps longer than the timeout budget.
    let source = Arc::new(TrackingSource::new(
        ramp_frame(200, 200, 3),
        Duration::from_millis(200),
    ));
    let options = PipelineOptions::new(TileSize::square(100))
        .with_workers(2)
        .with_fetch_timeout(Duration::from_millis(20));
    let mut pipeline = TilePipeline::new(source, options, None).unwrap();
    assert!(matches!(
        pipeline.next_tile().await,
        Err(PipelineError::Source(SourceError::Timeout { .. }))
    ));
}
