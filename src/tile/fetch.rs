//! Bounded tile-fetch worker pool.
//!
//! Each submitted coordinate becomes one tokio task. The task opens its
//! own source handle, reads the clipped pixel window for the coordinate,
//! and publishes `(coordinate, result)` on an unbounded mpsc channel.
//! Read failures are published like tiles and become fatal when drained;
//! nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::SourceError;
use crate::frame::{PixelWindow, TileBuffer};
use crate::source::{RegionReader, SlideSource};

use super::grid::{TileCoord, TileGrid};

/// One completion published by a worker task.
pub type FetchResult = (TileCoord, Result<TileBuffer, SourceError>);

/// Bounded pool of in-flight tile fetches.
///
/// The pending set (coordinates dispatched but not yet drained) never grows
/// past the worker budget: [`FetchPool::submit`] is a no-op at capacity.
pub struct FetchPool<S: SlideSource> {
    source: Arc<S>,
    read_grid: TileGrid,
    budget: usize,
    fetch_timeout: Option<Duration>,
    tx: mpsc::UnboundedSender<FetchResult>,
    tasks: HashMap<TileCoord, JoinHandle<()>>,
}

impl<S: SlideSource> FetchPool<S> {
    /// Create a pool and the receiving end of its result channel.
    pub fn new(
        source: Arc<S>,
        read_grid: TileGrid,
        budget: usize,
        fetch_timeout: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<FetchResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                source,
                read_grid,
                budget,
                fetch_timeout,
                tx,
                tasks: HashMap::new(),
            },
            rx,
        )
    }

    /// Number of coordinates dispatched but not yet marked done.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Dispatch a fetch for `coord` if the pool is below budget.
    ///
    /// Returns `false` (no-op) when at budget or when `coord` is already
    /// in flight.
    pub fn submit(&mut self, coord: TileCoord) -> bool {
        if self.tasks.len() >= self.budget || self.tasks.contains_key(&coord) {
            return false;
        }
        debug!(row = coord.row, col = coord.col, "submitting tile fetch");
        let source = Arc::clone(&self.source);
        let window = self.read_grid.window(coord);
        let timeout = self.fetch_timeout;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let result = fetch_one(source, coord, window, timeout).await;
            // The receiver only closes on shutdown; a failed send means the
            // result is no longer wanted.
            let _ = tx.send((coord, result));
        });
        self.tasks.insert(coord, handle);
        true
    }

    /// Remove `coord` from the pending set once its result has been drained.
    pub fn mark_done(&mut self, coord: TileCoord) {
        self.tasks.remove(&coord);
    }

    /// Pending coordinates whose task has finished.
    ///
    /// A worker sends its result before returning, so a finished task whose
    /// coordinate is still pending after a subsequent drain has panicked.
    pub fn finished_pending(&self) -> Vec<TileCoord> {
        self.tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(coord, _)| *coord)
            .collect()
    }

    /// Abort every outstanding task and clear the pending set.
    pub fn shutdown(&mut self) {
        for (coord, handle) in self.tasks.drain() {
            debug!(row = coord.row, col = coord.col, "aborting in-flight fetch");
            handle.abort();
        }
    }
}

impl<S: SlideSource> Drop for FetchPool<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The body of one worker task: open a fresh handle, read one window.
async fn fetch_one<S: SlideSource>(
    source: Arc<S>,
    coord: TileCoord,
    window: PixelWindow,
    fetch_timeout: Option<Duration>,
) -> Result<TileBuffer, SourceError> {
    let read = async {
        let mut reader = source.open().await?;
        reader.read_window(&window).await
    };
    match fetch_timeout {
        None => read.await,
        Some(limit) => match tokio::time::timeout(limit, read).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout { coord }),
        },
    }
}
