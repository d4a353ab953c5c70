//! Pyramid construction over a pluggable resampling strategy.

mod resample;

pub use resample::{default_resampler, AreaAverage, Resampler};

#[cfg(feature = "parallel")]
pub use resample::ParallelAreaAverage;

use tracing::debug;

use crate::error::ConfigError;
use crate::frame::TileBuffer;

/// Produces lower-resolution copies of a frame, one per downsample factor.
pub struct PyramidBuilder {
    resampler: Box<dyn Resampler>,
}

impl PyramidBuilder {
    /// Builder with the best compiled-in resampler.
    pub fn new() -> Self {
        Self {
            resampler: default_resampler(),
        }
    }

    pub fn with_resampler(resampler: Box<dyn Resampler>) -> Self {
        Self { resampler }
    }

    pub fn resampler_name(&self) -> &'static str {
        self.resampler.name()
    }

    /// One downsampled copy of `frame` per factor, each computed from the
    /// full-resolution input.
    pub fn build(
        &self,
        frame: &TileBuffer,
        factors: &[u32],
    ) -> Result<Vec<TileBuffer>, ConfigError> {
        factors
            .iter()
            .map(|&factor| {
                debug!(factor, resampler = self.resampler.name(), "building level");
                self.resampler.downsample(frame, factor)
            })
            .collect()
    }

    /// Downsample by a single factor.
    pub fn downsample(&self, frame: &TileBuffer, factor: u32) -> Result<TileBuffer, ConfigError> {
        self.resampler.downsample(frame, factor)
    }
}

impl Default for PyramidBuilder {
    fn default() -> Self {
        Self::new()
    }
}
