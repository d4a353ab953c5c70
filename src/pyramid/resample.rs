//! Area-averaging resamplers.
//!
//! Both backends run the same per-pixel arithmetic; the parallel one only
//! distributes output rows across threads. Results are bit-identical, so
//! backend choice can never change what gets written.

use crate::error::ConfigError;
use crate::frame::TileBuffer;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Integer-factor downsampling strategy.
pub trait Resampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Downsample `frame` by an integer `factor` using area averaging.
    ///
    /// Output dimensions are `ceil(dim / factor)`; edge cells average the
    /// in-bounds samples only. Rejects a zero factor.
    fn downsample(&self, frame: &TileBuffer, factor: u32) -> Result<TileBuffer, ConfigError>;
}

/// Compute one output row of the area average.
fn averaged_row(src: &TileBuffer, factor: u32, out_row: u32, out_width: u32) -> Vec<u8> {
    let ch = src.channels() as usize;
    let row_start = out_row * factor;
    let row_end = (row_start + factor).min(src.height());
    let mut out = vec![0u8; out_width as usize * ch];
    for out_col in 0..out_width {
        let col_start = out_col * factor;
        let col_end = (col_start + factor).min(src.width());
        let count = ((row_end - row_start) as u64) * ((col_end - col_start) as u64);
        for c in 0..ch {
            let mut sum: u64 = 0;
            for r in row_start..row_end {
                let row = src.row(r);
                for col in col_start..col_end {
                    sum += u64::from(row[col as usize * ch + c]);
                }
            }
            // Round to nearest
            out[out_col as usize * ch + c] = ((sum + count / 2) / count) as u8;
        }
    }
    out
}

fn output_shape(src: &TileBuffer, factor: u32) -> (u32, u32) {
    (
        src.height().div_ceil(factor).max(1),
        src.width().div_ceil(factor).max(1),
    )
}

fn check_factor(factor: u32) -> Result<(), ConfigError> {
    if factor == 0 {
        return Err(ConfigError::ZeroDownsampleFactor(factor));
    }
    Ok(())
}

/// Single-threaded area averaging. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaAverage;

impl Resampler for AreaAverage {
    fn name(&self) -> &'static str {
        "area-average"
    }

    fn downsample(&self, frame: &TileBuffer, factor: u32) -> Result<TileBuffer, ConfigError> {
        check_factor(factor)?;
        if factor == 1 {
            return Ok(frame.clone());
        }
        let (out_h, out_w) = output_shape(frame, factor);
        let mut data = Vec::with_capacity(out_h as usize * out_w as usize * frame.channels() as usize);
        for out_row in 0..out_h {
            data.extend_from_slice(&averaged_row(frame, factor, out_row, out_w));
        }
        Ok(TileBuffer::from_vec(data, out_h, out_w, frame.channels()))
    }
}

/// Rayon-parallel area averaging, row-distributed.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelAreaAverage;

#[cfg(feature = "parallel")]
impl Resampler for ParallelAreaAverage {
    fn name(&self) -> &'static str {
        "area-average-parallel"
    }

    fn downsample(&self, frame: &TileBuffer, factor: u32) -> Result<TileBuffer, ConfigError> {
        check_factor(factor)?;
        if factor == 1 {
            return Ok(frame.clone());
        }
        let (out_h, out_w) = output_shape(frame, factor);
        let data: Vec<u8> = (0..out_h)
            .into_par_iter()
            .flat_map_iter(|out_row| averaged_row(frame, factor, out_row, out_w))
            .collect();
        Ok(TileBuffer::from_vec(data, out_h, out_w, frame.channels()))
    }
}

/// The best resampler compiled into this build.
pub fn default_resampler() -> Box<dyn Resampler> {
    #[cfg(feature = "parallel")]
    {
        Box::new(ParallelAreaAverage)
    }
    #[cfg(not(feature = "parallel"))]
    {
        Box::new(AreaAverage)
    }
}
