use tracing::info;

use crate::error::{Error, Result};

/// Integer spacing between kept source frames: `max(1, floor(source / target))`.
///
/// The effective kept rate is `source_fps / stride`, which is at least
/// `target_fps` whenever the rates do not divide evenly. A target at or above
/// the source rate keeps every frame.
pub fn stride(source_fps: f64, target_fps: f64) -> Result<u32> {
    if !source_fps.is_finite() || source_fps <= 0.0 {
        return Err(Error::MissingFrameRate(Some(source_fps)));
    }
    if !target_fps.is_finite() || target_fps <= 0.0 {
        return Err(Error::InvalidTargetFps(target_fps));
    }

    if target_fps >= source_fps {
        return Ok(1);
    }

    let ratio = (source_fps / target_fps).floor();
    Ok((ratio as u32).max(1))
}

/// Decides which source frames to keep and assigns them contiguous output indices.
#[derive(Debug)]
pub struct Downsampler {
    stride: u32,
    next_source: u32,
    kept: u32,
}

impl Downsampler {
    pub fn new(stride: u32) -> Self {
        let stride = stride.max(1);
        info!(stride, "downsampler ready");
        Self {
            stride,
            next_source: 0,
            kept: 0,
        }
    }

    /// Keep every frame.
    pub fn passthrough() -> Self {
        Self::new(1)
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of frames kept so far.
    pub fn kept(&self) -> u32 {
        self.kept
    }

    /// Offer the next source frame. Returns its output index if kept.
    ///
    /// Source indices must arrive as 0, 1, 2, ... with no gaps.
    pub fn keep(&mut self, source_index: u32) -> Result<Option<u32>> {
        if source_index != self.next_source {
            return Err(Error::FrameOrder {
                expected: self.next_source,
                got: source_index,
            });
        }
        self.next_source += 1;

        if source_index % self.stride != 0 {
            return Ok(None);
        }

        let output_index = self.kept;
        self.kept += 1;
        Ok(Some(output_index))
    }
}
