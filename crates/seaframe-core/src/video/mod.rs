pub mod decoder;
pub mod frame;
pub mod sequence;

use crate::error::Result;
use frame::Frame;

/// Anything that yields decoded frames in source order.
pub trait FrameSource {
    /// Frames per second reported by the source, or None if it has no timing.
    fn frame_rate(&self) -> Option<f64>;

    /// Decode the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
