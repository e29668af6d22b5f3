pub mod downsample;
pub mod error;
pub mod manifest;
pub mod ocean;
pub mod pipeline;
pub mod video;
pub mod writer;

pub use error::{Error, Result};
