use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a conversion, extraction or manifest run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to probe {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("source does not report a usable frame rate (got {0:?})")]
    MissingFrameRate(Option<f64>),

    #[error("target frame rate must be positive, got {0}")]
    InvalidTargetFps(f64),

    #[error("source frames must arrive in order: expected index {expected}, got {got}")]
    FrameOrder { expected: u32, got: u32 },

    #[error("output index {index} does not fit in {width} digits")]
    IndexOverflow { index: u32, width: usize },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
