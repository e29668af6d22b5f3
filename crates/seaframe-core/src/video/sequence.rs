use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::frame::Frame;
use super::FrameSource;
use crate::error::{Error, Result};

/// An ordered directory of still images, decoded one file at a time.
pub struct ImageSequence {
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    /// List every file in `dir` with the given extension (case-insensitive),
    /// sorted by file name.
    pub fn open(dir: &Path, extension: &str) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::MissingInput(dir.to_path_buf()));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if path.is_file() && has_extension(&path, extension) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        info!(?dir, extension, file_count = files.len(), "image sequence opened");
        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

impl FrameSource for ImageSequence {
    fn frame_rate(&self) -> Option<f64> {
        None
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };

        let image = image::open(path).map_err(|e| Error::Decode {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let source_index = self.next as u32;
        self.next += 1;

        debug!(?path, source_index, width = image.width(), height = image.height(), "decoded image");
        Ok(Some(Frame {
            image,
            source_index,
        }))
    }
}
