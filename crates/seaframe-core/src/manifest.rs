use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Fixed labels written into every manifest.
#[derive(Debug, Clone)]
pub struct ManifestConfig {
    pub dataset: String,
    /// Nominal playback rate for the viewer; not derived from the frames.
    pub frame_rate: u32,
    pub notes: String,
    /// Frame file extension to scan for, without the dot.
    pub extension: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            dataset: "NASA PACE + SWOT Visualization".to_string(),
            frame_rate: 24,
            notes: "EXR converted to PNG, downsampled for VR.".to_string(),
            extension: "png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub index: u32,
}

/// Ordered frame listing consumed by the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub dataset: String,
    pub frame_rate: u32,
    pub frames: Vec<ManifestEntry>,
    pub notes: String,
}

/// List frame files in `dir` sorted by name. Each entry's index is its rank
/// in that order, so the mapping only holds while names share one padding width.
pub fn scan_frames(dir: &Path, extension: &str) -> Result<Vec<ManifestEntry>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!(?name, "skipping frame with non-utf8 file name"),
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, file)| ManifestEntry {
            file,
            index: i as u32,
        })
        .collect())
}

pub fn build_manifest(dir: &Path, config: &ManifestConfig) -> Result<Manifest> {
    let frames = scan_frames(dir, &config.extension)?;
    info!(?dir, frame_count = frames.len(), "scanned frame directory");

    Ok(Manifest {
        dataset: config.dataset.clone(),
        frame_rate: config.frame_rate,
        frames,
        notes: config.notes.clone(),
    })
}

/// Write the manifest as pretty JSON, replacing any previous file.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json).map_err(|e| Error::io(path, e))?;

    info!(?path, frame_count = manifest.frames.len(), "manifest written");
    Ok(())
}
