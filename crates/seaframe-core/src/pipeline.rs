use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::downsample::{self, Downsampler};
use crate::error::{Error, Result};
use crate::video::decoder::VideoDecoder;
use crate::video::sequence::ImageSequence;
use crate::video::FrameSource;
use crate::writer::FrameWriter;

/// Parameters for extracting frames from a video.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Desired output rate. The kept rate may be higher when the source
    /// rate is not an exact multiple.
    pub target_fps: f64,
    /// Output file name prefix.
    pub prefix: String,
    /// Clamp frames wider than this, or None to keep source size.
    pub max_width: Option<u32>,
    /// Log progress every N kept frames (0 disables).
    pub progress_every: u32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            target_fps: 10.0,
            prefix: "video_frame".to_string(),
            max_width: None,
            progress_every: 10,
        }
    }
}

/// Parameters for converting a still-image sequence.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Input file extension, without the dot.
    pub extension: String,
    pub prefix: String,
    pub max_width: Option<u32>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            extension: "exr".to_string(),
            prefix: "frame".to_string(),
            max_width: Some(4096),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub decoded: u32,
    pub kept: u32,
    pub stride: u32,
    pub output_dir: PathBuf,
}

/// Extract frames from a video at roughly `target_fps`.
///
/// Fails before writing anything if the video has no usable frame rate.
pub fn extract_video(input: &Path, output_dir: &Path, config: &ExtractConfig) -> Result<RunSummary> {
    info!(?input, ?output_dir, target_fps = config.target_fps, "extraction starting");

    let mut decoder = VideoDecoder::open(input)?;
    let stride = source_stride(decoder.frame_rate(), config.target_fps)?;
    info!(
        width = decoder.width(),
        height = decoder.height(),
        source_fps = ?decoder.frame_rate(),
        stride,
        effective_fps = ?decoder.frame_rate().map(|fps| fps.round() / stride as f64),
        "stride computed"
    );

    let writer = FrameWriter::new(output_dir, &config.prefix, config.max_width)?;
    let summary = run_frames(&mut decoder, Downsampler::new(stride), &writer, config.progress_every)?;

    info!(decoded = summary.decoded, kept = summary.kept, stride, ?output_dir, "extraction complete");
    Ok(summary)
}

/// Convert every image with the configured extension in `input_dir`, in name order.
pub fn convert_sequence(input_dir: &Path, output_dir: &Path, config: &ConvertConfig) -> Result<RunSummary> {
    info!(?input_dir, ?output_dir, extension = %config.extension, max_width = ?config.max_width, "conversion starting");

    let mut sequence = ImageSequence::open(input_dir, &config.extension)?;
    if sequence.is_empty() {
        warn!(?input_dir, extension = %config.extension, "no input images found");
    }

    let writer = FrameWriter::new(output_dir, &config.prefix, config.max_width)?;
    let summary = run_frames(&mut sequence, Downsampler::passthrough(), &writer, 1)?;

    info!(converted = summary.kept, ?output_dir, "conversion complete");
    Ok(summary)
}

/// Stride for a probed video. The probed rate is rounded to whole frames per
/// second first, so 29.97 fps behaves like 30.
fn source_stride(source_fps: Option<f64>, target_fps: f64) -> Result<u32> {
    let Some(fps) = source_fps else {
        return Err(Error::MissingFrameRate(None));
    };
    let rounded = fps.round();
    if rounded <= 0.0 {
        return Err(Error::MissingFrameRate(Some(fps)));
    }
    downsample::stride(rounded, target_fps)
}

/// Pull every frame from `source`, keep the ones the downsampler selects, and
/// write them under their output index. Any decode or write failure aborts.
pub fn run_frames(
    source: &mut dyn FrameSource,
    mut downsampler: Downsampler,
    writer: &FrameWriter,
    progress_every: u32,
) -> Result<RunSummary> {
    let mut decoded = 0u32;

    while let Some(frame) = source.next_frame()? {
        decoded += 1;

        let Some(output_index) = downsampler.keep(frame.source_index)? else {
            continue;
        };

        let path = writer.write(&frame.image, output_index)?;

        if progress_every > 0 && output_index % progress_every == 0 {
            info!(source_index = frame.source_index, output_index, ?path, "saved frame");
        }
    }

    Ok(RunSummary {
        decoded,
        kept: downsampler.kept(),
        stride: downsampler.stride(),
        output_dir: writer.dir().to_path_buf(),
    })
}
