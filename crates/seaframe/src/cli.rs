use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "seaframe", about = "Frame and ocean-data asset pipeline for the VR viewer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract frames from a video at a target frame rate.
    Extract {
        /// Path to the input video file (MP4, etc.).
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write numbered PNG frames into.
        #[arg(short, long, default_value = "assets/data_processed/frames")]
        output: PathBuf,

        /// Desired frames per second; every Nth source frame is kept.
        #[arg(long, default_value_t = 10.0)]
        target_fps: f64,

        /// Output file name prefix.
        #[arg(long, default_value = "video_frame")]
        prefix: String,

        /// Downscale frames wider than this.
        #[arg(long)]
        max_width: Option<u32>,
    },

    /// Convert an ordered image sequence (EXR by default) to PNG.
    Convert {
        /// Directory holding the source images.
        #[arg(short, long, default_value = "data_raw/exr")]
        input: PathBuf,

        #[arg(short, long, default_value = "data_processed/frames")]
        output: PathBuf,

        /// Extension of the source images.
        #[arg(long, default_value = "exr")]
        extension: String,

        #[arg(long, default_value = "frame")]
        prefix: String,

        /// Downscale frames wider than this; 0 disables clamping.
        #[arg(long, default_value_t = 4096)]
        max_width: u32,
    },

    /// Write metadata.json describing the frames in a directory.
    Manifest {
        /// Directory of PNG frames to list.
        #[arg(short, long, default_value = "data_processed/frames")]
        dir: PathBuf,

        /// Path of the manifest to write.
        #[arg(short, long, default_value = "data_processed/metadata.json")]
        output: PathBuf,

        #[arg(long)]
        dataset: Option<String>,

        /// Nominal playback rate recorded for the viewer.
        #[arg(long)]
        frame_rate: Option<u32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Search NASA CMR for sea-surface-temperature granules in a time range.
    Granules {
        /// Range start, e.g. 2020-06-10T11:52:20Z.
        #[arg(long)]
        start: DateTime<Utc>,

        /// Range end, e.g. 2020-06-17T11:52:20Z.
        #[arg(long)]
        end: DateTime<Utc>,

        /// Directory for the per-collection metadata files.
        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        /// Collection short name to query (repeatable). Defaults to MODIS Aqua and VIIRS SST.
        #[arg(long = "collection")]
        collections: Vec<String>,

        /// Collection concept id to query (repeatable).
        #[arg(long = "concept-id")]
        concept_ids: Vec<String>,

        /// Granules per collection.
        #[arg(long, default_value_t = 10)]
        page_size: u32,

        /// Earthdata bearer token.
        #[arg(long, env = "EARTHDATA_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Fetch PO.DAAC sea-surface-temperature dataset metadata for one day.
    OceanTemp {
        /// Day to query (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Directory holding ocean_temp_<date>.json files.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        #[arg(long)]
        dataset_id: Option<String>,
    },

    /// Print the sea-surface-temperature visualization URLs as JSON.
    VizUrls,
}

/// Maps the `--max-width` flag to a clamp width, where 0 means no clamp.
pub fn width_limit(max_width: u32) -> Option<u32> {
    (max_width > 0).then_some(max_width)
}
