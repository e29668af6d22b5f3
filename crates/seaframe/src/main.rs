mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use seaframe_core::manifest::{self, ManifestConfig};
use seaframe_core::ocean::cmr::{CmrConfig, CollectionRef, GranuleSearch};
use seaframe_core::ocean::podaac::{OceanTempFetcher, PodaacConfig};
use seaframe_core::ocean::{TemporalRange, VisualizationUrls};
use seaframe_core::pipeline::{self, ConvertConfig, ExtractConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Extract {
            input,
            output,
            target_fps,
            prefix,
            max_width,
        } => {
            let config = ExtractConfig {
                target_fps,
                prefix,
                max_width,
                ..ExtractConfig::default()
            };

            let summary = pipeline::extract_video(&input, &output, &config)
                .with_context(|| format!("failed to extract frames from {}", input.display()))?;

            info!(
                kept = summary.kept,
                stride = summary.stride,
                output = ?summary.output_dir,
                "frames saved (every {}th frame)",
                summary.stride
            );
            Ok(())
        }

        cli::Command::Convert {
            input,
            output,
            extension,
            prefix,
            max_width,
        } => {
            let config = ConvertConfig {
                extension,
                prefix,
                max_width: cli::width_limit(max_width),
            };

            let summary = pipeline::convert_sequence(&input, &output, &config)
                .with_context(|| format!("failed to convert images in {}", input.display()))?;

            if summary.kept == 0 {
                warn!(?input, "nothing converted");
            }
            Ok(())
        }

        cli::Command::Manifest {
            dir,
            output,
            dataset,
            frame_rate,
            notes,
        } => {
            let defaults = ManifestConfig::default();
            let config = ManifestConfig {
                dataset: dataset.unwrap_or(defaults.dataset),
                frame_rate: frame_rate.unwrap_or(defaults.frame_rate),
                notes: notes.unwrap_or(defaults.notes),
                extension: defaults.extension,
            };

            let m = manifest::build_manifest(&dir, &config)
                .with_context(|| format!("failed to scan {}", dir.display()))?;
            manifest::write_manifest(&m, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            Ok(())
        }

        cli::Command::Granules {
            start,
            end,
            output,
            collections,
            concept_ids,
            page_size,
            token,
        } => {
            let mut config = CmrConfig {
                page_size,
                token,
                ..CmrConfig::default()
            };
            if !collections.is_empty() || !concept_ids.is_empty() {
                config.collections = collections
                    .into_iter()
                    .map(CollectionRef::ShortName)
                    .chain(concept_ids.into_iter().map(CollectionRef::ConceptId))
                    .collect();
            }

            let range = TemporalRange::new(start, end);
            info!(range = %range.to_query(), "downloading NASA ocean data");

            let search = GranuleSearch::new(config).context("failed to build http client")?;
            let results = search.search_all(&range, &output);

            for r in &results {
                info!(collection = %r.collection, count = r.count, metadata = ?r.metadata_file, "summary");
            }
            if results.is_empty() {
                warn!("no collection returned granules");
            }
            Ok(())
        }

        cli::Command::OceanTemp {
            date,
            cache_dir,
            dataset_id,
        } => {
            let defaults = PodaacConfig::default();
            let config = PodaacConfig {
                dataset_id: dataset_id.unwrap_or(defaults.dataset_id),
                cache_dir,
                ..defaults
            };

            let fetcher = OceanTempFetcher::new(config).context("failed to build http client")?;
            let result = match date {
                Some(date) => fetcher.fetch(date),
                None => fetcher.fetch_today(),
            };

            // The fetcher already logged the reason; absence is not fatal.
            if result.is_err() {
                warn!("no ocean temperature data available");
            }
            Ok(())
        }

        cli::Command::VizUrls => {
            let urls = serde_json::to_string_pretty(&VisualizationUrls::default())
                .context("failed to serialize visualization urls")?;
            println!("{urls}");
            Ok(())
        }
    }
}
