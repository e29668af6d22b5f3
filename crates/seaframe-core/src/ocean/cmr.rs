use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::{write_json_cache, FetchError, TemporalRange};

/// How a collection is named in a granule query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionRef {
    /// Human-readable short name, e.g. `MODIS_A-JPL-L2P-v2019.0`.
    ShortName(String),
    /// CMR concept id, e.g. `C2036877509-POCLOUD`.
    ConceptId(String),
}

impl CollectionRef {
    fn query_key(&self) -> &'static str {
        match self {
            CollectionRef::ShortName(_) => "short_name",
            CollectionRef::ConceptId(_) => "collection_concept_id",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CollectionRef::ShortName(name) | CollectionRef::ConceptId(name) => name,
        }
    }
}

/// Connection settings for the granule search endpoint.
#[derive(Debug, Clone)]
pub struct CmrConfig {
    pub search_url: String,
    pub collections: Vec<CollectionRef>,
    pub page_size: u32,
    /// Earthdata bearer token, sent only when set.
    pub token: Option<String>,
}

impl Default for CmrConfig {
    fn default() -> Self {
        Self {
            search_url: "https://cmr.earthdata.nasa.gov/search/granules.json".to_string(),
            collections: vec![
                CollectionRef::ShortName("MODIS_A-JPL-L2P-v2019.0".to_string()),
                CollectionRef::ShortName("VIIRS_NPP-OSPO-L2P-v2.61".to_string()),
            ],
            page_size: 10,
            token: None,
        }
    }
}

/// Granules found for one collection and where their metadata was cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub collection: String,
    pub count: usize,
    pub metadata_file: PathBuf,
}

pub struct GranuleSearch {
    client: Client,
    config: CmrConfig,
}

impl GranuleSearch {
    pub fn new(config: CmrConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(Client::builder().build()?, config))
    }

    /// Use a preconfigured client, e.g. one with timeouts or proxy settings.
    pub fn with_client(client: Client, config: CmrConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &CmrConfig {
        &self.config
    }

    /// Query every configured collection. Collections that fail are logged
    /// and left out of the result.
    pub fn search_all(&self, range: &TemporalRange, output_dir: &Path) -> Vec<CollectionSummary> {
        let mut results = Vec::new();
        for collection in &self.config.collections {
            info!(collection = collection.name(), "searching for granules");
            match self.search_collection(collection, range, output_dir) {
                Ok(summary) => results.push(summary),
                Err(FetchError::Status { status, url }) => {
                    error!(collection = collection.name(), %status, %url, "granule search rejected");
                }
                Err(e) => {
                    error!(collection = collection.name(), error = %e, "granule search failed");
                }
            }
        }
        results
    }

    /// Query one collection and cache its `feed.entry` list as
    /// `<output_dir>/<collection>_metadata.json`.
    pub fn search_collection(
        &self,
        collection: &CollectionRef,
        range: &TemporalRange,
        output_dir: &Path,
    ) -> Result<CollectionSummary, FetchError> {
        let page_size = self.config.page_size.to_string();
        let temporal = range.to_query();
        let params = [
            (collection.query_key(), collection.name()),
            ("temporal", temporal.as_str()),
            ("page_size", page_size.as_str()),
        ];

        let mut request = self.client.get(&self.config.search_url).query(&params);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        let body: Value = serde_json::from_str(&response.text()?)?;
        let entries = granule_entries(body);
        let count = entries.as_array().map_or(0, Vec::len);
        if count == 0 {
            warn!(collection = collection.name(), "no granules found");
        } else {
            info!(collection = collection.name(), count, "found granules");
        }

        let metadata_file = output_dir.join(format!("{}_metadata.json", collection.name()));
        write_json_cache(&metadata_file, &entries)?;

        Ok(CollectionSummary {
            collection: collection.name().to_string(),
            count,
            metadata_file,
        })
    }
}

/// `feed.entry` from a granule search response, or an empty list.
fn granule_entries(mut body: Value) -> Value {
    match body.pointer_mut("/feed/entry").map(Value::take) {
        Some(entries @ Value::Array(_)) => entries,
        _ => Value::Array(Vec::new()),
    }
}
