use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{error, info};

use super::{write_json_cache, FetchError};

#[derive(Debug, Clone)]
pub struct PodaacConfig {
    pub search_url: String,
    pub dataset_id: String,
    pub items_per_page: u32,
    /// Directory holding one `ocean_temp_<date>.json` per queried date.
    pub cache_dir: PathBuf,
}

impl Default for PodaacConfig {
    fn default() -> Self {
        Self {
            search_url: "https://podaac.jpl.nasa.gov/ws/search/dataset".to_string(),
            dataset_id: "MODIS_A-JPL-L2P-v2019.0".to_string(),
            items_per_page: 1,
            cache_dir: PathBuf::from("cache"),
        }
    }
}

/// Raw dataset metadata for one day, as cached on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSnapshot {
    pub date: NaiveDate,
    pub payload: Value,
    pub cache_file: PathBuf,
}

/// Single-date sea-surface-temperature dataset lookup.
pub struct OceanTempFetcher {
    client: Client,
    config: PodaacConfig,
}

impl OceanTempFetcher {
    pub fn new(config: PodaacConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(Client::builder().build()?, config))
    }

    /// Use a preconfigured client, e.g. one with timeouts or proxy settings.
    pub fn with_client(client: Client, config: PodaacConfig) -> Self {
        Self { client, config }
    }

    pub fn cache_file(&self, date: NaiveDate) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("ocean_temp_{}.json", date.format("%Y-%m-%d")))
    }

    /// Fetch metadata for today's date in local time.
    pub fn fetch_today(&self) -> Result<DatasetSnapshot, FetchError> {
        self.fetch(Local::now().date_naive())
    }

    /// Fetch dataset metadata for `date` and overwrite its cache file.
    ///
    /// Any failure means no data is available for that date.
    pub fn fetch(&self, date: NaiveDate) -> Result<DatasetSnapshot, FetchError> {
        let result = self.fetch_inner(date);
        match &result {
            Ok(snapshot) => info!(%date, cache_file = ?snapshot.cache_file, "ocean temperature data fetched"),
            Err(e) => error!(%date, error = %e, "failed to fetch ocean temperature data"),
        }
        result
    }

    fn fetch_inner(&self, date: NaiveDate) -> Result<DatasetSnapshot, FetchError> {
        let day = date.format("%Y-%m-%d").to_string();
        let items_per_page = self.config.items_per_page.to_string();
        let params = [
            ("full", "true"),
            ("datasetId", self.config.dataset_id.as_str()),
            ("startTime", day.as_str()),
            ("endTime", day.as_str()),
            ("itemsPerPage", items_per_page.as_str()),
            ("format", "json"),
        ];

        let response = self
            .client
            .get(&self.config.search_url)
            .query(&params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        let payload: Value = serde_json::from_str(&response.text()?)?;

        let cache_file = self.cache_file(date);
        write_json_cache(&cache_file, &payload)?;

        Ok(DatasetSnapshot {
            date,
            payload,
            cache_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::ocean::test_server;

    fn fetcher(base: &str, cache_dir: PathBuf) -> OceanTempFetcher {
        OceanTempFetcher::with_client(
            test_server::client(),
            PodaacConfig {
                search_url: format!("{base}/ws/search/dataset"),
                cache_dir,
                ..PodaacConfig::default()
            },
        )
    }

    fn june_tenth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 10).unwrap()
    }

    #[test]
    #[traced_test]
    fn caches_payload_by_date() {
        let body = json!({"feed": {"totalResults": 1}});
        let (base, server) = test_server::serve(vec![
            ("200 OK", body.to_string()),
            ("200 OK", json!({"feed": {"totalResults": 2}}).to_string()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&base, dir.path().join("cache"));

        let snapshot = fetcher.fetch(june_tenth()).unwrap();
        assert_eq!(snapshot.payload, body);
        assert_eq!(snapshot.cache_file, dir.path().join("cache/ocean_temp_2020-06-10.json"));

        // A second run for the same date replaces the cache file.
        let second = fetcher.fetch(june_tenth()).unwrap();
        let cached: Value = serde_json::from_slice(&std::fs::read(&second.cache_file).unwrap()).unwrap();
        assert_eq!(cached["feed"]["totalResults"], 2);

        let requests = server.join().unwrap();
        let first = &requests[0];
        assert!(first.starts_with("GET /ws/search/dataset?"));
        for param in [
            "full=true",
            "datasetId=MODIS_A-JPL-L2P-v2019.0",
            "startTime=2020-06-10",
            "endTime=2020-06-10",
            "itemsPerPage=1",
            "format=json",
        ] {
            assert!(first.contains(param), "missing {param} in {first}");
        }
    }

    #[test]
    #[traced_test]
    fn error_status_means_no_data() {
        let (base, server) = test_server::serve(vec![("500 Internal Server Error", "{}".to_string())]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&base, dir.path().to_path_buf());

        let err = fetcher.fetch(june_tenth()).unwrap_err();
        assert!(matches!(err, FetchError::Status { .. }));
        assert!(!fetcher.cache_file(june_tenth()).exists());
        server.join().unwrap();
    }

    #[test]
    fn malformed_json_means_no_data() {
        let (base, server) = test_server::serve(vec![("200 OK", "not json".to_string())]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&base, dir.path().to_path_buf());

        assert!(matches!(fetcher.fetch(june_tenth()), Err(FetchError::Json(_))));
        server.join().unwrap();
    }

    #[test]
    fn unreachable_host_is_an_http_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&format!("http://{addr}"), dir.path().to_path_buf());
        assert!(matches!(fetcher.fetch(june_tenth()), Err(FetchError::Http(_))));
    }
}
