//! Clients for NASA's public ocean-temperature search APIs.
//!
//! Neither client retries. A failed query is reported as a [`FetchError`]
//! so callers can tell "no data" apart from "request failed".

pub mod cmr;
pub mod podaac;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("response is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write cache file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Inclusive time window for a granule search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TemporalRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `start,end` in the `YYYY-MM-DDTHH:MM:SSZ` form the search API expects.
    pub fn to_query(&self) -> String {
        const FMT: &str = "%Y-%m-%dT%H:%M:%SZ";
        format!("{},{}", self.start.format(FMT), self.end.format(FMT))
    }
}

/// Public sea-surface-temperature imagery used by the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualizationUrls {
    pub sst: String,
    pub sst_anomaly: String,
    pub sst_local: String,
    pub sst_anomaly_local: String,
}

impl Default for VisualizationUrls {
    fn default() -> Self {
        Self {
            sst: "https://podaac.jpl.nasa.gov/Podaac/thumbnails/MODIS_A-JPL-L2P-v2019.0.jpg".to_string(),
            sst_anomaly: "https://www.star.nesdis.noaa.gov/pub/sod/mecb/crw/data/5km/v3.1/nc/climatology/monthly/sstanomaly/ex/2023/composite_ssta.png".to_string(),
            sst_local: "/assets/imgs/ocean_temp_map.jpg".to_string(),
            sst_anomaly_local: "/assets/imgs/ocean_temp_anomaly.jpg".to_string(),
        }
    }
}

/// Pretty-print `value` to `path`, creating the parent directory if needed.
fn write_json_cache(path: &Path, value: &serde_json::Value) -> Result<(), FetchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| FetchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// One-shot HTTP responder for exercising the clients without network access.
#[cfg(test)]
pub(crate) mod test_server {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use reqwest::blocking::Client;

    /// Client that talks to the local responder directly.
    pub fn client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    /// Serve each `(status line, body)` to one connection, in order.
    /// The handle yields the request line of every request received.
    pub fn serve(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();

                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&raw);
                requests.push(text.lines().next().unwrap_or("").to_string());

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            requests
        });

        (base, handle)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn temporal_range_query_format() {
        let range = TemporalRange::new(
            Utc.with_ymd_and_hms(2020, 6, 10, 11, 52, 20).unwrap(),
            Utc.with_ymd_and_hms(2020, 6, 17, 11, 52, 20).unwrap(),
        );
        assert_eq!(range.to_query(), "2020-06-10T11:52:20Z,2020-06-17T11:52:20Z");
    }

    #[test]
    fn visualization_urls_serialize_by_key() {
        let value = serde_json::to_value(VisualizationUrls::default()).unwrap();
        assert_eq!(value["sst_local"], "/assets/imgs/ocean_temp_map.jpg");
        assert!(value["sst"].as_str().unwrap().ends_with("MODIS_A-JPL-L2P-v2019.0.jpg"));
    }
}
