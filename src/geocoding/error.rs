use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Location '{0}' could not be found")]
    LocationNotFound(String),

    #[error("Failed to build HTTP client for geocoding")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse geocoding response")]
    JsonParse(#[from] serde_json::Error),

    #[error("Geocoder returned invalid coordinate '{value}' for '{location}'")]
    InvalidCoordinate { location: String, value: String },

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
