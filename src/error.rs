use crate::aggregate::error::MergeError;
use crate::geocoding::error::GeocodeError;
use crate::retrieval::error::RetrievalError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdsRequestError {
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Could not parse '{value}' as a date (expected DD/MM/YYYY or YYYY-MM-DD)")]
    DateFormat { value: String },

    #[error("Date strings must come in start/end pairs, got {count} value(s)")]
    UnpairedDates { count: usize },

    #[error("No unit conversion or derivation rule for variable '{0}'")]
    UnsupportedVariable(String),

    #[error("Variable '{name}' is not part of category '{category}'")]
    UnknownVariable { category: String, name: String },

    #[error("No JSON object found in intent response")]
    NoJsonObject,

    #[error("Failed to parse intent response: {0}")]
    IntentParse(#[from] serde_json::Error),

    #[error("Request is missing required information: {}", missing.join(", "))]
    InvalidRequest { missing: Vec<String> },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
