//! Engine-wide settings with the defaults the archive integration expects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::types::bounding_box::DEFAULT_COORDINATE_PRECISION;

pub const DEFAULT_MIN_BBOX_SIZE: f64 = 10.0;
pub const DEFAULT_TRAINING_YEARS: u32 = 3;
pub const DEFAULT_DATASET: &str = "reanalysis-era5-single-levels";
pub const DEFAULT_PRODUCT_TYPE: &str = "reanalysis";
pub const DEFAULT_TIMES: [&str; 4] = ["00:00", "06:00", "12:00", "18:00"];
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(600);

/// File format the archive is asked to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Netcdf,
    Grib,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Netcdf => "nc",
            OutputFormat::Grib => "grib",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Netcdf => f.write_str("netcdf"),
            OutputFormat::Grib => f.write_str("grib"),
        }
    }
}

/// Settings shared by every request an engine decomposes.
///
/// # Examples
///
/// ```
/// use cds_request::{EngineConfig, OutputFormat};
///
/// let config = EngineConfig {
///     min_bbox_size: 3.0,
///     output_format: OutputFormat::Grib,
///     ..EngineConfig::default()
/// };
/// assert_eq!(config.training_years, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Smallest latitude and longitude span, in degrees, sent to the archive.
    pub min_bbox_size: f64,
    /// Decimals geocoded coordinates are rounded to.
    pub coordinate_precision: u32,
    /// Last date the archive holds data for. Forecast training windows end here at the latest.
    pub archive_cutoff: NaiveDate,
    /// Length of the training window used for forecast requests.
    pub training_years: u32,
    pub dataset: String,
    pub product_type: String,
    pub output_format: OutputFormat,
    /// Hours of the day requested from the archive.
    pub times: Vec<String>,
    /// Longest a single archive retrieval may take before its request fails.
    pub retrieval_timeout: Duration,
}

impl EngineConfig {
    pub fn default_archive_cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_bbox_size: DEFAULT_MIN_BBOX_SIZE,
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            archive_cutoff: Self::default_archive_cutoff(),
            training_years: DEFAULT_TRAINING_YEARS,
            dataset: DEFAULT_DATASET.to_string(),
            product_type: DEFAULT_PRODUCT_TYPE.to_string(),
            output_format: OutputFormat::Netcdf,
            times: DEFAULT_TIMES.iter().map(|t| t.to_string()).collect(),
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }
}
