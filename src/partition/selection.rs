//! The per-[`SubRequest`] selection handed to the archive retrieval step.

use crate::config::{EngineConfig, OutputFormat};
use crate::error::CdsRequestError;
use crate::types::bounding_box::AdjustedBoundingBox;
use crate::types::sub_request::SubRequest;
use crate::types::traits::types::Year;
use crate::types::variable::variable_by_short_name;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeSet;

/// One archive call: a variable, year/month/day lists covering the fragment,
/// the hours of the day, an area and an output format.
///
/// Serialises to the request body the archive API takes; `dataset` travels
/// separately as the resource name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSelection {
    #[serde(skip)]
    pub dataset: String,
    pub product_type: String,
    pub variable: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    /// Only filled for fragments that do not cover whole months.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub day: Vec<String>,
    pub time: Vec<String>,
    pub area: AdjustedBoundingBox,
    pub format: OutputFormat,
}

impl ArchiveSelection {
    /// # Errors
    ///
    /// [`CdsRequestError::UnsupportedVariable`] when the sub-request's short name
    /// is not in the variable catalog.
    pub fn for_sub_request(
        sub_request: &SubRequest,
        config: &EngineConfig,
    ) -> Result<Self, CdsRequestError> {
        let spec = variable_by_short_name(&sub_request.variable_short_name).ok_or_else(|| {
            CdsRequestError::UnsupportedVariable(sub_request.variable_short_name.clone())
        })?;
        let timeframe = &sub_request.timeframe;
        let start = timeframe.start_date();
        let end = timeframe.end_date();

        let mut years = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut days = BTreeSet::new();
        let sub_monthly = !timeframe.is_clean_bounded();
        for date in start.iter_days().take_while(|date| *date <= end) {
            years.insert(Year::from(date));
            months.insert(date.month());
            if sub_monthly {
                days.insert(date.day());
            }
        }

        Ok(Self {
            dataset: config.dataset.clone(),
            product_type: config.product_type.clone(),
            variable: spec
                .archive_variables
                .iter()
                .map(|v| v.to_string())
                .collect(),
            year: years.iter().map(Year::to_string).collect(),
            month: months.iter().map(|m| format!("{:02}", m)).collect(),
            day: days.iter().map(|d| format!("{:02}", d)).collect(),
            time: config.times.clone(),
            area: sub_request.adjusted_bbox,
            format: config.output_format,
        })
    }

    /// The JSON request body for the archive API.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
