//! Unit conversion and derived variables applied to merged series.

use crate::aggregate::error::MergeError;
use crate::error::CdsRequestError;
use crate::types::sub_request::SubRequest;
use log::debug;
use polars::prelude::*;

const KELVIN_OFFSET: f64 = 273.15;
const METERS_TO_MILLIMETERS: f64 = 1000.0;

/// How a variable's raw archive values become final physical values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitRule {
    /// Adds `offset` to the variable's column.
    Offset { offset: f64, units: &'static str },
    /// Multiplies the variable's column by `factor`.
    Scale { factor: f64, units: &'static str },
    /// Replaces two component columns by their Euclidean norm.
    Magnitude {
        components: [&'static str; 2],
        units: &'static str,
    },
}

impl UnitRule {
    /// The rule for `short_name`, or `None` for variables without one.
    pub fn for_variable(short_name: &str) -> Option<UnitRule> {
        match short_name {
            "t2m" | "skt" => Some(UnitRule::Offset {
                offset: -KELVIN_OFFSET,
                units: "°C",
            }),
            "tp" => Some(UnitRule::Scale {
                factor: METERS_TO_MILLIMETERS,
                units: "mm",
            }),
            // The archive reports evaporation as a negative flux.
            "e" => Some(UnitRule::Scale {
                factor: -METERS_TO_MILLIMETERS,
                units: "mm",
            }),
            "w10" => Some(UnitRule::Magnitude {
                components: ["u10", "v10"],
                units: "m s**-1",
            }),
            _ => None,
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            UnitRule::Offset { units, .. }
            | UnitRule::Scale { units, .. }
            | UnitRule::Magnitude { units, .. } => units,
        }
    }

    /// Applies the rule to `frame`, writing the result into the `short_name` column.
    pub fn apply(&self, frame: DataFrame, short_name: &str) -> PolarsResult<DataFrame> {
        let lazy = frame.lazy();
        let converted = match *self {
            UnitRule::Offset { offset, .. } => {
                lazy.with_column((col(short_name) + lit(offset)).alias(short_name))
            }
            UnitRule::Scale { factor, .. } => {
                lazy.with_column((col(short_name) * lit(factor)).alias(short_name))
            }
            UnitRule::Magnitude {
                components: [u, v],
                ..
            } => lazy
                .with_column(
                    (col(u) * col(u) + col(v) * col(v))
                        .sqrt()
                        .alias(short_name),
                )
                .select([all().exclude([u, v])]),
        };
        converted.collect()
    }
}

/// Converts one merged sub-request's data to final units in place.
///
/// # Errors
///
/// [`CdsRequestError::UnsupportedVariable`] when `variable_short_name` has no
/// rule, [`MergeError::MissingData`] when the sub-request was never filled and
/// [`CdsRequestError::DataFrameProcessing`] when the expected columns are
/// missing.
pub fn finalize_one(
    sub_request: &mut SubRequest,
    variable_short_name: &str,
) -> Result<(), CdsRequestError> {
    let rule = UnitRule::for_variable(variable_short_name)
        .ok_or_else(|| CdsRequestError::UnsupportedVariable(variable_short_name.to_string()))?;
    let Some(frame) = sub_request.data.as_ref() else {
        return Err(MergeError::MissingData {
            request_id: sub_request.request_id,
            location: sub_request.location.clone(),
            start: sub_request.timeframe.start_date(),
            end: sub_request.timeframe.end_date(),
        }
        .into());
    };
    let converted = rule.apply(frame.clone(), variable_short_name)?;
    sub_request.data = Some(converted);
    sub_request.units = Some(rule.units().to_string());
    debug!("Converted {} to {}", sub_request, rule.units());
    Ok(())
}

/// Converts every merged sub-request's data to final units in place.
pub fn finalize(
    sub_requests: &mut [SubRequest],
    variable_short_name: &str,
) -> Result<(), CdsRequestError> {
    sub_requests
        .iter_mut()
        .try_for_each(|sub_request| finalize_one(sub_request, variable_short_name))
}
