//! The atomic retrieval unit produced by partitioning.

use crate::types::bounding_box::{AdjustedBoundingBox, BoundingBox};
use crate::types::time_span::TimeSpan;
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlates every fragment of one logical (location, timeframe) request.
///
/// Ids are handed out by a single partitioning call, starting at 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u32);

impl RequestId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One location, one contiguous date range, one area and one variable: the
/// largest unit the archive serves in a single call.
///
/// `data` starts out empty and is filled once by the retrieval step. The
/// aggregator later replaces all fragments sharing a [`RequestId`] with a
/// single merged `SubRequest`.
#[derive(Debug, Clone)]
pub struct SubRequest {
    pub location: String,
    pub original_bbox: BoundingBox,
    pub adjusted_bbox: AdjustedBoundingBox,
    pub timeframe: TimeSpan,
    pub variable_short_name: String,
    pub request_id: RequestId,
    /// Time-indexed values for this fragment, once retrieved.
    pub data: Option<DataFrame>,
    /// Physical units of `data`, set by post-processing.
    pub units: Option<String>,
}

impl SubRequest {
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Whether `other` addresses the same location, area and variable.
    pub fn same_target(&self, other: &SubRequest) -> bool {
        self.location == other.location
            && self.variable_short_name == other.variable_short_name
            && self.original_bbox == other.original_bbox
            && self.adjusted_bbox == other.adjusted_bbox
    }

    pub fn with_data(mut self, data: DataFrame) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for SubRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}' {}",
            self.request_id, self.variable_short_name, self.location, self.timeframe
        )
    }
}
