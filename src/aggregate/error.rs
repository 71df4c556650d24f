use crate::types::sub_request::RequestId;
use chrono::NaiveDate;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No fragments to merge for request {0}")]
    EmptyGroup(RequestId),

    #[error("Fragment {start} to {end} of request {request_id} for '{location}' never received data")]
    MissingData {
        request_id: RequestId,
        location: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Fragment {start} to {end} of request {request_id} for '{location}' holds no rows")]
    EmptyFragment {
        request_id: RequestId,
        location: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Failed to concatenate fragments of request {request_id}")]
    Concat {
        request_id: RequestId,
        #[source]
        source: PolarsError,
    },
}
