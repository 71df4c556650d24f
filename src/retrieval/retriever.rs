//! The seam to the external archive.

use crate::partition::selection::ArchiveSelection;
use crate::retrieval::error::RetrievalError;
use crate::types::sub_request::SubRequest;
use polars::prelude::DataFrame;
use std::future::Future;

/// Fetches the data of one sub-request from the archive.
///
/// Implementations turn `selection` into an archive call, download and decode
/// the result and return it as a time-indexed frame: a `time` column plus one
/// column per archive variable, named by its short name (`t2m`, `tp`, `u10`,
/// `v10`, ...). `sub_request` is passed along for logging and file naming.
pub trait ArchiveRetriever: Send + Sync {
    fn retrieve(
        &self,
        selection: &ArchiveSelection,
        sub_request: &SubRequest,
    ) -> impl Future<Output = Result<DataFrame, RetrievalError>> + Send;
}
