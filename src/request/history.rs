//! Turn-scoped memory of past requests, used to complete a request the user
//! answered in pieces.

use crate::error::CdsRequestError;
use crate::post_process::validation::field_descriptor;
use crate::request::climate_request::ClimateRequest;
use log::{debug, info, warn};

#[derive(Debug, Default)]
pub struct RequestHistory {
    requests: Vec<ClimateRequest>,
}

impl RequestHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn last(&self) -> Option<&ClimateRequest> {
        self.requests.last()
    }

    pub fn requests(&self) -> &[ClimateRequest] {
        &self.requests
    }

    /// Records an already processed request for this turn and returns the
    /// request the turn should continue with.
    ///
    /// When the previous request was invalid, each field it was missing is
    /// taken from `request` and the previous request, re-processed, replaces
    /// the new entry. Fields the previous request already had are kept.
    pub fn record(&mut self, request: ClimateRequest) -> Result<&ClimateRequest, CdsRequestError> {
        let repaired = match self.requests.last() {
            Some(previous) if !previous.request_valid && !previous.errors.is_empty() => {
                Some(repair(previous, &request)?)
            }
            _ => None,
        };
        let entry = match repaired {
            Some((repaired, transferred)) => {
                info!(
                    "Completed previous request with {} field(s) from this turn",
                    transferred
                );
                repaired
            }
            None => request,
        };
        let index = self.requests.len();
        self.requests.push(entry);
        Ok(&self.requests[index])
    }
}

fn repair(
    previous: &ClimateRequest,
    current: &ClimateRequest,
) -> Result<(ClimateRequest, usize), CdsRequestError> {
    let mut repaired = previous.clone();
    let mut transferred = 0;
    for field in &previous.errors {
        match field_descriptor(field) {
            Some(descriptor) => {
                debug!("Taking '{}' from the current request", field);
                (descriptor.transfer)(&mut repaired, current);
                transferred += 1;
            }
            None => warn!("No schema entry for failed field '{}'", field),
        }
    }
    repaired.process()?;
    Ok((repaired, transferred))
}
