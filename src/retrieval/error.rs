use thiserror::Error;

/// Why the archive could not deliver one sub-request.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Archive rejected or failed the request: {message}")]
    Archive { message: String },

    #[error("Archive retrieval did not finish within {seconds}s")]
    Timeout { seconds: u64 },
}
