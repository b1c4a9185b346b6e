use thiserror::Error;

/// Terminal outcome of a failed upload attempt. One per attempt, never per part.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Malformed input; the caller has to fix it.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tenant not permitted or credential exchange failed.
    #[error("Authorization error: {0}")]
    Auth(String),

    /// Network or HTTP failure talking to the signing service or the store.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store did not confirm a part, or part bookkeeping went wrong.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Only transport failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transport(err.to_string())
    }
}
