use mirror_core::AppError;
use thiserror::Error;

/// Failure of a single HTTP exchange with the origin.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("TLS certificate could not be verified: {0}")]
    TrustFailure(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Origin system errors for record access
#[derive(Debug, Error)]
pub enum OriginError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Origin returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected origin response: {0}")]
    Decode(String),
}

impl From<OriginError> for AppError {
    fn from(err: OriginError) -> Self {
        match err {
            OriginError::Status { status: 404, message } => AppError::NotFound(message),
            other => AppError::Origin(other.to_string()),
        }
    }
}
