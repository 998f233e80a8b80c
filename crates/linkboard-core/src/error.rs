//! Error taxonomy for board operations.

use thiserror::Error;

/// Errors surfaced by board operations.
///
/// Non-positive resize dimensions are not represented here: they are dropped
/// where they are observed and never reach the caller as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Malformed URL or empty required field. Raised before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// No user id could be resolved from the stored credential.
    #[error("User not authenticated")]
    NotAuthenticated,
    /// A remote call failed. Pending changes are kept for the next flush.
    #[error("Network error: {0}")]
    Network(String),
    /// The remote store does not know the requested link or board.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Transport-level errors returned by a [`crate::api::BoardApi`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for remote API calls.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<ApiError> for BoardError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(what) => BoardError::NotFound(what),
            ApiError::Status { status: 401, .. } => BoardError::NotAuthenticated,
            other => BoardError::Network(other.to_string()),
        }
    }
}
