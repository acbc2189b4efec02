use rental_core::{ApiError, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),
}

impl ClientError {
    /// Effective HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api(ApiError::Unauthorized(_)))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
