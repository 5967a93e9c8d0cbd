//! Error taxonomy for backend calls

use thiserror::Error;

/// Failure of a single backend interaction
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success status; `detail` is shown to the operator verbatim
    #[error("{detail}")]
    Status { status: u16, detail: String },

    /// The response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Rejected locally before any request was sent
    #[error("{0}")]
    Validation(String),

    /// The backend answered 2xx but reported `success: false`
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Status { .. } => "status",
            ApiError::Decode(_) => "decode",
            ApiError::Validation(_) => "validation",
            ApiError::Rejected(_) => "rejected",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
