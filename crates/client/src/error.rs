//! Client error type.

use storetrack_core::DescriptorError;

/// Result type for store API calls.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors from a single store API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request could not be sent or the connection failed
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Response body was not the expected JSON
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response decoded but is missing required data
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Descriptor rejected before sending
    #[error("invalid operation: {0}")]
    InvalidDescriptor(#[from] DescriptorError),

    /// Client configuration is unusable
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status code, if the remote answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
