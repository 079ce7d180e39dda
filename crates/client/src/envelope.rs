//! JSON envelopes used by the ServiceNow REST API.

use serde::{Deserialize, Serialize};

/// Response body, with or without the `{"result": ...}` wrapper that
/// scripted REST endpoints add.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    /// `{"result": T}`
    Wrapped {
        /// Wrapped value
        result: T,
    },
    /// Bare `T`
    Bare(T),
}

impl<T> Envelope<T> {
    /// Unwrap to the inner value.
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { result } => result,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Body returned by the trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    /// Tracking identifier for the started operation
    #[serde(default, alias = "trackerId")]
    pub tracking_id: Option<String>,
}

/// Error body ServiceNow returns alongside non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorEnvelope {
    /// Best human-readable message from an error body.
    pub fn message_from(body: &str) -> Option<String> {
        let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
        match (envelope.error.message, envelope.error.detail) {
            (Some(message), Some(detail)) if !detail.is_empty() => {
                Some(format!("{}: {}", message, detail))
            }
            (Some(message), _) => Some(message),
            (None, detail) => detail,
        }
    }
}
