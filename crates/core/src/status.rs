//! Remote operation status and its local interpretation.

use serde::{Deserialize, Serialize};

use crate::id::TrackingHandle;

/// Body returned by the status endpoint for one tracking identifier.
///
/// Fields other than the completion flag, the error message and the optional
/// percentage are kept as completion metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Whether the remote operation has finished
    pub is_complete: bool,

    /// Failure reason; empty means no error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Completion percentage, when the remote reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f64>,

    /// Everything else the remote sent
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StatusResponse {
    /// A non-complete response.
    pub fn pending() -> Self {
        Self {
            is_complete: false,
            error_message: None,
            percent_complete: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// A successful completion response.
    pub fn completed() -> Self {
        Self {
            is_complete: true,
            ..Self::pending()
        }
    }

    /// A completion response carrying an error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_complete: true,
            error_message: Some(message.into()),
            ..Self::pending()
        }
    }

    /// The error message, if it is a real error indicator.
    ///
    /// Empty and whitespace-only messages do not count.
    pub fn error_indicator(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Progress display for this response.
    pub fn indicator(&self) -> ProgressIndicator {
        ProgressIndicator::from_percent(self.percent_complete)
    }

    /// Interpret the response as a progress status.
    pub fn into_status(self) -> ProgressStatus {
        if !self.is_complete {
            return ProgressStatus::Pending;
        }

        match self.error_indicator() {
            Some(message) => {
                ProgressStatus::Complete(CompletionDetail::Error(message.to_string()))
            }
            None => ProgressStatus::Complete(CompletionDetail::Success(CompletionPayload(
                self.metadata,
            ))),
        }
    }
}

/// Completion metadata of a successful operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionPayload(pub serde_json::Map<String, serde_json::Value>);

impl CompletionPayload {
    /// Look up a metadata field.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Whether the remote sent no metadata.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Detail attached to a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionDetail {
    /// Operation succeeded
    Success(CompletionPayload),
    /// Operation failed remotely
    Error(String),
}

/// Status of a tracked operation. Transitions only move forward.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProgressStatus {
    /// Still running
    #[default]
    Pending,
    /// Finished, successfully or not
    Complete(CompletionDetail),
}

impl ProgressStatus {
    /// Whether no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Complete(_))
    }

    /// Move to `next`.
    ///
    /// Pending may stay pending or become complete. A complete status never
    /// changes again.
    pub fn advance(&mut self, next: ProgressStatus) -> Result<(), StatusTransitionError> {
        if self.is_terminal() {
            return Err(StatusTransitionError);
        }
        *self = next;
        Ok(())
    }
}

/// Attempted to leave a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status is already terminal")]
pub struct StatusTransitionError;

/// How progress can be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProgressIndicator {
    /// Activity without a percentage
    Indeterminate,
    /// Percentage in `0..=100`
    Determinate(u8),
}

impl ProgressIndicator {
    /// Indicator for an optional remote percentage.
    pub fn from_percent(percent: Option<f64>) -> Self {
        match percent {
            Some(p) if p.is_finite() => ProgressIndicator::Determinate(p.clamp(0.0, 100.0) as u8),
            _ => ProgressIndicator::Indeterminate,
        }
    }
}

/// Successful terminal result of polling a handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Handle that completed
    pub handle: TrackingHandle,

    /// Completion metadata from the final status response
    pub payload: CompletionPayload,

    /// Status queries issued, including the final one
    pub polls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pending() {
        let response: StatusResponse = serde_json::from_value(json!({
            "isComplete": false
        }))
        .unwrap();

        assert_eq!(response.into_status(), ProgressStatus::Pending);
    }

    #[test]
    fn test_empty_error_message_is_success() {
        let response: StatusResponse = serde_json::from_value(json!({
            "isComplete": true,
            "errorMessage": "",
            "installedVersion": "2.1.0"
        }))
        .unwrap();

        match response.into_status() {
            ProgressStatus::Complete(CompletionDetail::Success(payload)) => {
                assert_eq!(payload.get("installedVersion"), Some(&json!("2.1.0")));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_error_message_is_success() {
        let response = StatusResponse {
            error_message: Some("  ".to_string()),
            ..StatusResponse::completed()
        };
        assert!(response.error_indicator().is_none());
    }

    #[test]
    fn test_error_message_is_failure() {
        let response: StatusResponse = serde_json::from_value(json!({
            "isComplete": true,
            "errorMessage": "disk full"
        }))
        .unwrap();

        assert_eq!(
            response.into_status(),
            ProgressStatus::Complete(CompletionDetail::Error("disk full".to_string()))
        );
    }

    #[test]
    fn test_error_message_ignored_while_pending() {
        let response = StatusResponse {
            error_message: Some("transient".to_string()),
            ..StatusResponse::pending()
        };
        assert_eq!(response.into_status(), ProgressStatus::Pending);
    }

    #[test]
    fn test_metadata_excludes_known_fields() {
        let response: StatusResponse = serde_json::from_value(json!({
            "isComplete": true,
            "percentComplete": 100,
            "appName": "HR Core"
        }))
        .unwrap();

        assert_eq!(response.metadata.len(), 1);
        assert!(response.metadata.contains_key("appName"));
    }

    #[test]
    fn test_status_only_moves_forward() {
        let mut status = ProgressStatus::default();
        assert!(status.advance(ProgressStatus::Pending).is_ok());
        assert!(status
            .advance(ProgressStatus::Complete(CompletionDetail::Error("x".into())))
            .is_ok());
        assert!(status.is_terminal());
        assert_eq!(
            status.advance(ProgressStatus::Pending),
            Err(StatusTransitionError)
        );
        assert_eq!(
            status,
            ProgressStatus::Complete(CompletionDetail::Error("x".into()))
        );
    }

    #[test]
    fn test_indicator_from_percent() {
        assert_eq!(
            ProgressIndicator::from_percent(None),
            ProgressIndicator::Indeterminate
        );
        assert_eq!(
            ProgressIndicator::from_percent(Some(f64::NAN)),
            ProgressIndicator::Indeterminate
        );
        assert_eq!(
            ProgressIndicator::from_percent(Some(42.7)),
            ProgressIndicator::Determinate(42)
        );
        assert_eq!(
            ProgressIndicator::from_percent(Some(250.0)),
            ProgressIndicator::Determinate(100)
        );
    }
}
