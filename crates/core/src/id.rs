//! Identifiers for tracked operations.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque tracking identifier issued by the remote system when an
/// install or update is triggered.
///
/// The handle is only meaningful to the remote status endpoint; it is never
/// parsed or interpreted locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingHandle(String);

impl TrackingHandle {
    /// Wrap a tracking identifier returned by the remote system.
    ///
    /// Returns `None` for an empty or whitespace-only identifier.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TrackingHandle {
    type Err = InvalidHandle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or(InvalidHandle)
    }
}

impl TryFrom<String> for TrackingHandle {
    type Error = InvalidHandle;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(InvalidHandle)
    }
}

impl From<TrackingHandle> for String {
    fn from(handle: TrackingHandle) -> Self {
        handle.0
    }
}

/// Error returned when parsing an empty tracking identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tracking identifier must not be empty")]
pub struct InvalidHandle;

/// Local identifier for an operation started through the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Ulid);

impl OperationId {
    /// Generate a new OperationId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op_{}", self.0)
    }
}
