//! Terminal failures of a tracked operation.

use std::time::Duration;

use crate::id::TrackingHandle;
use crate::operation::OperationKind;

/// Boxed underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for trigger and poll operations.
pub type Result<T> = std::result::Result<T, OperationError>;

/// Every way an operation can end other than success.
///
/// All variants are terminal. None is retried automatically; the caller may
/// trigger a fresh operation.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The operation could not be started
    #[error("could not start {kind} of {item_id}: {cause}")]
    TriggerFailed {
        /// Install or update
        kind: OperationKind,
        /// Item the operation was for
        item_id: String,
        /// Underlying cause
        #[source]
        cause: BoxError,
    },

    /// The remote system reported a failure
    #[error("operation {handle} failed: {message}")]
    OperationFailed {
        /// Tracking handle of the failed operation
        handle: TrackingHandle,
        /// Remote error message
        message: String,
    },

    /// No terminal status within the attempt budget
    #[error("operation {handle} did not finish after {attempts} status checks ({elapsed:?})")]
    PollTimeout {
        /// Tracking handle being polled
        handle: TrackingHandle,
        /// Status checks issued
        attempts: u32,
        /// Time spent polling
        elapsed: Duration,
    },

    /// Polling was cancelled before a terminal status
    #[error("tracking of {handle} cancelled after {polls} status checks")]
    Cancelled {
        /// Tracking handle being polled
        handle: TrackingHandle,
        /// Status checks issued
        polls: u32,
    },

    /// A status query itself failed
    #[error("status check {attempt} for {handle} failed: {cause}")]
    Transport {
        /// Tracking handle being polled
        handle: TrackingHandle,
        /// 1-based number of the failed status check
        attempt: u32,
        /// Underlying cause
        #[source]
        cause: BoxError,
    },

    /// A poller for this handle is already running
    #[error("{0} is already being tracked")]
    AlreadyTracking(TrackingHandle),

    /// The polling task ended without settling
    #[error("tracking of {handle} aborted: {reason}")]
    Aborted {
        /// Tracking handle being polled
        handle: TrackingHandle,
        /// Why the task ended
        reason: String,
    },
}

impl OperationError {
    /// Whether the remote operation is known to have failed.
    ///
    /// A timeout or cancellation only means local tracking stopped; the
    /// remote operation may still be running.
    pub fn is_definite_failure(&self) -> bool {
        matches!(
            self,
            OperationError::TriggerFailed { .. } | OperationError::OperationFailed { .. }
        )
    }

    /// Message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            OperationError::TriggerFailed { .. } => self.to_string(),
            OperationError::OperationFailed { message, .. } => message.clone(),
            OperationError::PollTimeout { handle, .. } => format!(
                "operation {} may still be running, check back later",
                handle
            ),
            OperationError::Cancelled { handle, .. } => format!(
                "stopped tracking {}; the operation may still be running",
                handle
            ),
            OperationError::Transport { .. }
            | OperationError::AlreadyTracking(_)
            | OperationError::Aborted { .. } => self.to_string(),
        }
    }
}
