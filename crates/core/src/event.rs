//! Notifications emitted while an operation is tracked.

use serde::{Deserialize, Serialize};

use crate::error::OperationError;
use crate::id::TrackingHandle;
use crate::operation::OperationKind;
use crate::status::ProgressIndicator;
use crate::Time;

/// Progress notification from a poller.
///
/// Each poller emits one `Started`, one `Polled` per status query and
/// exactly one `Settled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PollEvent {
    /// Polling began
    Started {
        /// Handle being polled
        handle: TrackingHandle,
        /// When polling began
        at: Time,
    },

    /// A non-terminal status was received
    Polled {
        /// Handle being polled
        handle: TrackingHandle,
        /// 1-based status query number
        attempt: u32,
        /// Progress display
        indicator: ProgressIndicator,
    },

    /// Polling reached its terminal outcome
    Settled {
        /// Handle that settled
        handle: TrackingHandle,
        /// Outcome summary
        settlement: Settlement,
        /// When it settled
        at: Time,
    },
}

impl PollEvent {
    /// Handle the event belongs to.
    pub fn handle(&self) -> &TrackingHandle {
        match self {
            PollEvent::Started { handle, .. }
            | PollEvent::Polled { handle, .. }
            | PollEvent::Settled { handle, .. } => handle,
        }
    }
}

/// Cloneable summary of a terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    /// Remote operation succeeded
    Succeeded,
    /// Remote operation failed with this message
    Failed(String),
    /// Attempt budget exhausted
    TimedOut,
    /// Tracking cancelled
    Cancelled,
    /// A status query failed
    TransportError(String),
    /// Polling never began: the trigger failed or the handle was already
    /// tracked
    Rejected(String),
    /// The polling task ended without settling
    Aborted(String),
}

impl Settlement {
    /// Summarize a poll result.
    pub fn from_result<T>(result: &Result<T, OperationError>) -> Self {
        match result {
            Ok(_) => Settlement::Succeeded,
            Err(OperationError::OperationFailed { message, .. }) => {
                Settlement::Failed(message.clone())
            }
            Err(OperationError::PollTimeout { .. }) => Settlement::TimedOut,
            Err(OperationError::Cancelled { .. }) => Settlement::Cancelled,
            Err(e @ OperationError::Transport { .. }) => Settlement::TransportError(e.to_string()),
            Err(e @ (OperationError::TriggerFailed { .. } | OperationError::AlreadyTracking(_))) => {
                Settlement::Rejected(e.to_string())
            }
            Err(OperationError::Aborted { reason, .. }) => Settlement::Aborted(reason.clone()),
        }
    }
}

/// Signal that cached catalog lists touching an item are stale.
///
/// Sent once per terminal success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalidation {
    /// Handle of the completed operation
    pub handle: TrackingHandle,

    /// Item that changed, when the operation was started locally
    pub item_id: Option<String>,

    /// Kind of operation, when known
    pub kind: Option<OperationKind>,
}
