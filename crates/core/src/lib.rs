//! storetrack core data models.
//!
//! This crate defines the types shared by the store API client and the
//! progress poller: tracking handles, operation descriptors, remote status
//! responses, the poll outcome taxonomy and the events emitted while an
//! operation is tracked.

#![warn(missing_docs)]

// Core identities
mod id;

// Operations and their remote status
mod operation;
mod status;
mod attempt;

// Outcomes and notifications
mod error;
mod event;

// Re-exports
pub use id::*;

pub use operation::{DescriptorError, OperationDescriptor, OperationKind, OperationOptions};
pub use status::{
    Completion, CompletionDetail, CompletionPayload, ProgressIndicator, ProgressStatus,
    StatusResponse, StatusTransitionError,
};
pub use attempt::PollAttempt;
pub use error::{BoxError, OperationError, Result};
pub use event::{Invalidation, PollEvent, Settlement};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
