//! Store API abstraction.

use async_trait::async_trait;
use storetrack_core::{OperationDescriptor, StatusResponse, TrackingHandle};

use crate::error::Result;

/// Remote endpoints needed to run and track an operation.
///
/// This trait allows the poller to run against a real instance or a
/// scripted stand-in.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Start an install or update. Issues exactly one request.
    async fn trigger(&self, descriptor: &OperationDescriptor) -> Result<TrackingHandle>;

    /// Query the status of a previously triggered operation.
    async fn status(&self, handle: &TrackingHandle) -> Result<StatusResponse>;
}

