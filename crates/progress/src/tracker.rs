//! Concurrent operation tracking.

use std::collections::HashMap;
use std::sync::Arc;
use storetrack_core::{
    Completion, OperationDescriptor, OperationError, OperationId, Result, TrackingHandle,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cancel::CancelHandle;
use crate::runner::OperationRunner;

/// An operation whose poller runs in the background.
pub struct TrackedOperation {
    /// Local identifier
    pub id: OperationId,

    /// Remote tracking handle
    pub handle: TrackingHandle,

    cancel: CancelHandle,
    task: JoinHandle<Result<Completion>>,
}

impl TrackedOperation {
    /// Stop polling. The outcome becomes `Cancelled` unless the poller has
    /// already settled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> Result<Completion> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(OperationError::Aborted {
                handle: self.handle,
                reason: e.to_string(),
            }),
        }
    }
}

/// Handles being polled, and whether new ones are still accepted.
#[derive(Default)]
struct Registry {
    active: HashMap<TrackingHandle, CancelHandle>,
    closed: bool,
}

/// Removes a handle from the registry when its polling task ends, however it
/// ends.
struct Deregister {
    registry: Arc<Mutex<Registry>>,
    handle: TrackingHandle,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        match self.registry.try_lock() {
            Ok(mut registry) => {
                registry.active.remove(&self.handle);
            }
            Err(_) => {
                let registry = self.registry.clone();
                let handle = self.handle.clone();
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(async move {
                        registry.lock().await.active.remove(&handle);
                    });
                }
            }
        }
    }
}

/// Runs independent operations concurrently, one poller per handle.
#[derive(Clone)]
pub struct OperationTracker {
    /// Shared runner
    runner: Arc<OperationRunner>,

    /// Handles currently being polled
    registry: Arc<Mutex<Registry>>,
}

impl OperationTracker {
    /// Create a tracker around `runner`.
    pub fn new(runner: OperationRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &OperationRunner {
        &self.runner
    }

    /// Trigger `descriptor` and track it in the background.
    ///
    /// Once [`cancel_all`](Self::cancel_all) has run, a handle returned by a
    /// trigger still in flight is not polled and the result is `Cancelled`.
    pub async fn start(&self, descriptor: OperationDescriptor) -> Result<TrackedOperation> {
        let handle = self.runner.trigger(&descriptor).await?;
        self.spawn(handle, Some(descriptor)).await
    }

    /// Track a handle issued earlier, e.g. by another process.
    pub async fn track(&self, handle: TrackingHandle) -> Result<TrackedOperation> {
        self.spawn(handle, None).await
    }

    async fn spawn(
        &self,
        handle: TrackingHandle,
        descriptor: Option<OperationDescriptor>,
    ) -> Result<TrackedOperation> {
        let (cancel, signal) = CancelHandle::new();

        {
            let mut registry = self.registry.lock().await;
            if registry.closed {
                info!(tracking_id = %handle, "Tracker closed, not polling");
                return Err(OperationError::Cancelled { handle, polls: 0 });
            }
            if registry.active.contains_key(&handle) {
                return Err(OperationError::AlreadyTracking(handle));
            }
            registry.active.insert(handle.clone(), cancel.clone());
        }

        let id = OperationId::new();
        debug!(operation_id = %id, tracking_id = %handle, "Tracking operation");

        let runner = self.runner.clone();
        let deregister = Deregister {
            registry: self.registry.clone(),
            handle: handle.clone(),
        };
        let task_handle = handle.clone();
        let task = tokio::spawn(async move {
            let _deregister = deregister;
            runner
                .follow(task_handle, descriptor.as_ref(), signal)
                .await
        });

        Ok(TrackedOperation {
            id,
            handle,
            cancel,
            task,
        })
    }

    /// Whether a poller for `handle` is running.
    pub async fn is_tracking(&self, handle: &TrackingHandle) -> bool {
        self.registry.lock().await.active.contains_key(handle)
    }

    /// Handles currently being polled.
    pub async fn active_handles(&self) -> Vec<TrackingHandle> {
        self.registry.lock().await.active.keys().cloned().collect()
    }

    /// Whether [`cancel_all`](Self::cancel_all) has run.
    pub async fn is_closed(&self) -> bool {
        self.registry.lock().await.closed
    }

    /// Cancel the poller for `handle`. Returns `false` if none is running.
    pub async fn cancel(&self, handle: &TrackingHandle) -> bool {
        match self.registry.lock().await.active.get(handle) {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running poller and refuse new ones. Returns how many
    /// were signalled.
    pub async fn cancel_all(&self) -> usize {
        let mut registry = self.registry.lock().await;
        registry.closed = true;
        for cancel in registry.active.values() {
            cancel.cancel();
        }
        if !registry.active.is_empty() {
            info!(count = registry.active.len(), "Cancelling all tracked operations");
        }
        registry.active.len()
    }
}
