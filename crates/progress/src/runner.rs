//! Trigger-then-poll operation runner.

use std::sync::Arc;
use storetrack_client::StoreApi;
use storetrack_core::{
    Completion, Invalidation, OperationDescriptor, OperationError, PollEvent, Result,
    TrackingHandle,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::PollerConfig;
use crate::poller::Poller;

/// Capacity of the invalidation broadcast channel.
const INVALIDATION_CAPACITY: usize = 64;

/// Starts operations and follows them to a terminal outcome.
///
/// Every terminal success sends one [`Invalidation`] to all subscribers.
pub struct OperationRunner {
    /// Remote endpoints
    api: Arc<dyn StoreApi>,

    /// Settings for each poller
    config: PollerConfig,

    /// Progress notifications for every poller started here
    events: Option<mpsc::UnboundedSender<PollEvent>>,

    /// Cache invalidation signal
    invalidations: broadcast::Sender<Invalidation>,
}

impl OperationRunner {
    /// Create a runner.
    pub fn new(api: Arc<dyn StoreApi>, config: PollerConfig) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            api,
            config,
            events: None,
            invalidations,
        }
    }

    /// Report progress of every operation to `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<PollEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Share an invalidation channel with other runners.
    pub fn with_invalidations(mut self, invalidations: broadcast::Sender<Invalidation>) -> Self {
        self.invalidations = invalidations;
        self
    }

    /// Receive invalidations sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    /// Start an operation and return its tracking handle.
    pub async fn trigger(&self, descriptor: &OperationDescriptor) -> Result<TrackingHandle> {
        let handle = self
            .api
            .trigger(descriptor)
            .await
            .map_err(|e| {
                warn!(
                    item_id = %descriptor.item_id,
                    kind = %descriptor.kind,
                    http_status = ?e.status(),
                    error = %e,
                    "Trigger rejected"
                );
                OperationError::TriggerFailed {
                    kind: descriptor.kind,
                    item_id: descriptor.item_id.clone(),
                    cause: Box::new(e),
                }
            })?;

        info!(
            item_id = %descriptor.item_id,
            kind = %descriptor.kind,
            tracking_id = %handle,
            "Operation started"
        );
        Ok(handle)
    }

    /// Poll an already issued handle. `origin` is the descriptor it was
    /// triggered with, when known.
    pub async fn follow(
        &self,
        handle: TrackingHandle,
        origin: Option<&OperationDescriptor>,
        cancel: CancelSignal,
    ) -> Result<Completion> {
        let mut poller = Poller::new(self.api.clone(), self.config);
        if let Some(events) = &self.events {
            poller = poller.with_events(events.clone());
        }

        let result = poller.poll(handle, cancel).await;

        if let Ok(completion) = &result {
            let invalidation = Invalidation {
                handle: completion.handle.clone(),
                item_id: origin.map(|d| d.item_id.clone()),
                kind: origin.map(|d| d.kind),
            };
            // No subscribers is fine.
            if self.invalidations.send(invalidation).is_err() {
                debug!(tracking_id = %completion.handle, "No invalidation subscribers");
            }
        }

        result
    }

    /// Trigger `descriptor` and poll it to a terminal outcome.
    pub async fn run(&self, descriptor: &OperationDescriptor, cancel: CancelSignal) -> Result<Completion> {
        let handle = self.trigger(descriptor).await?;
        self.follow(handle, Some(descriptor), cancel).await
    }
}
