//! Scripted store API for poller tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use storetrack_client::{ApiError, StoreApi};
use storetrack_core::{OperationDescriptor, StatusResponse, TrackingHandle};

/// Replays queued status responses, then repeats `fallback`.
pub(crate) struct ScriptedApi {
    tracking_id: Option<String>,
    script: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    fallback: StatusResponse,
    panic_on_poll: bool,
    triggers: AtomicU32,
    polls: AtomicU32,
}

impl ScriptedApi {
    pub(crate) fn new(tracking_id: &str) -> Self {
        Self {
            tracking_id: Some(tracking_id.to_string()),
            script: Mutex::new(VecDeque::new()),
            fallback: StatusResponse::pending(),
            panic_on_poll: false,
            triggers: AtomicU32::new(0),
            polls: AtomicU32::new(0),
        }
    }

    /// An API whose trigger endpoint fails.
    pub(crate) fn failing_trigger() -> Self {
        Self {
            tracking_id: None,
            ..Self::new("unused")
        }
    }

    /// An API whose status endpoint panics, killing the polling task.
    pub(crate) fn panicking(tracking_id: &str) -> Self {
        Self {
            panic_on_poll: true,
            ..Self::new(tracking_id)
        }
    }

    pub(crate) fn then(self, response: StatusResponse) -> Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    pub(crate) fn then_pending(self, count: usize) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            for _ in 0..count {
                script.push_back(Ok(StatusResponse::pending()));
            }
        }
        self
    }

    pub(crate) fn then_error(self, error: ApiError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn triggers(&self) -> u32 {
        self.triggers.load(Ordering::SeqCst)
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreApi for ScriptedApi {
    async fn trigger(&self, _descriptor: &OperationDescriptor) -> storetrack_client::Result<TrackingHandle> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        match &self.tracking_id {
            Some(id) => TrackingHandle::new(id.clone())
                .ok_or_else(|| ApiError::InvalidResponse("missing trackingId".to_string())),
            None => Err(ApiError::Http {
                status: 503,
                body: "Service Unavailable".to_string(),
            }),
        }
    }

    async fn status(&self, _handle: &TrackingHandle) -> storetrack_client::Result<StatusResponse> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_poll {
            panic!("status endpoint blew up");
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => Ok(self.fallback.clone()),
        }
    }
}
