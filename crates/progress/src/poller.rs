//! Bounded fixed-interval status polling.

use chrono::Utc;
use std::sync::Arc;
use storetrack_client::StoreApi;
use storetrack_core::{
    Completion, CompletionDetail, OperationError, PollAttempt, PollEvent, ProgressStatus, Result,
    Settlement, TrackingHandle,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::PollerConfig;

/// Drives one tracking handle to a terminal outcome.
///
/// Each status query is issued only after the previous one returned, so at
/// most one query per handle is in flight. Failed queries are not retried.
#[derive(Clone)]
pub struct Poller {
    /// Remote status endpoint
    api: Arc<dyn StoreApi>,

    /// Interval and attempt budget
    config: PollerConfig,

    /// Optional progress notifications
    events: Option<mpsc::UnboundedSender<PollEvent>>,
}

impl Poller {
    /// Create a poller.
    pub fn new(api: Arc<dyn StoreApi>, config: PollerConfig) -> Self {
        Self {
            api,
            config,
            events: None,
        }
    }

    /// Send progress notifications to `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<PollEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Poll `handle` until it completes, fails, times out or `cancel` fires.
    ///
    /// Settles exactly once: the returned result and the single
    /// [`PollEvent::Settled`] describe the same outcome.
    pub async fn poll(&self, handle: TrackingHandle, mut cancel: CancelSignal) -> Result<Completion> {
        debug!(
            tracking_id = %handle,
            interval_ms = self.config.interval_ms,
            max_attempts = self.config.max_attempts,
            budget = ?self.config.budget(),
            "Polling started"
        );
        self.emit(PollEvent::Started {
            handle: handle.clone(),
            at: Utc::now(),
        });

        let result = self.drive(&handle, &mut cancel).await;

        match &result {
            Ok(completion) => info!(
                tracking_id = %handle,
                polls = completion.polls,
                "Operation completed"
            ),
            Err(e) if e.is_definite_failure() => {
                warn!(tracking_id = %handle, error = %e, "Operation failed")
            }
            Err(e) => info!(tracking_id = %handle, error = %e, "Stopped tracking operation"),
        }

        self.emit(PollEvent::Settled {
            handle,
            settlement: Settlement::from_result(&result),
            at: Utc::now(),
        });

        result
    }

    async fn drive(&self, handle: &TrackingHandle, cancel: &mut CancelSignal) -> Result<Completion> {
        let mut attempt = PollAttempt::new(self.config.max_attempts);
        let mut status = ProgressStatus::default();
        let interval = self.config.interval();

        loop {
            if cancel.is_cancelled() {
                return Err(OperationError::Cancelled {
                    handle: handle.clone(),
                    polls: attempt.polls(),
                });
            }

            let number = attempt.begin_poll();
            let response = self.api.status(handle).await.map_err(|e| OperationError::Transport {
                handle: handle.clone(),
                attempt: number,
                cause: Box::new(e),
            })?;

            let indicator = response.indicator();
            status
                .advance(response.into_status())
                .map_err(|e| OperationError::Aborted {
                    handle: handle.clone(),
                    reason: e.to_string(),
                })?;

            match &status {
                ProgressStatus::Complete(CompletionDetail::Error(message)) => {
                    return Err(OperationError::OperationFailed {
                        handle: handle.clone(),
                        message: message.clone(),
                    });
                }
                ProgressStatus::Complete(CompletionDetail::Success(payload)) => {
                    return Ok(Completion {
                        handle: handle.clone(),
                        payload: payload.clone(),
                        polls: number,
                    });
                }
                ProgressStatus::Pending => {}
            }

            debug!(tracking_id = %handle, attempt = number, "Operation still running");
            self.emit(PollEvent::Polled {
                handle: handle.clone(),
                attempt: number,
                indicator,
            });

            if attempt.record_pending() {
                return Err(OperationError::PollTimeout {
                    handle: handle.clone(),
                    attempts: attempt.polls(),
                    elapsed: attempt.elapsed(),
                });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(OperationError::Cancelled {
                        handle: handle.clone(),
                        polls: attempt.polls(),
                    });
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn emit(&self, event: PollEvent) {
        if let Some(events) = &self.events {
            // Receiver gone means nobody is watching; polling continues.
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelHandle;
    use crate::testing::ScriptedApi;
    use serde_json::json;
    use std::time::Duration;
    use storetrack_client::ApiError;
    use storetrack_core::{ProgressIndicator, StatusResponse};

    fn handle(id: &str) -> TrackingHandle {
        TrackingHandle::new(id).unwrap()
    }

    fn poller(api: &Arc<ScriptedApi>) -> Poller {
        Poller::new(api.clone(), PollerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_two_polls() {
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then(StatusResponse::pending())
                .then(StatusResponse {
                    error_message: Some(String::new()),
                    ..StatusResponse::completed()
                }),
        );

        let completion = poller(&api)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(completion.polls, 2);
        assert_eq!(completion.handle, handle("abc"));
        assert_eq!(api.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_on_first_poll() {
        let api = Arc::new(ScriptedApi::new("xyz").then(StatusResponse::failed("disk full")));

        let err = poller(&api)
            .poll(handle("xyz"), CancelSignal::never())
            .await
            .unwrap_err();

        match err {
            OperationError::OperationFailed { handle: h, message } => {
                assert_eq!(h, handle("xyz"));
                assert_eq!(message, "disk full");
            }
            other => panic!("expected OperationFailed, got {:?}", other),
        }
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_max_attempts() {
        let api = Arc::new(ScriptedApi::new("abc"));

        let err = poller(&api)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap_err();

        match err {
            OperationError::PollTimeout { attempts, elapsed, .. } => {
                assert_eq!(attempts, 150);
                assert!(elapsed >= Duration::from_secs(298));
                assert!(elapsed < Duration::from_secs(300));
            }
            other => panic!("expected PollTimeout, got {:?}", other),
        }
        assert_eq!(api.polls(), 150);

        // No stray query after settling
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.polls(), 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_pending_then_terminal_takes_n_plus_one_polls() {
        for n in [0usize, 1, 7, 149] {
            let api = Arc::new(
                ScriptedApi::new("abc")
                    .then_pending(n)
                    .then(StatusResponse::completed()),
            );

            let completion = poller(&api)
                .poll(handle("abc"), CancelSignal::never())
                .await
                .unwrap();

            assert_eq!(completion.polls as usize, n + 1);
            assert_eq!(api.polls() as usize, n + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_after_pending_is_failure() {
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then_pending(3)
                .then(StatusResponse::failed("plugin dependency missing")),
        );

        let result = poller(&api).poll(handle("abc"), CancelSignal::never()).await;
        assert!(matches!(result, Err(OperationError::OperationFailed { .. })));
        assert_eq!(api.polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_is_final() {
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then(StatusResponse::completed())
                .then(StatusResponse::failed("late failure")),
        );

        let completion = poller(&api)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(completion.polls, 1);
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_payload_is_returned() {
        let mut done = StatusResponse::completed();
        done.metadata
            .insert("installedVersion".to_string(), json!("2.1.0"));
        let api = Arc::new(ScriptedApi::new("abc").then(done));

        let completion = poller(&api)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(completion.payload.get("installedVersion"), Some(&json!("2.1.0")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_terminal() {
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then_pending(2)
                .then_error(ApiError::Http {
                    status: 502,
                    body: "Bad Gateway".to_string(),
                })
                .then(StatusResponse::completed()),
        );

        let err = poller(&api)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, OperationError::Transport { attempt: 3, .. }));
        assert_eq!(api.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_interval_between_polls() {
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then_pending(3)
                .then(StatusResponse::completed()),
        );

        let start = tokio::time::Instant::now();
        poller(&api)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_poll() {
        let api = Arc::new(ScriptedApi::new("abc"));
        let (cancel, signal) = CancelHandle::new();
        cancel.cancel();

        let err = poller(&api).poll(handle("abc"), signal).await.unwrap_err();
        assert!(matches!(err, OperationError::Cancelled { polls: 0, .. }));
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_stops_polling() {
        let api = Arc::new(ScriptedApi::new("abc"));
        let (cancel, signal) = CancelHandle::new();

        let poller = poller(&api);
        let task = tokio::spawn(async move { poller.poll(handle("abc"), signal).await });

        // Polls run at 0s, 2s and 4s
        tokio::time::sleep(Duration::from_millis(4500)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, OperationError::Cancelled { polls: 3, .. }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_settle_once() {
        let mut running = StatusResponse::pending();
        running.percent_complete = Some(40.0);
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then(StatusResponse::pending())
                .then(running)
                .then(StatusResponse::completed()),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        poller(&api)
            .with_events(tx)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], PollEvent::Started { .. }));
        assert!(matches!(
            events[1],
            PollEvent::Polled {
                attempt: 1,
                indicator: ProgressIndicator::Indeterminate,
                ..
            }
        ));
        assert!(matches!(
            events[2],
            PollEvent::Polled {
                attempt: 2,
                indicator: ProgressIndicator::Determinate(40),
                ..
            }
        ));
        let settled: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, PollEvent::Settled { .. }))
            .collect();
        assert_eq!(settled.len(), 1);
        assert!(matches!(
            settled[0],
            PollEvent::Settled {
                settlement: Settlement::Succeeded,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_event_receiver_does_not_stop_polling() {
        let api = Arc::new(
            ScriptedApi::new("abc")
                .then_pending(2)
                .then(StatusResponse::completed()),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let completion = poller(&api)
            .with_events(tx)
            .poll(handle("abc"), CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(completion.polls, 3);
    }
}
