//! Terminal rendering of poll events and outcomes.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;
use storetrack_core::{
    Completion, OperationError, PollEvent, ProgressIndicator, Settlement, TrackingHandle,
};
use tokio::sync::mpsc;

/// Spinner redraw rate.
const TICK: Duration = Duration::from_millis(120);

/// Exit code for a successful run.
pub const EXIT_OK: i32 = 0;
/// Exit code when an operation definitely failed.
pub const EXIT_FAILED: i32 = 1;
/// Exit code when tracking timed out; the operation may still be running.
pub const EXIT_TIMEOUT: i32 = 2;
/// Exit code when tracking was interrupted.
pub const EXIT_CANCELLED: i32 = 130;

/// Progress message for an event.
pub fn describe(event: &PollEvent) -> String {
    match event {
        PollEvent::Started { handle, .. } => format!("[{}] waiting for first status", handle),
        PollEvent::Polled {
            handle,
            attempt,
            indicator,
        } => match indicator {
            ProgressIndicator::Indeterminate => {
                format!("[{}] running (check {})", handle, attempt)
            }
            ProgressIndicator::Determinate(percent) => {
                format!("[{}] {:>3}% (check {})", handle, percent, attempt)
            }
        },
        PollEvent::Settled {
            handle, settlement, ..
        } => match settlement {
            Settlement::Succeeded => format!("[{}] done", handle),
            Settlement::Failed(message) => format!("[{}] failed: {}", handle, message),
            Settlement::TimedOut => format!("[{}] still running, giving up", handle),
            Settlement::Cancelled => format!("[{}] cancelled", handle),
            Settlement::TransportError(message) => format!("[{}] error: {}", handle, message),
            Settlement::Rejected(message) => format!("[{}] not tracked: {}", handle, message),
            Settlement::Aborted(reason) => format!("[{}] aborted: {}", handle, reason),
        },
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn percent_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// One progress line per tracked handle.
pub struct ProgressDisplay {
    multi: MultiProgress,
    bars: HashMap<TrackingHandle, ProgressBar>,
}

impl ProgressDisplay {
    /// Draw to stderr.
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Draw to `target`.
    pub fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    /// Update the line for the event's handle.
    pub fn apply(&mut self, event: &PollEvent) {
        let message = describe(event);
        match event {
            PollEvent::Started { handle, .. } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.set_message(message);
                bar.enable_steady_tick(TICK);
                if let Some(previous) = self.bars.insert(handle.clone(), bar) {
                    previous.finish();
                }
            }
            PollEvent::Polled { indicator, .. } => {
                let bar = self.bar(event.handle());
                if let ProgressIndicator::Determinate(percent) = indicator {
                    if bar.length() != Some(100) {
                        bar.set_length(100);
                        bar.set_style(percent_style());
                    }
                    bar.set_position(u64::from(*percent));
                }
                bar.set_message(message);
            }
            PollEvent::Settled { .. } => {
                self.bar(event.handle()).finish_with_message(message);
            }
        }
    }

    /// Line for `handle`, created if its `Started` event was missed.
    fn bar(&mut self, handle: &TrackingHandle) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(handle.clone()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(spinner_style());
            bar.enable_steady_tick(TICK);
            bar
        })
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Show events on stderr until every sender is dropped.
pub async fn render_events(mut events: mpsc::UnboundedReceiver<PollEvent>) {
    let mut display = ProgressDisplay::new();
    while let Some(event) = events.recv().await {
        display.apply(&event);
    }
}

/// Final result line for stdout.
pub fn outcome_line(label: &str, result: &Result<Completion, OperationError>) -> String {
    match result {
        Ok(completion) if completion.payload.is_empty() => {
            format!("{}: completed after {} checks", label, completion.polls)
        }
        Ok(completion) => format!(
            "{}: completed after {} checks {}",
            label,
            completion.polls,
            serde_json::Value::Object(completion.payload.0.clone())
        ),
        Err(e) => format!("{}: {}", label, e.user_message()),
    }
}

/// Process exit code for a set of outcomes; the most severe wins.
pub fn exit_code<'a, I>(results: I) -> i32
where
    I: IntoIterator<Item = &'a Result<Completion, OperationError>>,
{
    results
        .into_iter()
        .map(|result| match result {
            Ok(_) => EXIT_OK,
            Err(e) if e.is_definite_failure() => EXIT_FAILED,
            Err(OperationError::PollTimeout { .. }) => EXIT_TIMEOUT,
            Err(OperationError::Cancelled { .. }) => EXIT_CANCELLED,
            // transport errors, aborted tasks
            Err(_) => EXIT_FAILED,
        })
        .max_by_key(|code| severity(*code))
        .unwrap_or(EXIT_OK)
}

fn severity(code: i32) -> u8 {
    match code {
        EXIT_FAILED => 3,
        EXIT_TIMEOUT => 2,
        EXIT_CANCELLED => 1,
        _ => 0,
    }
}
