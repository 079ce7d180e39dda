//! Poll attempt budget.

use std::time::Duration;
use tokio::time::Instant;

/// Counts non-complete status responses against a maximum.
///
/// Invariant: `count() <= max_attempts()`. Once the budget is exhausted the
/// poller must settle with a timeout.
#[derive(Debug, Clone)]
pub struct PollAttempt {
    count: u32,
    max_attempts: u32,
    polls: u32,
    started: Instant,
}

impl PollAttempt {
    /// Start a new budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            count: 0,
            max_attempts,
            polls: 0,
            started: Instant::now(),
        }
    }

    /// Note that a status query is about to be issued. Returns its 1-based
    /// number.
    pub fn begin_poll(&mut self) -> u32 {
        self.polls += 1;
        self.polls
    }

    /// Record a non-complete response. Returns `true` when the budget is
    /// now exhausted.
    pub fn record_pending(&mut self) -> bool {
        if self.count < self.max_attempts {
            self.count += 1;
        }
        self.is_exhausted()
    }

    /// Whether no further status query may be issued.
    pub fn is_exhausted(&self) -> bool {
        self.count >= self.max_attempts
    }

    /// Non-complete responses seen so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Status queries issued so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Configured maximum.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Time since the budget was started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
