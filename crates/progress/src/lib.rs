//! Operation progress tracking.
//!
//! Bounded fixed-interval polling of a tracking handle, the trigger-then-poll
//! operation runner, and a tracker that runs several operations at once.

#![warn(missing_docs)]

pub mod cancel;
pub mod config;
pub mod poller;
pub mod runner;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::{CancelHandle, CancelSignal};
pub use config::{ConfigError, PollerConfig};
pub use poller::Poller;
pub use runner::OperationRunner;
pub use tracker::{OperationTracker, TrackedOperation};
