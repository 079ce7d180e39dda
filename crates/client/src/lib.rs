//! ServiceNow store API client.
//!
//! The [`StoreApi`] trait is the seam between the progress poller and the
//! remote instance; [`HttpStoreApi`] is the reqwest-backed implementation.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;

pub use api::StoreApi;
pub use config::{Auth, ClientConfig};
pub use envelope::{Envelope, TriggerResponse};
pub use error::{ApiError, Result};
pub use http::HttpStoreApi;
