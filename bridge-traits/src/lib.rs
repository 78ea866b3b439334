//! # Host Bridge Traits
//!
//! Capability traits the roundtrip core requires from its host.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - single-attempt async HTTP, used for the
//!   authorization server, the remote API and pre-signed blob storage URLs
//! - [`Clock`](time::Clock) - time source for token expiry decisions
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to the host
//!
//! ## Implementations
//!
//! | Host | Implementation Crate |
//! |------|---------------------|
//! | Native (server, CLI, desktop) | `bridge-desktop` |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Failures that
//! happen before an HTTP response exists are reported as
//! [`BridgeError::Transport`](error::BridgeError::Transport) so callers can
//! tell them apart from status-code failures.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared across concurrently running workflows.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
