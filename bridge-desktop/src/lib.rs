//! # Native Bridge Implementations
//!
//! Default implementations of bridge traits for native hosts (server
//! processes, CLIs and desktop apps on macOS, Windows and Linux).
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! // Hand to core_service::RoundtripService::new(...)
//! ```

mod http;

pub use http::ReqwestHttpClient;
