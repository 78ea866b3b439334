//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the roundtrip crates:
//! - Logging and tracing setup
//! - Configuration loading and validation
//! - Event bus for auth and workflow progress
//!
//! Higher crates depend on this one for their ambient concerns; it has no
//! knowledge of the remote API itself.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{RoundtripConfig, RoundtripConfigBuilder};
pub use error::{Error, Result};
