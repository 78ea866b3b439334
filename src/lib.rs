//! Workspace umbrella crate.
//!
//! Re-exports the [`core_service`] façade so host applications can depend on
//! `roundtrip-workspace` alone and pick the bridge set through features
//! (`desktop-shims` is on by default).

pub use core_service::*;
