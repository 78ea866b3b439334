//! # Authentication Module
//!
//! Credential lifecycle for calls against the remote collaboration API.
//!
//! ## Overview
//!
//! Login itself happens in the host application. This crate takes over from
//! there: it keeps the resulting [`Credential`], refreshes it when it expires,
//! and tells the host about every refresh so the host can store it.
//!
//! ## Features
//!
//! - [`TokenRefreshCoordinator`]: single-flight refresh behind `authorize()`
//! - [`oauth::OAuthClient`]: `refresh_token` grant against the token endpoint
//! - [`CredentialPersister`]: fire-and-forget persistence callback
//! - Auth event emission on the shared event bus

pub mod coordinator;
pub mod error;
pub mod oauth;
pub mod persistence;
pub mod types;

pub use coordinator::TokenRefreshCoordinator;
pub use error::{AuthError, Result};
pub use oauth::{OAuthClient, OAuthClientConfig, TokenRefresher};
pub use persistence::{CredentialPersister, InMemoryCredentialStore};
pub use types::{Credential, TokenGrant};
