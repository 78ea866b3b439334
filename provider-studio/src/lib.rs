//! # Studio Provider
//!
//! Typed client for the Studio public API (projects, sessions, snapshots)
//! and the pre-signed blob storage it hands out.
//!
//! ## Overview
//!
//! - [`StudioApi`]: the operations the checkout and checkin workflows use
//! - [`StudioClient`]: implementation over an injected `HttpClient`
//! - Typed PascalCase request/response bodies and id newtypes
//!
//! Every call is a single attempt. A response outside 2xx becomes
//! [`StudioError::Remote`] with the status and body; no response at all
//! becomes [`StudioError::Transport`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{StudioApi, StudioClient, STUDIO_API_BASE};
pub use error::{Result, StudioError};
pub use types::{
    CheckoutToSessionResponse, CreateSessionRequest, CreateSessionResponse, FlattenOptions,
    FlattenRequest, JobFlattenResponse, PermissionAccess, PermissionType, Project, ProjectFileId,
    ProjectFilesResponse, ProjectId, SessionFileId, SessionId, SessionPermission,
    SessionResponse, SessionStatus, SharedLinkResponse, SnapshotResponse, SnapshotStatus,
    UploadTarget,
};
