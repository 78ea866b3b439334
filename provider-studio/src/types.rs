//! Studio API request and response types
//!
//! Field names follow the API's PascalCase JSON. Identifiers are wrapped in
//! newtypes so a session-file id can never be passed where a project-file id
//! is expected.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Studio Project identifier, e.g. `515-584-357`.
    ProjectId
);
string_id!(
    /// Studio Session identifier.
    SessionId
);
numeric_id!(
    /// A file stored in a Project.
    ProjectFileId
);
numeric_id!(
    /// The checked-out copy of a project file inside a Session.
    SessionFileId
);

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectsResponse {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartUploadRequest {
    pub name: String,
    /// `0` is the project root.
    pub parent_folder_id: u64,
}

/// Answer to "start upload" and "checkin": the project file plus a
/// single-use pre-signed storage URL for its content.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectFilesResponse {
    pub id: ProjectFileId,
    pub upload_url: String,
    pub upload_content_type: String,
}

impl ProjectFilesResponse {
    /// Separate the durable file id from the one-shot upload target.
    pub fn split(self) -> (ProjectFileId, UploadTarget) {
        (
            self.id,
            UploadTarget {
                url: self.upload_url,
                content_type: self.upload_content_type,
            },
        )
    }
}

impl fmt::Debug for ProjectFilesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectFilesResponse")
            .field("id", &self.id)
            .field("upload_url", &strip_query(&self.upload_url))
            .field("upload_content_type", &self.upload_content_type)
            .finish()
    }
}

/// Pre-signed blob storage destination. Consumed by the upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub url: String,
    pub content_type: String,
}

impl fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTarget")
            .field("url", &strip_query(&self.url))
            .field("content_type", &self.content_type)
            .finish()
    }
}

// Pre-signed URLs carry their signature in the query string.
fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckoutToSessionRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckoutToSessionResponse {
    pub session_id: SessionId,
    /// Id of the file copy inside the session.
    pub id: SessionFileId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfirmCheckinRequest {
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedLinkRequest {
    #[serde(rename = "ProjectFileID")]
    pub project_file_id: ProjectFileId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedLinkResponse {
    pub id: String,
    pub share_link: String,
}

/// Markup kinds baked into page content by a flatten job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlattenOptions {
    pub image: bool,
    pub ellipse: bool,
    pub stamp: bool,
    pub snapshot: bool,
    pub text_and_callout: bool,
    pub ink_and_highlighter: bool,
    pub line_and_dimension: bool,
    pub measure_area: bool,
    pub polyline: bool,
    pub polygon_and_cloud: bool,
    pub rectangle: bool,
    pub text_markups: bool,
    pub group: bool,
    pub file_attachment: bool,
    pub flags: bool,
    pub notes: bool,
    pub form_fields: bool,
}

impl FlattenOptions {
    pub fn all() -> Self {
        Self {
            image: true,
            ellipse: true,
            stamp: true,
            snapshot: true,
            text_and_callout: true,
            ink_and_highlighter: true,
            line_and_dimension: true,
            measure_area: true,
            polyline: true,
            polygon_and_cloud: true,
            rectangle: true,
            text_markups: true,
            group: true,
            file_attachment: true,
            flags: true,
            notes: true,
            form_fields: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlattenRequest {
    /// Keep the original markups recoverable after flattening.
    pub recoverable: bool,
    /// `-1` selects every page.
    pub page_range: String,
    pub options: FlattenOptions,
}

impl FlattenRequest {
    /// Every markup type, every page, recoverable.
    pub fn all_markups() -> Self {
        Self {
            recoverable: true,
            page_range: "-1".to_string(),
            options: FlattenOptions::all(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobFlattenResponse {
    pub id: String,
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionType {
    SaveCopy,
    PrintCopy,
    Markup,
    MarkupAlert,
    AddDocuments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionAccess {
    Allow,
    Deny,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionPermission {
    #[serde(rename = "Type")]
    pub permission: PermissionType,
    pub allow: PermissionAccess,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSessionRequest {
    pub name: String,
    pub notification: bool,
    pub restricted: bool,
    #[serde(serialize_with = "serialize_js_timestamp")]
    pub session_end_date: DateTime<Utc>,
    pub default_permissions: Vec<SessionPermission>,
}

impl CreateSessionRequest {
    /// Open session with notifications on and every default permission
    /// granted to attendees.
    pub fn with_default_permissions(name: impl Into<String>, end_date: DateTime<Utc>) -> Self {
        let default_permissions = [
            PermissionType::SaveCopy,
            PermissionType::PrintCopy,
            PermissionType::Markup,
            PermissionType::MarkupAlert,
            PermissionType::AddDocuments,
        ]
        .into_iter()
        .map(|permission| SessionPermission {
            permission,
            allow: PermissionAccess::Allow,
        })
        .collect();

        Self {
            name: name.into(),
            notification: true,
            restricted: false,
            session_end_date: end_date,
            default_permissions,
        }
    }
}

/// `2024-05-01T12:00:00.000Z`, the form the API emits and accepts.
fn serialize_js_timestamp<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSessionResponse {
    pub id: SessionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    /// Forces every attendee out of the session.
    Finalizing,
    Closed,
    /// Unrecognized or omitted by the server.
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Active => "Active",
            SessionStatus::Finalizing => "Finalizing",
            SessionStatus::Closed => "Closed",
            SessionStatus::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetSessionStatusRequest {
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionResponse {
    /// Absent from some status-update acknowledgements.
    #[serde(default)]
    pub id: Option<SessionId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub session_end_date: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub invite_url: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
}

/// Progress of a server-side snapshot job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotStatus {
    Pending,
    Processing,
    Complete,
    Error,
    /// Any value this client does not recognize. Treated as still running.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnapshotStatus::Pending => "Pending",
            SnapshotStatus::Processing => "Processing",
            SnapshotStatus::Complete => "Complete",
            SnapshotStatus::Error => "Error",
            SnapshotStatus::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One observation of a snapshot job. Re-fetched on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotResponse {
    pub status: SnapshotStatus,
    #[serde(default)]
    pub status_time: Option<String>,
    #[serde(default)]
    pub last_snapshot_time: Option<String>,
    /// Present once the status is `Complete`.
    #[serde(default)]
    pub download_url: Option<String>,
}

impl SnapshotResponse {
    pub fn is_complete(&self) -> bool {
        self.status == SnapshotStatus::Complete
    }

    pub fn is_error(&self) -> bool {
        self.status == SnapshotStatus::Error
    }
}
