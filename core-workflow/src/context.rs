//! Workflow inputs, outputs and the per-step accumulators between them.
//!
//! Each stage type holds exactly what the following steps still need, and a
//! step consumes its stage to produce the next one. The upload target is
//! consumed by the upload, and no stage after `delete_session` carries a
//! session id.

use bytes::Bytes;
use provider_studio::{ProjectFileId, ProjectId, SessionFileId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Checkout,
    Checkin,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Checkout => "checkout",
            WorkflowKind::Checkin => "checkin",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every remote action either workflow performs, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    StartUpload,
    UploadBlob,
    ConfirmUpload,
    CreateSession,
    CheckoutToSession,
    SetSessionStatus,
    StartSnapshot,
    AwaitSnapshot,
    DownloadSnapshot,
    DeleteSession,
    CheckinFile,
    UploadRevision,
    ConfirmCheckin,
    Flatten,
    CreateSharedLink,
}

impl WorkflowStep {
    pub const CHECKOUT: [WorkflowStep; 5] = [
        WorkflowStep::StartUpload,
        WorkflowStep::UploadBlob,
        WorkflowStep::ConfirmUpload,
        WorkflowStep::CreateSession,
        WorkflowStep::CheckoutToSession,
    ];

    pub const CHECKIN: [WorkflowStep; 10] = [
        WorkflowStep::SetSessionStatus,
        WorkflowStep::StartSnapshot,
        WorkflowStep::AwaitSnapshot,
        WorkflowStep::DownloadSnapshot,
        WorkflowStep::DeleteSession,
        WorkflowStep::CheckinFile,
        WorkflowStep::UploadRevision,
        WorkflowStep::ConfirmCheckin,
        WorkflowStep::Flatten,
        WorkflowStep::CreateSharedLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::StartUpload => "start_upload",
            WorkflowStep::UploadBlob => "upload_blob",
            WorkflowStep::ConfirmUpload => "confirm_upload",
            WorkflowStep::CreateSession => "create_session",
            WorkflowStep::CheckoutToSession => "checkout_to_session",
            WorkflowStep::SetSessionStatus => "set_session_status",
            WorkflowStep::StartSnapshot => "start_snapshot",
            WorkflowStep::AwaitSnapshot => "await_snapshot",
            WorkflowStep::DownloadSnapshot => "download_snapshot",
            WorkflowStep::DeleteSession => "delete_session",
            WorkflowStep::CheckinFile => "checkin_file",
            WorkflowStep::UploadRevision => "upload_revision",
            WorkflowStep::ConfirmCheckin => "confirm_checkin",
            WorkflowStep::Flatten => "flatten",
            WorkflowStep::CreateSharedLink => "create_shared_link",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Checkout
// ============================================================================

/// Put a local file into a project and open it in a new session.
#[derive(Clone)]
pub struct CheckoutRequest {
    pub project_id: ProjectId,
    pub file_name: String,
    pub content: Bytes,
    pub session_name: String,
}

impl fmt::Debug for CheckoutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutRequest")
            .field("project_id", &self.project_id)
            .field("file_name", &self.file_name)
            .field("content_len", &self.content.len())
            .field("session_name", &self.session_name)
            .finish()
    }
}

/// Everything a later checkin needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub session_id: SessionId,
    pub project_id: ProjectId,
    pub session_file_id: SessionFileId,
    pub project_file_id: ProjectFileId,
    pub session_name: String,
}

/// After start/upload/confirm: the file exists in the project.
#[derive(Debug)]
pub(crate) struct FileUploaded {
    pub project_id: ProjectId,
    pub project_file_id: ProjectFileId,
    pub session_name: String,
}

#[derive(Debug)]
pub(crate) struct SessionCreated {
    pub project_id: ProjectId,
    pub project_file_id: ProjectFileId,
    pub session_name: String,
    pub session_id: SessionId,
}

impl FileUploaded {
    pub fn with_session(self, session_id: SessionId) -> SessionCreated {
        SessionCreated {
            project_id: self.project_id,
            project_file_id: self.project_file_id,
            session_name: self.session_name,
            session_id,
        }
    }
}

impl SessionCreated {
    pub fn checked_out(self, session_file_id: SessionFileId) -> CheckoutResult {
        CheckoutResult {
            session_id: self.session_id,
            project_id: self.project_id,
            session_file_id,
            project_file_id: self.project_file_id,
            session_name: self.session_name,
        }
    }
}

// ============================================================================
// Checkin
// ============================================================================

/// Close a session and fold its markups back into the project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRequest {
    pub session_id: SessionId,
    pub project_id: ProjectId,
    pub session_file_id: SessionFileId,
    pub project_file_id: ProjectFileId,
}

impl From<CheckoutResult> for CheckinRequest {
    fn from(checkout: CheckoutResult) -> Self {
        Self {
            session_id: checkout.session_id,
            project_id: checkout.project_id,
            session_file_id: checkout.session_file_id,
            project_file_id: checkout.project_file_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinResult {
    pub share_link: String,
    /// Id of the flatten job; it finishes asynchronously on the server.
    pub flatten_job_id: String,
}

/// Snapshot bytes in hand; the session is about to go away.
pub(crate) struct SnapshotDownloaded {
    pub session_id: SessionId,
    pub project_id: ProjectId,
    pub project_file_id: ProjectFileId,
    pub content: Bytes,
}

/// Session deleted. Only project-side state remains.
pub(crate) struct SessionClosed {
    pub project_id: ProjectId,
    pub project_file_id: ProjectFileId,
    pub content: Bytes,
}

impl SnapshotDownloaded {
    /// Split off the session id for deletion; the rest carries on.
    pub fn close_session(self) -> (SessionId, SessionClosed) {
        (
            self.session_id,
            SessionClosed {
                project_id: self.project_id,
                project_file_id: self.project_file_id,
                content: self.content,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_result_feeds_checkin() {
        let checkout = CheckoutResult {
            session_id: SessionId::new("s1"),
            project_id: ProjectId::new("p1"),
            session_file_id: SessionFileId::new(55),
            project_file_id: ProjectFileId::new(981),
            session_name: "Review".to_string(),
        };

        let request = CheckinRequest::from(checkout);
        assert_eq!(request.session_id, SessionId::new("s1"));
        assert_eq!(request.session_file_id, SessionFileId::new(55));
        assert_eq!(request.project_file_id, ProjectFileId::new(981));
    }

    #[test]
    fn test_step_names() {
        assert_eq!(WorkflowStep::CHECKIN[4].as_str(), "delete_session");
        assert_eq!(WorkflowStep::CHECKOUT[1].to_string(), "upload_blob");
        assert_eq!(
            serde_json::to_string(&WorkflowStep::CreateSharedLink).unwrap(),
            "\"create_shared_link\""
        );
    }
}
