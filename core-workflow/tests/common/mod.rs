//! Scripted Studio API shared by the workflow tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use core_auth::{AuthError, Credential, TokenGrant, TokenRefreshCoordinator, TokenRefresher};
use provider_studio::{
    CheckoutToSessionResponse, CreateSessionRequest, CreateSessionResponse, FlattenRequest,
    JobFlattenResponse, Project, ProjectFileId, ProjectFilesResponse, ProjectId, Result,
    SessionFileId, SessionId, SessionResponse, SessionStatus, SharedLinkResponse,
    SnapshotResponse, SnapshotStatus, StudioApi, StudioError, UploadTarget,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ORIGINAL_UPLOAD_URL: &str = "https://blob.example.com/original?sig=1";
pub const REVISION_UPLOAD_URL: &str = "https://blob.example.com/revision?sig=2";
pub const SNAPSHOT_URL: &str = "https://blob.example.com/snapshot.pdf";
pub const SNAPSHOT_BYTES: &[u8] = b"%PDF-1.7 merged markups";
pub const SHARE_LINK: &str = "https://studio.example.com/share/abc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub url: String,
    pub content_type: String,
    pub content: Bytes,
}

/// Records every call by step name and answers with canned data.
#[derive(Default)]
pub struct ScriptedStudio {
    calls: Mutex<Vec<&'static str>>,
    tokens: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, StudioError>>,
    snapshots: Mutex<VecDeque<SnapshotStatus>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub session_requests: Mutex<Vec<CreateSessionRequest>>,
    pub comments: Mutex<Vec<String>>,
    pub deleted_sessions: Mutex<Vec<SessionId>>,
}

impl ScriptedStudio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot statuses to report, in order. The last one repeats.
    pub fn with_snapshots(statuses: &[SnapshotStatus]) -> Arc<Self> {
        let studio = Self::default();
        *studio.snapshots.lock().unwrap() = statuses.iter().copied().collect();
        Arc::new(studio)
    }

    pub fn fail(&self, step: &'static str, error: StudioError) {
        self.failures.lock().unwrap().insert(step, error);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, step: &str) -> usize {
        self.calls().iter().filter(|c| **c == step).count()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    fn record(&self, step: &'static str, credential: Option<&Credential>) -> Result<()> {
        self.calls.lock().unwrap().push(step);
        if let Some(credential) = credential {
            self.tokens
                .lock()
                .unwrap()
                .push(credential.access_token.clone());
        }
        match self.failures.lock().unwrap().get(step) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_snapshot(&self) -> SnapshotStatus {
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.len() > 1 {
            snapshots.pop_front().unwrap_or(SnapshotStatus::Complete)
        } else {
            snapshots.front().copied().unwrap_or(SnapshotStatus::Complete)
        }
    }
}

#[async_trait]
impl StudioApi for ScriptedStudio {
    async fn list_projects(&self, credential: &Credential) -> Result<Vec<Project>> {
        self.record("list_projects", Some(credential))?;
        Ok(vec![Project {
            id: ProjectId::new("515-584-357"),
            name: "Tower".to_string(),
            restricted: false,
            created: None,
        }])
    }

    async fn start_upload(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        _file_name: &str,
    ) -> Result<ProjectFilesResponse> {
        self.record("start_upload", Some(credential))?;
        Ok(ProjectFilesResponse {
            id: ProjectFileId::new(981),
            upload_url: ORIGINAL_UPLOAD_URL.to_string(),
            upload_content_type: "application/pdf".to_string(),
        })
    }

    async fn upload_blob(&self, target: UploadTarget, content: Bytes) -> Result<()> {
        self.record("upload_blob", None)?;
        self.uploads.lock().unwrap().push(Upload {
            url: target.url,
            content_type: target.content_type,
            content,
        });
        Ok(())
    }

    async fn confirm_upload(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        _file_id: ProjectFileId,
    ) -> Result<()> {
        self.record("confirm_upload", Some(credential))
    }

    async fn create_session(
        &self,
        credential: &Credential,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        self.record("create_session", Some(credential))?;
        self.session_requests.lock().unwrap().push(request.clone());
        Ok(CreateSessionResponse {
            id: SessionId::new("sess-42"),
        })
    }

    async fn checkout_to_session(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        _file_id: ProjectFileId,
        session_id: &SessionId,
    ) -> Result<CheckoutToSessionResponse> {
        self.record("checkout_to_session", Some(credential))?;
        Ok(CheckoutToSessionResponse {
            session_id: session_id.clone(),
            id: SessionFileId::new(55),
        })
    }

    async fn set_session_status(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<SessionResponse> {
        self.record("set_session_status", Some(credential))?;
        Ok(SessionResponse {
            id: Some(session_id.clone()),
            name: "Review".to_string(),
            restricted: false,
            expiration_date: None,
            session_end_date: None,
            version: Some(1),
            created: None,
            invite_url: None,
            owner_email: None,
            status,
        })
    }

    async fn start_snapshot(
        &self,
        credential: &Credential,
        _session_id: &SessionId,
        _file_id: SessionFileId,
    ) -> Result<()> {
        self.record("start_snapshot", Some(credential))
    }

    async fn snapshot_status(
        &self,
        credential: &Credential,
        _session_id: &SessionId,
        _file_id: SessionFileId,
    ) -> Result<SnapshotResponse> {
        self.record("snapshot_status", Some(credential))?;
        let status = self.next_snapshot();
        Ok(SnapshotResponse {
            status,
            status_time: None,
            last_snapshot_time: None,
            download_url: (status == SnapshotStatus::Complete).then(|| SNAPSHOT_URL.to_string()),
        })
    }

    async fn download_blob(&self, url: &str) -> Result<Bytes> {
        self.record("download_blob", None)?;
        assert_eq!(url, SNAPSHOT_URL);
        Ok(Bytes::from_static(SNAPSHOT_BYTES))
    }

    async fn delete_session(&self, credential: &Credential, session_id: SessionId) -> Result<()> {
        self.record("delete_session", Some(credential))?;
        self.deleted_sessions.lock().unwrap().push(session_id);
        Ok(())
    }

    async fn checkin(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<ProjectFilesResponse> {
        self.record("checkin", Some(credential))?;
        Ok(ProjectFilesResponse {
            id: file_id,
            upload_url: REVISION_UPLOAD_URL.to_string(),
            upload_content_type: "application/pdf".to_string(),
        })
    }

    async fn confirm_checkin(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        _file_id: ProjectFileId,
        comment: &str,
    ) -> Result<()> {
        self.record("confirm_checkin", Some(credential))?;
        self.comments.lock().unwrap().push(comment.to_string());
        Ok(())
    }

    async fn flatten(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        _file_id: ProjectFileId,
        request: &FlattenRequest,
    ) -> Result<JobFlattenResponse> {
        self.record("flatten", Some(credential))?;
        assert_eq!(request, &FlattenRequest::all_markups());
        Ok(JobFlattenResponse {
            id: "job-7".to_string(),
        })
    }

    async fn create_shared_link(
        &self,
        credential: &Credential,
        _project_id: &ProjectId,
        _file_id: ProjectFileId,
    ) -> Result<SharedLinkResponse> {
        self.record("create_shared_link", Some(credential))?;
        Ok(SharedLinkResponse {
            id: "link-1".to_string(),
            share_link: SHARE_LINK.to_string(),
        })
    }
}

/// Refresher that hands out `refreshed-N` tokens, or always fails.
#[derive(Default)]
pub struct StubRefresher {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl StubRefresher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for StubRefresher {
    async fn refresh(&self, _refresh_token: &str) -> core_auth::Result<TokenGrant> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(AuthError::RefreshFailed("invalid_grant".to_string()));
        }
        Ok(TokenGrant {
            access_token: format!("refreshed-{n}"),
            refresh_token: None,
            expires_in: 3600,
            user_name: None,
            token_type: None,
        })
    }
}

pub fn fresh_auth() -> (TokenRefreshCoordinator, Arc<StubRefresher>) {
    auth_expiring_in(Duration::hours(1), false)
}

pub fn auth_expiring_in(
    lifetime: Duration,
    refresh_fails: bool,
) -> (TokenRefreshCoordinator, Arc<StubRefresher>) {
    let refresher = Arc::new(StubRefresher {
        fail: refresh_fails,
        ..Default::default()
    });
    let credential = Credential::new("initial", "refresh", Utc::now() + lifetime, "jane");
    (
        TokenRefreshCoordinator::new(credential, refresher.clone()),
        refresher,
    )
}
