//! Studio API client
//!
//! One method per remote action. Authenticated calls take the caller's
//! [`Credential`] and attach it as a bearer token; the client never refreshes
//! or retries. Blob transfers go straight to the pre-signed storage URLs
//! without the bearer token.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_auth::Credential;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{Result, StudioError};
use crate::types::{
    CheckoutToSessionRequest, CheckoutToSessionResponse, ConfirmCheckinRequest,
    CreateSessionRequest, CreateSessionResponse, FlattenRequest, JobFlattenResponse, Project,
    ProjectFileId, ProjectFilesResponse, ProjectId, ProjectsResponse, SessionFileId, SessionId,
    SessionResponse, SessionStatus, SetSessionStatusRequest, SharedLinkRequest,
    SharedLinkResponse, SnapshotResponse, StartUploadRequest, UploadTarget,
};

/// Studio public API base URL
pub const STUDIO_API_BASE: &str = "https://studioapi.bluebeam.com/publicapi/v1";

/// Server-side encryption directive required by the blob store on upload.
const SSE_HEADER: &str = "x-amz-server-side-encryption";
const SSE_ALGORITHM: &str = "AES256";

/// Remote operations the workflows depend on.
#[async_trait]
pub trait StudioApi: Send + Sync {
    async fn list_projects(&self, credential: &Credential) -> Result<Vec<Project>>;

    /// Register a new file in the project root and get its upload target.
    async fn start_upload(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_name: &str,
    ) -> Result<ProjectFilesResponse>;

    /// PUT `content` to a pre-signed URL. The target is single-use.
    async fn upload_blob(&self, target: UploadTarget, content: Bytes) -> Result<()>;

    async fn confirm_upload(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<()>;

    async fn create_session(
        &self,
        credential: &Credential,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse>;

    async fn checkout_to_session(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
        session_id: &SessionId,
    ) -> Result<CheckoutToSessionResponse>;

    async fn set_session_status(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<SessionResponse>;

    async fn start_snapshot(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        file_id: SessionFileId,
    ) -> Result<()>;

    async fn snapshot_status(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        file_id: SessionFileId,
    ) -> Result<SnapshotResponse>;

    /// GET a pre-signed blob URL and return the exact body bytes.
    async fn download_blob(&self, url: &str) -> Result<Bytes>;

    /// Delete a session. The id is consumed; the session is gone afterwards.
    async fn delete_session(&self, credential: &Credential, session_id: SessionId) -> Result<()>;

    /// Start a new revision of a project file and get its upload target.
    async fn checkin(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<ProjectFilesResponse>;

    async fn confirm_checkin(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
        comment: &str,
    ) -> Result<()>;

    async fn flatten(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
        request: &FlattenRequest,
    ) -> Result<JobFlattenResponse>;

    async fn create_shared_link(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<SharedLinkResponse>;
}

/// [`StudioApi`] over an injected [`HttpClient`].
///
/// # Example
///
/// ```ignore
/// use provider_studio::{StudioApi, StudioClient};
///
/// let client = StudioClient::new(http_client);
/// let projects = client.list_projects(&credential).await?;
/// ```
pub struct StudioClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl StudioClient {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_base_url(http_client, STUDIO_API_BASE)
    }

    pub fn with_base_url(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn authed(method: HttpMethod, url: String, credential: &Credential) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(credential.access_token.as_str())
            .header("Accept", "application/json")
    }

    fn with_json<B: Serialize>(request: HttpRequest, body: &B) -> Result<HttpRequest> {
        request.json(body).map_err(StudioError::from)
    }

    /// Execute once; anything outside 2xx becomes [`StudioError::Remote`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(method = %method, error = %e, "Studio request failed before a response");
            StudioError::from(e)
        })?;

        if !response.is_success() {
            let body = response.text_lossy();
            warn!(
                method = %method,
                url = %strip_query(&url),
                status = response.status,
                "Studio request rejected"
            );
            return Err(StudioError::Remote {
                status_code: response.status,
                body,
            });
        }

        debug!(method = %method, status = response.status, "Studio request succeeded");
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.send(request).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| StudioError::InvalidResponse(e.to_string()))
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[async_trait]
impl StudioApi for StudioClient {
    #[instrument(skip_all)]
    async fn list_projects(&self, credential: &Credential) -> Result<Vec<Project>> {
        let request = Self::authed(HttpMethod::Get, self.url(&["projects"]), credential);
        let response: ProjectsResponse = self.send_json(request).await?;
        Ok(response.projects)
    }

    #[instrument(skip_all, fields(project_id = %project_id))]
    async fn start_upload(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_name: &str,
    ) -> Result<ProjectFilesResponse> {
        let url = self.url(&["projects", project_id.as_str(), "files"]);
        let request = Self::with_json(
            Self::authed(HttpMethod::Post, url, credential),
            &StartUploadRequest {
                name: file_name.to_string(),
                parent_folder_id: 0,
            },
        )?;
        self.send_json(request).await
    }

    #[instrument(skip_all, fields(bytes = content.len()))]
    async fn upload_blob(&self, target: UploadTarget, content: Bytes) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Put, target.url)
            .header("content-type", target.content_type)
            .header("content-length", content.len().to_string())
            .header(SSE_HEADER, SSE_ALGORITHM)
            .body(content);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(project_id = %project_id, file_id = %file_id))]
    async fn confirm_upload(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<()> {
        let url = self.url(&[
            "projects",
            project_id.as_str(),
            "files",
            &file_id.to_string(),
            "confirm-upload",
        ]);
        self.send(Self::authed(HttpMethod::Post, url, credential))
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(name = %request.name))]
    async fn create_session(
        &self,
        credential: &Credential,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        let request = Self::with_json(
            Self::authed(HttpMethod::Post, self.url(&["sessions"]), credential),
            request,
        )?;
        self.send_json(request).await
    }

    #[instrument(skip_all, fields(project_id = %project_id, file_id = %file_id, session_id = %session_id))]
    async fn checkout_to_session(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
        session_id: &SessionId,
    ) -> Result<CheckoutToSessionResponse> {
        let url = self.url(&[
            "projects",
            project_id.as_str(),
            "files",
            &file_id.to_string(),
            "checkout-to-session",
        ]);
        let request = Self::with_json(
            Self::authed(HttpMethod::Post, url, credential),
            &CheckoutToSessionRequest {
                session_id: session_id.clone(),
            },
        )?;
        self.send_json(request).await
    }

    #[instrument(skip_all, fields(session_id = %session_id, status = %status))]
    async fn set_session_status(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<SessionResponse> {
        let request = Self::with_json(
            Self::authed(
                HttpMethod::Put,
                self.url(&["sessions", session_id.as_str()]),
                credential,
            ),
            &SetSessionStatusRequest { status },
        )?;
        self.send_json(request).await
    }

    #[instrument(skip_all, fields(session_id = %session_id, file_id = %file_id))]
    async fn start_snapshot(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        file_id: SessionFileId,
    ) -> Result<()> {
        let url = self.url(&[
            "sessions",
            session_id.as_str(),
            "files",
            &file_id.to_string(),
            "snapshot",
        ]);
        self.send(Self::authed(HttpMethod::Post, url, credential))
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(session_id = %session_id, file_id = %file_id))]
    async fn snapshot_status(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        file_id: SessionFileId,
    ) -> Result<SnapshotResponse> {
        let url = self.url(&[
            "sessions",
            session_id.as_str(),
            "files",
            &file_id.to_string(),
            "snapshot",
        ]);
        self.send_json(Self::authed(HttpMethod::Get, url, credential))
            .await
    }

    #[instrument(skip_all)]
    async fn download_blob(&self, url: &str) -> Result<Bytes> {
        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url.to_string()))
            .await?;
        debug!(bytes = response.body.len(), "Blob downloaded");
        Ok(response.body)
    }

    #[instrument(skip_all, fields(session_id = %session_id))]
    async fn delete_session(&self, credential: &Credential, session_id: SessionId) -> Result<()> {
        let url = self.url(&["sessions", session_id.as_str()]);
        self.send(Self::authed(HttpMethod::Delete, url, credential))
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(project_id = %project_id, file_id = %file_id))]
    async fn checkin(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<ProjectFilesResponse> {
        let url = self.url(&[
            "projects",
            project_id.as_str(),
            "files",
            &file_id.to_string(),
            "checkin",
        ]);
        self.send_json(Self::authed(HttpMethod::Post, url, credential))
            .await
    }

    #[instrument(skip_all, fields(project_id = %project_id, file_id = %file_id))]
    async fn confirm_checkin(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
        comment: &str,
    ) -> Result<()> {
        let url = self.url(&[
            "projects",
            project_id.as_str(),
            "files",
            &file_id.to_string(),
            "confirm-checkin",
        ]);
        let request = Self::with_json(
            Self::authed(HttpMethod::Post, url, credential),
            &ConfirmCheckinRequest {
                comment: comment.to_string(),
            },
        )?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(project_id = %project_id, file_id = %file_id))]
    async fn flatten(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
        request: &FlattenRequest,
    ) -> Result<JobFlattenResponse> {
        let url = self.url(&[
            "projects",
            project_id.as_str(),
            "files",
            &file_id.to_string(),
            "jobs",
            "flatten",
        ]);
        let request = Self::with_json(Self::authed(HttpMethod::Post, url, credential), request)?;
        self.send_json(request).await
    }

    #[instrument(skip_all, fields(project_id = %project_id, file_id = %file_id))]
    async fn create_shared_link(
        &self,
        credential: &Credential,
        project_id: &ProjectId,
        file_id: ProjectFileId,
    ) -> Result<SharedLinkResponse> {
        let url = self.url(&["projects", project_id.as_str(), "sharedlinks"]);
        let request = Self::with_json(
            Self::authed(HttpMethod::Post, url, credential),
            &SharedLinkRequest {
                project_file_id: file_id,
            },
        )?;
        self.send_json(request).await
    }
}
