//! Checkin: finalize a session, snapshot it, and fold the snapshot back into
//! the project file as a new revision.

use crate::context::{
    CheckinRequest, CheckinResult, SessionClosed, SnapshotDownloaded, WorkflowKind, WorkflowStep,
};
use crate::error::{Result, WorkflowError};
use crate::orchestrator::{RunTracker, WorkflowOrchestrator};
use crate::poller::{poll_until_terminal, PollError};
use core_auth::TokenRefreshCoordinator;
use provider_studio::{
    FlattenRequest, SessionFileId, SessionId, SessionStatus, SnapshotResponse, StudioError,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

impl WorkflowOrchestrator {
    /// Close the session and check its merged snapshot back into the project.
    ///
    /// Steps: set status `Finalizing`, start snapshot, await snapshot,
    /// download snapshot, delete session, checkin, upload revision, confirm
    /// checkin, flatten, create shared link. Stops at the first failure.
    ///
    /// The session is deleted only after the snapshot bytes are downloaded,
    /// and it is not recreated if a later step fails.
    #[instrument(skip_all, fields(project_id = %request.project_id, session_id = %request.session_id))]
    pub async fn run_checkin_workflow(
        &self,
        auth: &TokenRefreshCoordinator,
        request: CheckinRequest,
        cancel: &CancellationToken,
    ) -> Result<CheckinResult> {
        let mut run = RunTracker::start(WorkflowKind::Checkin, self.event_bus.as_ref(), cancel);
        let api = self.api.as_ref();
        let CheckinRequest {
            session_id,
            project_id,
            session_file_id,
            project_file_id,
        } = request;

        run.step(WorkflowStep::SetSessionStatus, async {
            let credential = auth.authorize().await?;
            api.set_session_status(&credential, &session_id, SessionStatus::Finalizing)
                .await?;
            Ok::<_, WorkflowError>(())
        })
        .await?;

        run.step(WorkflowStep::StartSnapshot, async {
            let credential = auth.authorize().await?;
            Ok::<_, WorkflowError>(
                api.start_snapshot(&credential, &session_id, session_file_id)
                    .await?,
            )
        })
        .await?;

        let download_url = run
            .step(
                WorkflowStep::AwaitSnapshot,
                self.await_snapshot(auth, &session_id, session_file_id, cancel),
            )
            .await?;

        let content = run
            .step(WorkflowStep::DownloadSnapshot, async {
                Ok::<_, WorkflowError>(api.download_blob(&download_url).await?)
            })
            .await?;

        let downloaded = SnapshotDownloaded {
            session_id,
            project_id,
            project_file_id,
            content,
        };
        let (session_id, closed) = downloaded.close_session();

        run.step(WorkflowStep::DeleteSession, async {
            let credential = auth.authorize().await?;
            Ok::<_, WorkflowError>(api.delete_session(&credential, session_id).await?)
        })
        .await?;

        let SessionClosed {
            project_id,
            project_file_id,
            content,
        } = closed;

        let revision = run
            .step(WorkflowStep::CheckinFile, async {
                let credential = auth.authorize().await?;
                Ok::<_, WorkflowError>(
                    api.checkin(&credential, &project_id, project_file_id)
                        .await?,
                )
            })
            .await?;
        let (revision_file_id, target) = revision.split();
        if revision_file_id != project_file_id {
            warn!(
                expected = %project_file_id,
                reported = %revision_file_id,
                "Checkin reported a different file id"
            );
        }

        run.step(WorkflowStep::UploadRevision, async {
            Ok::<_, WorkflowError>(api.upload_blob(target, content).await?)
        })
        .await?;

        run.step(WorkflowStep::ConfirmCheckin, async {
            let credential = auth.authorize().await?;
            Ok::<_, WorkflowError>(
                api.confirm_checkin(
                    &credential,
                    &project_id,
                    project_file_id,
                    &self.config.checkin_comment,
                )
                .await?,
            )
        })
        .await?;

        let job = run
            .step(WorkflowStep::Flatten, async {
                let credential = auth.authorize().await?;
                Ok::<_, WorkflowError>(
                    api.flatten(
                        &credential,
                        &project_id,
                        project_file_id,
                        &FlattenRequest::all_markups(),
                    )
                    .await?,
                )
            })
            .await?;

        let link = run
            .step(WorkflowStep::CreateSharedLink, async {
                let credential = auth.authorize().await?;
                Ok::<_, WorkflowError>(
                    api.create_shared_link(&credential, &project_id, project_file_id)
                        .await?,
                )
            })
            .await?;

        run.finish();
        Ok(CheckinResult {
            share_link: link.share_link,
            flatten_job_id: job.id,
        })
    }

    /// Poll the snapshot job and return its download URL.
    async fn await_snapshot(
        &self,
        auth: &TokenRefreshCoordinator,
        session_id: &SessionId,
        file_id: SessionFileId,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let api = self.api.as_ref();

        let snapshot = poll_until_terminal(
            move || async move {
                let credential = auth.authorize().await?;
                Ok::<_, WorkflowError>(
                    api.snapshot_status(&credential, session_id, file_id)
                        .await?,
                )
            },
            SnapshotResponse::is_error,
            SnapshotResponse::is_complete,
            self.config.snapshot_poll,
            cancel,
        )
        .await
        .map_err(|e| match e {
            PollError::Check(err) => err,
            PollError::JobFailed(status) => WorkflowError::RemoteJobFailed(status),
            PollError::TimedOut { elapsed } => WorkflowError::JobTimedOut { waited: elapsed },
            PollError::Cancelled => WorkflowError::Cancelled {
                step: WorkflowStep::AwaitSnapshot,
            },
        })?;

        info!(session_id = %session_id, "Snapshot complete");
        snapshot.download_url.ok_or_else(|| {
            WorkflowError::Remote(StudioError::InvalidResponse(
                "Snapshot is Complete but has no DownloadUrl".to_string(),
            ))
        })
    }
}
