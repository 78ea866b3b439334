//! Checkout: local file → project file → new session.

use crate::context::{CheckoutRequest, CheckoutResult, FileUploaded, WorkflowKind, WorkflowStep};
use crate::error::{Result, WorkflowError};
use crate::orchestrator::{RunTracker, WorkflowOrchestrator};
use core_auth::TokenRefreshCoordinator;
use core_runtime::logging::strip_path;
use provider_studio::CreateSessionRequest;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

impl WorkflowOrchestrator {
    /// Upload `request.content` into the project and check it out into a
    /// freshly created session.
    ///
    /// Steps: start upload, upload blob, confirm upload, create session,
    /// checkout to session. Stops at the first failure.
    #[instrument(skip_all, fields(project_id = %request.project_id, file_name = %strip_path(&request.file_name)))]
    pub async fn run_checkout_workflow(
        &self,
        auth: &TokenRefreshCoordinator,
        request: CheckoutRequest,
        cancel: &CancellationToken,
    ) -> Result<CheckoutResult> {
        let mut run = RunTracker::start(WorkflowKind::Checkout, self.event_bus.as_ref(), cancel);
        let api = self.api.as_ref();
        let CheckoutRequest {
            project_id,
            file_name,
            content,
            session_name,
        } = request;

        let upload = run
            .step(WorkflowStep::StartUpload, async {
                let credential = auth.authorize().await?;
                Ok::<_, WorkflowError>(
                    api.start_upload(&credential, &project_id, &file_name)
                        .await?,
                )
            })
            .await?;
        let (project_file_id, target) = upload.split();

        run.step(WorkflowStep::UploadBlob, async {
            Ok::<_, WorkflowError>(api.upload_blob(target, content).await?)
        })
        .await?;

        run.step(WorkflowStep::ConfirmUpload, async {
            let credential = auth.authorize().await?;
            Ok::<_, WorkflowError>(
                api.confirm_upload(&credential, &project_id, project_file_id)
                    .await?,
            )
        })
        .await?;

        let uploaded = FileUploaded {
            project_id,
            project_file_id,
            session_name,
        };

        let session = run
            .step(WorkflowStep::CreateSession, async {
                let end_date = self.session_end_date()?;
                let credential = auth.authorize().await?;
                let body = CreateSessionRequest::with_default_permissions(
                    uploaded.session_name.as_str(),
                    end_date,
                );
                Ok::<_, WorkflowError>(api.create_session(&credential, &body).await?)
            })
            .await?;
        let created = uploaded.with_session(session.id);

        let checkout = run
            .step(WorkflowStep::CheckoutToSession, async {
                let credential = auth.authorize().await?;
                Ok::<_, WorkflowError>(
                    api.checkout_to_session(
                        &credential,
                        &created.project_id,
                        created.project_file_id,
                        &created.session_id,
                    )
                    .await?,
                )
            })
            .await?;

        if checkout.session_id != created.session_id {
            warn!(
                expected = %created.session_id,
                reported = %checkout.session_id,
                "Checkout reported a different session; keeping the created one"
            );
        }

        let result = created.checked_out(checkout.id);
        run.finish();
        Ok(result)
    }
}
