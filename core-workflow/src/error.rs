use crate::context::WorkflowStep;
use core_auth::AuthError;
use provider_studio::{SnapshotResponse, StudioError};
use std::time::Duration;
use thiserror::Error;

/// First failure of a workflow run, surfaced unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Remote(#[from] StudioError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The snapshot job reported `Error`.
    #[error("Remote job failed with status {}", .0.status)]
    RemoteJobFailed(SnapshotResponse),

    #[error("Remote job still running after {waited:?}")]
    JobTimedOut { waited: Duration },

    #[error("Workflow cancelled during {step}")]
    Cancelled { step: WorkflowStep },

    #[error("Invalid workflow input: {0}")]
    InvalidInput(String),
}

impl WorkflowError {
    /// The caller must send the user back through login.
    pub fn requires_login(&self) -> bool {
        matches!(self, WorkflowError::Auth(e) if e.requires_login())
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
