use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Remote API error: {0}")]
    Remote(#[from] provider_studio::StudioError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] core_workflow::WorkflowError),
}

impl CoreError {
    /// The host must run its login flow before retrying.
    pub fn requires_login(&self) -> bool {
        match self {
            CoreError::Auth(e) => e.requires_login(),
            CoreError::Workflow(e) => e.requires_login(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
