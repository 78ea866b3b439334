//! Core service façade and bootstrap helpers.
//!
//! Wires a host-provided [`HttpClient`] and the host's current [`Credential`]
//! into the token refresh coordinator, the remote API client and the workflow
//! orchestrator. Native hosts enable the `desktop-shims` feature (on by
//! default) and call [`bootstrap_desktop`] to get a reqwest-backed service.
//!
//! ```ignore
//! use core_service::{bootstrap_desktop, CancellationToken, CheckoutRequest};
//!
//! let service = bootstrap_desktop(&config, credential)?
//!     .with_persister(keychain_writer);
//! let checkout = service
//!     .run_checkout_workflow(request, &CancellationToken::new())
//!     .await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_auth::{Credential, CredentialPersister, TokenRefresher};
pub use core_runtime::config::RoundtripConfig;
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_runtime::events::{CoreEvent, EventStream};
pub use core_workflow::{
    CancellationToken, CheckinRequest, CheckinResult, CheckoutRequest, CheckoutResult,
    WorkflowConfig,
};
pub use provider_studio::{Project, ProjectId, StudioApi};

use std::sync::Arc;

use bridge_traits::http::HttpClient;
use core_auth::{OAuthClient, OAuthClientConfig, TokenRefreshCoordinator};
use core_runtime::events::EventBus;
use core_workflow::WorkflowOrchestrator;
use provider_studio::StudioClient;

/// Bridge handles the core needs from its host.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
}

impl CoreDependencies {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

/// Primary façade exposed to host applications.
///
/// Clones share the credential, the refresh guard and the event bus.
#[derive(Clone)]
pub struct RoundtripService {
    api: Arc<dyn StudioApi>,
    auth: TokenRefreshCoordinator,
    orchestrator: Arc<WorkflowOrchestrator>,
    event_bus: EventBus,
}

impl RoundtripService {
    /// Build the service against the configured API and token endpoint.
    pub fn new(deps: CoreDependencies, config: &RoundtripConfig, credential: Credential) -> Self {
        let api: Arc<dyn StudioApi> = Arc::new(StudioClient::with_base_url(
            Arc::clone(&deps.http_client),
            config.api_base_url.as_str(),
        ));
        let refresher: Arc<dyn TokenRefresher> = Arc::new(OAuthClient::new(
            OAuthClientConfig::new(
                config.client_id.as_str(),
                config.client_secret.as_str(),
                config.token_url.as_str(),
            ),
            deps.http_client,
        ));

        Self::from_parts(api, refresher, WorkflowConfig::from(config), credential)
    }

    /// Assemble from already-built pieces. Hosts with their own API or
    /// refresher implementations start here.
    pub fn from_parts(
        api: Arc<dyn StudioApi>,
        refresher: Arc<dyn TokenRefresher>,
        workflow_config: WorkflowConfig,
        credential: Credential,
    ) -> Self {
        let event_bus = EventBus::default();
        let auth = TokenRefreshCoordinator::new(credential, refresher)
            .with_event_bus(event_bus.clone());
        let orchestrator = WorkflowOrchestrator::new(Arc::clone(&api), workflow_config)
            .with_event_bus(event_bus.clone());

        Self {
            api,
            auth,
            orchestrator: Arc::new(orchestrator),
            event_bus,
        }
    }

    /// Hand every refreshed credential to `persister`.
    ///
    /// Call before cloning the service.
    pub fn with_persister(mut self, persister: Arc<dyn CredentialPersister>) -> Self {
        self.auth = self.auth.with_persister(persister);
        self
    }

    /// Auth and workflow progress events from now on.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// The credential as currently held, possibly expired.
    pub async fn credential(&self) -> Credential {
        self.auth.current().await
    }

    /// Swap in a credential from a fresh login.
    pub async fn replace_credential(&self, credential: Credential) {
        self.auth.replace_credential(credential).await;
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let credential = self.auth.authorize().await?;
        Ok(self.api.list_projects(&credential).await?)
    }

    pub async fn run_checkout_workflow(
        &self,
        request: CheckoutRequest,
        cancel: &CancellationToken,
    ) -> Result<CheckoutResult> {
        Ok(self
            .orchestrator
            .run_checkout_workflow(&self.auth, request, cancel)
            .await?)
    }

    pub async fn run_checkin_workflow(
        &self,
        request: CheckinRequest,
        cancel: &CancellationToken,
    ) -> Result<CheckinResult> {
        Ok(self
            .orchestrator
            .run_checkin_workflow(&self.auth, request, cancel)
            .await?)
    }
}

/// Build a service over the reqwest HTTP client.
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub fn bootstrap_desktop(config: &RoundtripConfig, credential: Credential) -> Result<RoundtripService> {
    let http_client = bridge_desktop::ReqwestHttpClient::with_timeout(config.http_timeout)
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

    tracing::info!(api = %config.api_base_url, "Roundtrip service initialized");
    Ok(RoundtripService::new(
        CoreDependencies::new(Arc::new(http_client)),
        config,
        credential,
    ))
}
