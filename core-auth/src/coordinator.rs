//! # Token Refresh Coordinator
//!
//! Owns one [`Credential`] and hands out copies that are valid for the next
//! remote call.
//!
//! ## Single-flight refresh
//!
//! When [`TokenRefreshCoordinator::authorize`] finds the credential expired,
//! the first caller installs a shared refresh future behind a mutex. Callers
//! arriving while it runs clone and await that same future, so N concurrent
//! callers cost exactly one exchange with the authorization server. The slot
//! is cleared when the refresh settles (success or failure), and the next
//! expiration starts a new one.
//!
//! ## Failure
//!
//! A failed exchange is surfaced as [`AuthError::RefreshFailed`] to every
//! waiter. Nothing is retried and the stored credential stays as it was until
//! the host logs the user in again and calls
//! [`TokenRefreshCoordinator::replace_credential`].
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{Credential, InMemoryCredentialStore, TokenRefreshCoordinator};
//! use core_auth::oauth::{OAuthClient, OAuthClientConfig};
//! use std::sync::Arc;
//!
//! # async fn example(credential: Credential) -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let refresher = OAuthClient::new(
//!     OAuthClientConfig::new("id", "secret", "https://authserver.bluebeam.com/auth/token"),
//!     http_client,
//! );
//! let coordinator = TokenRefreshCoordinator::new(credential, Arc::new(refresher))
//!     .with_persister(Arc::new(InMemoryCredentialStore::new()));
//!
//! let valid = coordinator.authorize().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::TokenRefresher;
use crate::persistence::CredentialPersister;
use crate::types::Credential;
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential>>>;

struct Inner {
    credential: RwLock<Credential>,
    in_flight: Mutex<Option<RefreshFuture>>,
    refresher: Arc<dyn TokenRefresher>,
    persister: Option<Arc<dyn CredentialPersister>>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

/// Cloneable handle; clones share the credential and the in-flight guard.
#[derive(Clone)]
pub struct TokenRefreshCoordinator {
    inner: Arc<Inner>,
}

impl TokenRefreshCoordinator {
    pub fn new(credential: Credential, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                credential: RwLock::new(credential),
                in_flight: Mutex::new(None),
                refresher,
                persister: None,
                clock: Arc::new(SystemClock),
                event_bus: None,
            }),
        }
    }

    /// Register the callback notified with every refreshed credential.
    ///
    /// Builder methods must run before the handle is cloned.
    pub fn with_persister(self, persister: Arc<dyn CredentialPersister>) -> Self {
        self.map_inner(|inner| inner.persister = Some(persister))
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        self.map_inner(|inner| inner.clock = clock)
    }

    pub fn with_event_bus(self, event_bus: EventBus) -> Self {
        self.map_inner(|inner| inner.event_bus = Some(event_bus))
    }

    fn map_inner(self, apply: impl FnOnce(&mut Inner)) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                apply(&mut inner);
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(shared) => {
                warn!("Coordinator already shared; builder option ignored");
                Self { inner: shared }
            }
        }
    }

    /// Return a credential that is not expired as of now.
    ///
    /// Triggers at most one refresh exchange no matter how many callers are
    /// waiting on it.
    ///
    /// # Errors
    ///
    /// [`AuthError::RefreshFailed`] if the exchange failed. The stored
    /// credential is left untouched.
    #[instrument(skip(self))]
    pub async fn authorize(&self) -> Result<Credential> {
        {
            let credential = self.inner.credential.read().await;
            if !credential.is_expired_at(self.inner.clock.now()) {
                return Ok(credential.clone());
            }
        }

        let refresh = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    // A refresh may have settled between the read above and this lock.
                    let current = self.inner.credential.read().await.clone();
                    if !current.is_expired_at(self.inner.clock.now()) {
                        return Ok(current);
                    }

                    let pending = Arc::clone(&self.inner).refresh(current).boxed().shared();
                    *in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        refresh.await
    }

    /// Snapshot of the stored credential, expired or not.
    pub async fn current(&self) -> Credential {
        self.inner.credential.read().await.clone()
    }

    /// Install a credential from a fresh login.
    pub async fn replace_credential(&self, credential: Credential) {
        info!(
            subject_id = %redact_if_sensitive("subject_id", &credential.subject_id),
            "Credential replaced after login"
        );
        *self.inner.credential.write().await = credential;
    }
}

impl Inner {
    async fn refresh(self: Arc<Self>, stale: Credential) -> Result<Credential> {
        let subject_id = stale.subject_id.clone();
        info!(
            subject_id = %redact_if_sensitive("subject_id", &subject_id),
            "Access token expired; refreshing"
        );
        self.emit(AuthEvent::TokenRefreshing {
            subject_id: subject_id.clone(),
        });

        let exchange = self
            .refresher
            .refresh(&stale.refresh_token)
            .await
            .and_then(|grant| Credential::from_grant(grant, &stale, self.clock.now()));

        let outcome = match exchange {
            Ok(refreshed) => {
                *self.credential.write().await = refreshed.clone();

                self.emit(AuthEvent::TokenRefreshed {
                    subject_id: refreshed.subject_id.clone(),
                    expires_at: refreshed.expiration.timestamp(),
                });
                self.notify_persister(&refreshed);
                Ok(refreshed)
            }
            Err(err) => {
                warn!(
                    subject_id = %redact_if_sensitive("subject_id", &subject_id),
                    error = %err,
                    "Token refresh failed; login required"
                );
                let message = err.to_string();
                self.emit(AuthEvent::RefreshFailed {
                    subject_id,
                    message: message.clone(),
                });
                Err(match err {
                    AuthError::RefreshFailed(_) => err,
                    _ => AuthError::RefreshFailed(message),
                })
            }
        };

        *self.in_flight.lock().await = None;
        outcome
    }

    fn notify_persister(&self, credential: &Credential) {
        let Some(persister) = self.persister.clone() else {
            return;
        };

        let credential = credential.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = persister.persist(&credential).await {
                        warn!(
                            subject_id = %redact_if_sensitive("subject_id", &credential.subject_id),
                            error = %e,
                            "Failed to persist refreshed credential"
                        );
                    }
                });
            }
            Err(_) => warn!("No async runtime; refreshed credential not persisted"),
        }
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }
}

impl fmt::Debug for TokenRefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefreshCoordinator")
            .field("has_persister", &self.inner.persister.is_some())
            .field("has_event_bus", &self.inner.event_bus.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenGrant;
    use async_trait::async_trait;
    use bridge_traits::time::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn clock_at(secs: i64) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.timestamp_opt(secs, 0).unwrap()))
    }

    /// Counts exchanges; optionally sleeps so callers pile up behind it.
    #[derive(Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
        delay: Option<std::time::Duration>,
        fail: bool,
        /// `expires_in` reported by the first exchange only.
        first_lifetime: Option<i64>,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AuthError::RefreshFailed("invalid_grant".to_string()));
            }
            Ok(TokenGrant {
                access_token: format!("access-{n}"),
                refresh_token: Some(format!("{refresh_token}-next")),
                expires_in: self.first_lifetime.filter(|_| n == 1).unwrap_or(3600),
                user_name: None,
                token_type: None,
            })
        }
    }

    struct ChannelPersister(mpsc::UnboundedSender<Credential>);

    #[async_trait]
    impl CredentialPersister for ChannelPersister {
        async fn persist(&self, credential: &Credential) -> Result<()> {
            self.0.send(credential.clone()).ok();
            Ok(())
        }
    }

    struct FailingPersister;

    #[async_trait]
    impl CredentialPersister for FailingPersister {
        async fn persist(&self, _credential: &Credential) -> Result<()> {
            Err(AuthError::Persistence("disk full".to_string()))
        }
    }

    fn credential_expiring_at(secs: i64) -> Credential {
        Credential::new("access-0", "refresh-0", Utc.timestamp_opt(secs, 0).unwrap(), "jane")
    }

    #[tokio::test]
    async fn test_valid_credential_is_returned_without_refresh() {
        let refresher = Arc::new(CountingRefresher::default());
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(2_000), refresher.clone())
                .with_clock(clock_at(1_999));

        let credential = coordinator.authorize().await.unwrap();

        assert_eq!(credential.access_token, "access-0");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiration_instant_triggers_refresh() {
        let refresher = Arc::new(CountingRefresher::default());
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(2_000), refresher.clone())
                .with_clock(clock_at(2_000));

        let credential = coordinator.authorize().await.unwrap();

        assert_eq!(credential.access_token, "access-1");
        assert_eq!(credential.refresh_token, "refresh-0-next");
        assert_eq!(credential.expiration, Utc.timestamp_opt(5_600, 0).unwrap());
        assert_eq!(coordinator.current().await, credential);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        // Fresh now; no second exchange.
        coordinator.authorize().await.unwrap();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = Arc::new(CountingRefresher {
            delay: Some(std::time::Duration::from_secs(1)),
            ..Default::default()
        });
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(1_000), refresher.clone())
                .with_clock(clock_at(5_000));

        let results =
            futures::future::join_all((0..10).map(|_| coordinator.authorize())).await;

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().access_token, "access-1");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_failure() {
        let refresher = Arc::new(CountingRefresher {
            delay: Some(std::time::Duration::from_millis(500)),
            fail: true,
            ..Default::default()
        });
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(1_000), refresher.clone())
                .with_clock(clock_at(5_000));

        let results = futures::future::join_all((0..5).map(|_| coordinator.authorize())).await;

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(AuthError::RefreshFailed(_)))));
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_credential_stale_and_guard_resets() {
        let refresher = Arc::new(CountingRefresher {
            fail: true,
            ..Default::default()
        });
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(1_000), refresher.clone())
                .with_clock(clock_at(5_000));

        let err = coordinator.authorize().await.unwrap_err();
        assert!(err.requires_login());
        assert_eq!(coordinator.current().await, credential_expiring_at(1_000));

        // No automatic retry, but the next call may try again.
        coordinator.authorize().await.unwrap_err();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_fails_refresh_and_guard_resets() {
        let refresher = Arc::new(CountingRefresher {
            first_lifetime: Some(10_000_000_000_000),
            ..Default::default()
        });
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(1_000), refresher.clone())
                .with_clock(clock_at(5_000));

        let err = coordinator.authorize().await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(ref m) if m.contains("expires_in")));
        assert_eq!(coordinator.current().await, credential_expiring_at(1_000));

        let credential = coordinator.authorize().await.unwrap();
        assert_eq!(credential.access_token, "access-2");
        assert_eq!(credential.expiration, Utc.timestamp_opt(5_000 + 3600, 0).unwrap());
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_replace_credential_after_login() {
        let refresher = Arc::new(CountingRefresher {
            fail: true,
            ..Default::default()
        });
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(1_000), refresher.clone())
                .with_clock(clock_at(5_000));

        coordinator.authorize().await.unwrap_err();
        coordinator
            .replace_credential(Credential::new(
                "relogin",
                "r",
                Utc.timestamp_opt(9_000, 0).unwrap(),
                "jane",
            ))
            .await;

        assert_eq!(coordinator.authorize().await.unwrap().access_token, "relogin");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persister_receives_refreshed_credential() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = TokenRefreshCoordinator::new(
            credential_expiring_at(1_000),
            Arc::new(CountingRefresher::default()),
        )
        .with_clock(clock_at(5_000))
        .with_persister(Arc::new(ChannelPersister(tx)));

        let credential = coordinator.authorize().await.unwrap();
        let persisted = rx.recv().await.unwrap();

        assert_eq!(persisted, credential);
    }

    #[tokio::test]
    async fn test_persister_failure_does_not_fail_authorize() {
        let coordinator = TokenRefreshCoordinator::new(
            credential_expiring_at(1_000),
            Arc::new(CountingRefresher::default()),
        )
        .with_clock(clock_at(5_000))
        .with_persister(Arc::new(FailingPersister));

        let credential = coordinator.authorize().await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(credential.access_token, "access-1");
    }

    #[tokio::test]
    async fn test_refresh_emits_events() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let coordinator = TokenRefreshCoordinator::new(
            credential_expiring_at(1_000),
            Arc::new(CountingRefresher::default()),
        )
        .with_clock(clock_at(5_000))
        .with_event_bus(bus);

        coordinator.authorize().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshing {
                subject_id: "jane".to_string()
            })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshed {
                subject_id: "jane".to_string(),
                expires_at: 5_000 + 3600,
            })
        );
    }

    #[tokio::test]
    async fn test_clock_advancing_past_expiry_triggers_new_refresh() {
        let clock = clock_at(5_000);
        let refresher = Arc::new(CountingRefresher::default());
        let coordinator =
            TokenRefreshCoordinator::new(credential_expiring_at(1_000), refresher.clone())
                .with_clock(clock.clone());

        coordinator.authorize().await.unwrap();
        clock.advance(Duration::seconds(3600));
        let second = coordinator.authorize().await.unwrap();

        assert_eq!(second.access_token, "access-2");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }
}
