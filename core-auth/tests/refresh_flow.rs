//! End-to-end refresh through the OAuth client and an in-memory store.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use core_auth::{
    AuthError, Credential, InMemoryCredentialStore, OAuthClient, OAuthClientConfig,
    TokenRefreshCoordinator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct TokenEndpoint {
    status: u16,
    body: &'static str,
    calls: AtomicUsize,
    bodies: Mutex<Vec<String>>,
}

impl TokenEndpoint {
    fn new(status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpClient for TokenEndpoint {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request
            .body
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        self.bodies.lock().unwrap().push(body);
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        Ok(HttpResponse::new(self.status, self.body))
    }
}

fn coordinator(endpoint: Arc<TokenEndpoint>, store: Arc<InMemoryCredentialStore>) -> TokenRefreshCoordinator {
    let oauth = OAuthClient::new(
        OAuthClientConfig::new("cid", "secret", "https://auth.example.com/auth/token"),
        endpoint,
    );
    let expired = Credential::new(
        "stale-access",
        "stale-refresh",
        Utc::now() - Duration::minutes(1),
        "jane@example.com",
    );
    TokenRefreshCoordinator::new(expired, Arc::new(oauth)).with_persister(store)
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_authorize_hits_token_endpoint_once() {
    let endpoint = TokenEndpoint::new(
        200,
        r#"{"access_token":"fresh","refresh_token":"rotated","expires_in":3600,"userName":"jane@example.com"}"#,
    );
    let store = Arc::new(InMemoryCredentialStore::new());
    let coordinator = coordinator(endpoint.clone(), store.clone());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.authorize().await })
        })
        .collect();

    for task in tasks {
        let credential = task.await.unwrap().unwrap();
        assert_eq!(credential.access_token, "fresh");
        assert_eq!(credential.refresh_token, "rotated");
    }
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    assert!(endpoint.bodies.lock().unwrap()[0].contains("refresh_token=stale-refresh"));

    let mut persisted = None;
    for _ in 0..100 {
        persisted = store.get("jane@example.com").await;
        if persisted.is_some() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(persisted.unwrap().access_token, "fresh");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_refresh_requires_login() {
    let endpoint = TokenEndpoint::new(401, r#"{"error":"invalid_grant"}"#);
    let store = Arc::new(InMemoryCredentialStore::new());
    let coordinator = coordinator(endpoint.clone(), store.clone());

    let err = coordinator.authorize().await.unwrap_err();

    assert!(matches!(err, AuthError::RefreshFailed(_)));
    assert!(err.requires_login());
    assert_eq!(coordinator.current().await.access_token, "stale-access");
    assert_eq!(store.len().await, 0);
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
}
