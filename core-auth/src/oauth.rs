//! Authorization Server Client
//!
//! Performs the OAuth 2.0 `refresh_token` grant (RFC 6749 §6) against the
//! token endpoint. Client credentials travel in the form body.
//!
//! Exactly one HTTP attempt is made per call. A failed exchange is reported
//! as [`AuthError::RefreshFailed`] and left to the caller; replaying a refresh
//! token after an ambiguous failure can get it revoked.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthClient, OAuthClientConfig, TokenRefresher};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthClientConfig::new(
//!     "client-id",
//!     "client-secret",
//!     "https://authserver.bluebeam.com/auth/token",
//! );
//! let client = OAuthClient::new(config, http_client);
//! let grant = client.refresh("stored-refresh-token").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::TokenGrant;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Exchanges a refresh token for a new grant.
///
/// This is the seam [`crate::TokenRefreshCoordinator`] calls through, so
/// tests can count or fail refresh exchanges without an HTTP stack.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Client registration at the authorization server.
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl OAuthClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
        }
    }
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .finish()
    }
}

pub struct OAuthClient {
    config: OAuthClientConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthClient {
    pub fn new(config: OAuthClientConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    fn build_refresh_request(&self, refresh_token: &str) -> Result<HttpRequest> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let encoded = serde_urlencoded::to_string(&params[..])
            .map_err(|e| AuthError::Config(format!("Failed to encode token request: {}", e)))?;

        Ok(
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Accept", "application/json")
                .body(Bytes::from(encoded)),
        )
    }
}

#[async_trait]
impl TokenRefresher for OAuthClient {
    #[instrument(skip(self, refresh_token), fields(token_url = %self.config.token_url))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let request = self.build_refresh_request(refresh_token)?;

        debug!("Refreshing access token");

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Token endpoint unreachable");
            AuthError::RefreshFailed(e.to_string())
        })?;

        if !response.is_success() {
            let body = response.text_lossy();
            warn!(status = response.status, "Token endpoint rejected refresh");
            return Err(AuthError::RefreshFailed(format!(
                "Token endpoint returned {}: {}",
                response.status, body
            )));
        }

        let grant: TokenGrant = response.json().map_err(|e| {
            AuthError::RefreshFailed(format!("Unreadable token response: {}", e))
        })?;

        info!(expires_in = grant.expires_in, "Access token refreshed");
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn client(http: MockHttpClient) -> OAuthClient {
        OAuthClient::new(
            OAuthClientConfig::new("cid", "s3cr3t", "https://auth.example.com/auth/token"),
            Arc::new(http),
        )
    }

    #[tokio::test]
    async fn test_refresh_sends_form_grant() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req: &HttpRequest| {
                let body = req
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                req.method == HttpMethod::Post
                    && req.url == "https://auth.example.com/auth/token"
                    && req.header_value("content-type")
                        == Some("application/x-www-form-urlencoded")
                    && body
                        == "grant_type=refresh_token&refresh_token=r%2Ftok&client_id=cid&client_secret=s3cr3t"
            })
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"access_token":"new","refresh_token":"r2","expires_in":3599,"userName":"jane"}"#,
                ))
            });

        let grant = client(http).refresh("r/tok").await.unwrap();
        assert_eq!(grant.access_token, "new");
        assert_eq!(grant.refresh_token.as_deref(), Some("r2"));
        assert_eq!(grant.expires_in, 3599);
        assert_eq!(grant.user_name.as_deref(), Some("jane"));
    }

    #[tokio::test]
    async fn test_rejection_is_refresh_failed_without_retry() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(400, r#"{"error":"invalid_grant"}"#)));

        let err = client(http).refresh("revoked").await.unwrap_err();
        match err {
            AuthError::RefreshFailed(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(503, "unavailable")));

        let err = client(http).refresh("r").await.unwrap_err();
        assert!(err.requires_login());
    }

    #[tokio::test]
    async fn test_transport_failure_is_refresh_failed() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Transport("connection reset".to_string())));

        let err = client(http).refresh("r").await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(m) if m.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_refresh_failed() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "<html>")));

        let err = client(http).refresh("r").await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(_)));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = OAuthClientConfig::new("cid", "s3cr3t", "https://auth.example.com");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("cid"));
    }
}
