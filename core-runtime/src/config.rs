//! # Roundtrip Configuration
//!
//! Settings for the authorization server, the remote project API and the
//! workflow timings.
//!
//! ## Overview
//!
//! [`RoundtripConfig`] is built through [`RoundtripConfigBuilder`] and
//! validated before use so a bad value fails at startup rather than midway
//! through a workflow.
//!
//! ## Sources
//!
//! [`RoundtripConfig::load`] reads a JSON file when one exists and otherwise
//! falls back to environment variables:
//!
//! | JSON key | Environment | Required |
//! |----------|-------------|----------|
//! | `clientId` | `CLIENT_ID` | yes |
//! | `clientSecret` | `CLIENT_SECRET` | yes |
//! | `apiBaseUrl` | `STUDIO_API_URL` | no |
//! | `tokenUrl` | `STUDIO_TOKEN_URL` | no |
//! | `snapshotPollIntervalSecs` | | no |
//! | `snapshotPollCeilingSecs` | | no |
//! | `sessionLengthMonths` | | no |
//! | `checkinComment` | | no |
//!
//! `snapshotPollCeilingSecs: 0` disables the ceiling.
//!
//! ```ignore
//! use core_runtime::config::RoundtripConfig;
//!
//! let config = RoundtripConfig::load(Some("config.json".as_ref()))?;
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://studioapi.bluebeam.com/publicapi/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://authserver.bluebeam.com/auth/token";
pub const DEFAULT_SNAPSHOT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SNAPSHOT_POLL_CEILING: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SESSION_LENGTH_MONTHS: u32 = 1;
pub const DEFAULT_CHECKIN_COMMENT: &str = "Checkin from Session Roundtripper";

const ENV_CLIENT_ID: &str = "CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
const ENV_API_BASE_URL: &str = "STUDIO_API_URL";
const ENV_TOKEN_URL: &str = "STUDIO_TOKEN_URL";

/// Validated runtime configuration.
#[derive(Clone)]
pub struct RoundtripConfig {
    /// OAuth client id registered with the authorization server
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Remote project API root, without trailing slash
    pub api_base_url: String,
    /// Authorization server token endpoint
    pub token_url: String,
    /// Delay between snapshot status checks
    pub snapshot_poll_interval: Duration,
    /// Upper bound on snapshot polling. `None` polls until a terminal state.
    pub snapshot_poll_ceiling: Option<Duration>,
    /// Lifetime of sessions created by checkout, in calendar months
    pub session_length_months: u32,
    /// Comment attached to every automated checkin
    pub checkin_comment: String,
    /// Overall timeout for a single HTTP call
    pub http_timeout: Duration,
}

impl fmt::Debug for RoundtripConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundtripConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("snapshot_poll_interval", &self.snapshot_poll_interval)
            .field("snapshot_poll_ceiling", &self.snapshot_poll_ceiling)
            .field("session_length_months", &self.session_length_months)
            .field("checkin_comment", &self.checkin_comment)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// On-disk representation, mirrors the keys hosts already ship.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base_url: Option<String>,
    token_url: Option<String>,
    snapshot_poll_interval_secs: Option<u64>,
    snapshot_poll_ceiling_secs: Option<u64>,
    session_length_months: Option<u32>,
    checkin_comment: Option<String>,
}

impl RoundtripConfig {
    pub fn builder() -> RoundtripConfigBuilder {
        RoundtripConfigBuilder::default()
    }

    /// Load from `path` if it exists, otherwise from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::from_json_file(path),
            _ => Self::from_env(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: FileConfig = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid configuration JSON: {}", e)))?;

        let mut builder = Self::builder();
        if let Some(v) = file.client_id {
            builder = builder.client_id(v);
        }
        if let Some(v) = file.client_secret {
            builder = builder.client_secret(v);
        }
        if let Some(v) = file.api_base_url {
            builder = builder.api_base_url(v);
        }
        if let Some(v) = file.token_url {
            builder = builder.token_url(v);
        }
        if let Some(secs) = file.snapshot_poll_interval_secs {
            builder = builder.snapshot_poll_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = file.snapshot_poll_ceiling_secs {
            let ceiling = (secs > 0).then(|| Duration::from_secs(secs));
            builder = builder.snapshot_poll_ceiling(ceiling);
        }
        if let Some(months) = file.session_length_months {
            builder = builder.session_length_months(months);
        }
        if let Some(v) = file.checkin_comment {
            builder = builder.checkin_comment(v);
        }
        builder.build()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the environment variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(v) = lookup(ENV_CLIENT_ID) {
            builder = builder.client_id(v);
        }
        if let Some(v) = lookup(ENV_CLIENT_SECRET) {
            builder = builder.client_secret(v);
        }
        if let Some(v) = lookup(ENV_API_BASE_URL) {
            builder = builder.api_base_url(v);
        }
        if let Some(v) = lookup(ENV_TOKEN_URL) {
            builder = builder.token_url(v);
        }
        builder.build()
    }

    /// Checks:
    /// - client credentials are present
    /// - both URLs are absolute http(s) URLs
    /// - the poll interval is non-zero and fits under the ceiling
    /// - sessions last at least one month
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("Client id cannot be empty".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::Config("Client secret cannot be empty".to_string()));
        }

        validate_http_url("API base URL", &self.api_base_url)?;
        validate_http_url("Token URL", &self.token_url)?;

        if self.snapshot_poll_interval.is_zero() {
            return Err(Error::Config(
                "Snapshot poll interval must be greater than zero".to_string(),
            ));
        }

        if let Some(ceiling) = self.snapshot_poll_ceiling {
            if ceiling < self.snapshot_poll_interval {
                return Err(Error::Config(format!(
                    "Snapshot poll ceiling ({:?}) is shorter than the poll interval ({:?})",
                    ceiling, self.snapshot_poll_interval
                )));
            }
        }

        if self.session_length_months == 0 {
            return Err(Error::Config(
                "Session length must be at least one month".to_string(),
            ));
        }

        if self.checkin_comment.trim().is_empty() {
            return Err(Error::Config("Checkin comment cannot be empty".to_string()));
        }

        Ok(())
    }
}

fn validate_http_url(label: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::Config(format!("{} '{}' is invalid: {}", label, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got '{}'",
            label, other
        ))),
    }
}

/// Builder for [`RoundtripConfig`].
#[derive(Debug, Default)]
pub struct RoundtripConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base_url: Option<String>,
    token_url: Option<String>,
    snapshot_poll_interval: Option<Duration>,
    snapshot_poll_ceiling: Option<Option<Duration>>,
    session_length_months: Option<u32>,
    checkin_comment: Option<String>,
    http_timeout: Option<Duration>,
}

impl RoundtripConfigBuilder {
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn snapshot_poll_interval(mut self, interval: Duration) -> Self {
        self.snapshot_poll_interval = Some(interval);
        self
    }

    /// Pass `None` to poll without an upper bound.
    pub fn snapshot_poll_ceiling(mut self, ceiling: Option<Duration>) -> Self {
        self.snapshot_poll_ceiling = Some(ceiling);
        self
    }

    pub fn session_length_months(mut self, months: u32) -> Self {
        self.session_length_months = Some(months);
        self
    }

    pub fn checkin_comment(mut self, comment: impl Into<String>) -> Self {
        self.checkin_comment = Some(comment.into());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if client credentials are missing or any
    /// value fails [`RoundtripConfig::validate`].
    pub fn build(self) -> Result<RoundtripConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config(format!(
                "Client id is required. Set {} or provide clientId in the config file.",
                ENV_CLIENT_ID
            ))
        })?;

        let client_secret = self.client_secret.ok_or_else(|| {
            Error::Config(format!(
                "Client secret is required. Set {} or provide clientSecret in the config file.",
                ENV_CLIENT_SECRET
            ))
        })?;

        let config = RoundtripConfig {
            client_id,
            client_secret,
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            token_url: self
                .token_url
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            snapshot_poll_interval: self
                .snapshot_poll_interval
                .unwrap_or(DEFAULT_SNAPSHOT_POLL_INTERVAL),
            snapshot_poll_ceiling: self
                .snapshot_poll_ceiling
                .unwrap_or(Some(DEFAULT_SNAPSHOT_POLL_CEILING)),
            session_length_months: self
                .session_length_months
                .unwrap_or(DEFAULT_SESSION_LENGTH_MONTHS),
            checkin_comment: self
                .checkin_comment
                .unwrap_or_else(|| DEFAULT_CHECKIN_COMMENT.to_string()),
            http_timeout: self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
        };

        config.validate()?;

        Ok(config)
    }
}
