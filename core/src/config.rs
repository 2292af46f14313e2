//! Connection configuration for `RecordClient`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.parse.com";
pub const DEFAULT_API_VERSION: &str = "1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest response body read into memory, 64 MiB.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Backend credentials, endpoint and API version.
///
/// Can be built in code, read from the environment with
/// [`ClientConfig::from_env`], or deserialized from a caller's own config
/// file; omitted optional fields take the same defaults in every case.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub application_id: String,
    pub rest_api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-call timeout. A zero duration is stored as `None`, which waits
    /// indefinitely. Deserialized from whole seconds in `timeout_secs`.
    #[serde(
        rename = "timeout_secs",
        default = "default_timeout",
        deserialize_with = "timeout_from_secs"
    )]
    timeout: Option<Duration>,
    /// Responses with a larger body fail with `TransportError`.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> Option<Duration> {
    Some(DEFAULT_TIMEOUT)
}

fn default_max_response_bytes() -> u64 {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// `None` and zero both mean "no timeout".
fn normalize_timeout(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

fn timeout_from_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<u64>::deserialize(deserializer)?;
    Ok(normalize_timeout(secs.map(Duration::from_secs)))
}

impl ClientConfig {
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            rest_api_key: rest_api_key.into(),
            api_version: default_api_version(),
            base_url: default_base_url(),
            timeout: default_timeout(),
            max_response_bytes: default_max_response_bytes(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Point the client at another host, e.g. a self-hosted server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the whole-call timeout. `None` or a zero duration disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = normalize_timeout(timeout);
        self
    }

    pub fn with_max_response_bytes(mut self, bytes: u64) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Read configuration from `PARSE_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `PARSE_APPLICATION_ID` and `PARSE_REST_API_KEY` are required.
    /// `PARSE_API_VERSION`, `PARSE_SERVER_URL`, `PARSE_TIMEOUT_SECS` and
    /// `PARSE_MAX_RESPONSE_BYTES` are optional; a timeout of `0` disables
    /// the timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::ConfigError(format!("{key} is not set")))
        };
        let number = |key: &str| -> Result<Option<u64>, ApiError> {
            lookup(key)
                .map(|raw| {
                    raw.parse().map_err(|_| {
                        ApiError::ConfigError(format!("{key} is not a number: {raw}"))
                    })
                })
                .transpose()
        };

        let mut config = Self::new(
            required("PARSE_APPLICATION_ID")?,
            required("PARSE_REST_API_KEY")?,
        );
        if let Some(version) = lookup("PARSE_API_VERSION") {
            config.api_version = version;
        }
        if let Some(url) = lookup("PARSE_SERVER_URL") {
            config.base_url = url;
        }
        if let Some(secs) = number("PARSE_TIMEOUT_SECS")? {
            config = config.with_timeout(Some(Duration::from_secs(secs)));
        }
        if let Some(bytes) = number("PARSE_MAX_RESPONSE_BYTES")? {
            config.max_response_bytes = bytes;
        }
        Ok(config)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("application_id", &self.application_id)
            .field("rest_api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}
