use std::path::PathBuf;
use std::time::Duration;

use rental_core::{RentalClient, ACCESS_TOKEN_KEY, API_PREFIX};

use crate::error::{ClientError, Result};

pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

pub const ENV_ORIGIN: &str = "RENTAL_API_ORIGIN";
pub const ENV_PREFIX: &str = "RENTAL_API_PREFIX";
pub const ENV_TOKEN_KEY: &str = "RENTAL_TOKEN_KEY";
pub const ENV_TOKEN_FILE: &str = "RENTAL_TOKEN_FILE";
pub const ENV_REFRESH_ON_401: &str = "RENTAL_REFRESH_ON_401";
pub const ENV_TIMEOUT_SECS: &str = "RENTAL_API_TIMEOUT_SECS";

/// Configuration for [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, host and port of the backend, e.g. `http://localhost:8000`.
    pub origin: String,

    /// Path prefix every resource path is appended to.
    /// Default: `/api/v1`
    pub api_prefix: String,

    /// Storage key the session is persisted under.
    /// Default: `accessToken`
    pub token_key: String,

    /// File backing the token storage. In-memory storage when unset.
    pub token_file: Option<PathBuf>,

    /// Refresh the access token and retry once when a request comes back 401.
    /// Default: true
    pub refresh_on_unauthorized: bool,

    /// Whole-request timeout handed to the transport. None waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            api_prefix: API_PREFIX.to_string(),
            token_key: ACCESS_TOKEN_KEY.to_string(),
            token_file: None,
            refresh_on_unauthorized: true,
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// Read the `RENTAL_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(origin) = var(ENV_ORIGIN) {
            config.origin = origin;
        }
        if let Some(prefix) = var(ENV_PREFIX) {
            config.api_prefix = prefix;
        }
        if let Some(key) = var(ENV_TOKEN_KEY) {
            config.token_key = key;
        }
        config.token_file = var(ENV_TOKEN_FILE).map(PathBuf::from);
        if let Some(flag) = var(ENV_REFRESH_ON_401) {
            config.refresh_on_unauthorized = parse_flag(ENV_REFRESH_ON_401, &flag)?;
        }
        if let Some(secs) = var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                ClientError::Configuration(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}"))
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let origin = reqwest::Url::parse(&self.origin)
            .map_err(|e| ClientError::Configuration(format!("invalid origin {:?}: {e}", self.origin)))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "origin must be http or https, got {:?}",
                self.origin
            )));
        }
        if self.token_key.trim().is_empty() {
            return Err(ClientError::Configuration("token key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Request builder rooted at `origin + api_prefix`.
    pub fn requests(&self) -> RentalClient {
        RentalClient::with_prefix(&self.origin, &self.api_prefix)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ClientError::Configuration(format!(
            "{name} must be a boolean, got {value:?}"
        ))),
    }
}
