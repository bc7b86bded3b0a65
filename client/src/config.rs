//! Client configuration.
//!
//! Values are supplied by the application or read from the environment with
//! [`ClientConfig::from_env`]:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `MEEPLO_SERVER_BASE_URL` | API base URL | required |
//! | `MEEPLO_TIMEOUT_MS` | per-call deadline in milliseconds | `10000` |
//! | `MEEPLO_REFRESH_PATH` | token refresh endpoint | `/member/refresh` |
//! | `MEEPLO_CREDENTIALS_PATH` | JSON credential file | in-memory store |

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "MEEPLO_SERVER_BASE_URL";
/// Environment variable holding the call deadline in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "MEEPLO_TIMEOUT_MS";
/// Environment variable holding the refresh endpoint path.
pub const ENV_REFRESH_PATH: &str = "MEEPLO_REFRESH_PATH";
/// Environment variable holding the credential file path.
pub const ENV_CREDENTIALS_PATH: &str = "MEEPLO_CREDENTIALS_PATH";

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default token refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/member/refresh";

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but unusable
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable or field name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Settings for the HTTP transport and credential persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every request path is appended to, without trailing slash.
    pub base_url: String,

    /// Deadline for one HTTP exchange.
    ///
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Path of the token refresh endpoint.
    ///
    /// Default: `/member/refresh`
    pub refresh_path: String,

    /// Where tokens are persisted. `None` keeps them in memory.
    pub credentials_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Configuration for `base_url` with default settings.
    ///
    /// A trailing `/` is dropped so request paths can always start with one.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            credentials_path: None,
        }
    }

    /// Set the per-call deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the refresh endpoint path.
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Persist tokens in a JSON file at `path`.
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Read the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `MEEPLO_SERVER_BASE_URL` is not
    /// set, and [`ConfigError::Invalid`] when a value cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_MS,
                reason: format!("{raw:?} is not a number of milliseconds"),
            })?;
            config = config.with_timeout(Duration::from_millis(millis));
        }

        if let Some(path) = lookup(ENV_REFRESH_PATH) {
            config = config.with_refresh_path(path);
        }

        if let Some(path) = lookup(ENV_CREDENTIALS_PATH) {
            config = config.with_credentials_path(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the settings for values the transport cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: ENV_BASE_URL,
                reason: format!("{:?} is not an http(s) URL", self.base_url),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: ENV_TIMEOUT_MS,
                reason: "timeout must be positive".to_string(),
            });
        }
        if !self.refresh_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: ENV_REFRESH_PATH,
                reason: format!("{:?} must start with '/'", self.refresh_path),
            });
        }
        Ok(())
    }

    /// Absolute URL of `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "https://api.meeplo.app/")])).unwrap();
        assert_eq!(config.base_url, "https://api.meeplo.app");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(config.credentials_path, None);
        assert_eq!(config.url("/member"), "https://api.meeplo.app/member");
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8080"),
            (ENV_TIMEOUT_MS, "2500"),
            (ENV_REFRESH_PATH, "/auth/refresh"),
            (ENV_CREDENTIALS_PATH, "/tmp/meeplo.json"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.credentials_path, Some(PathBuf::from("/tmp/meeplo.json")));
    }

    #[test]
    fn base_url_is_required() {
        let error = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(error, ConfigError::Missing(ENV_BASE_URL));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_timeout = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost"),
            (ENV_TIMEOUT_MS, "soon"),
        ]));
        assert!(matches!(bad_timeout, Err(ConfigError::Invalid { name: ENV_TIMEOUT_MS, .. })));

        let zero = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost"),
            (ENV_TIMEOUT_MS, "0"),
        ]));
        assert!(zero.is_err());

        let scheme = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "localhost:8080")]));
        assert!(matches!(scheme, Err(ConfigError::Invalid { name: ENV_BASE_URL, .. })));
    }
}
