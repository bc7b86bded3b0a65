//! Error types for remote calls.
//!
//! Every transport failure is normalized into a [`RemoteError`] carrying a
//! machine-readable `code` and a human-readable `message`. The [`ErrorKind`]
//! keeps the taxonomy the rest of the client branches on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response reached the client (connection refused, DNS, reset).
    Network,

    /// The server answered with a non-2xx status.
    Http {
        /// HTTP status code
        status: u16,
    },

    /// The call did not settle before the transport deadline.
    Timeout,

    /// The response body could not be decoded.
    Parse,

    /// The access token is missing or expired and could not be refreshed.
    Auth,

    /// The call was aborted before it settled.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Http { status } => write!(f, "http_{status}"),
            Self::Timeout => write!(f, "timeout"),
            Self::Parse => write!(f, "parse"),
            Self::Auth => write!(f, "auth"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Normalized `{code, message}` error carried by `Failure` lifecycle events.
///
/// # Examples
///
/// ```
/// use meeplo_core::error::{ErrorKind, RemoteError};
///
/// let err = RemoteError::from_response(404, br#"{"code":"G001","message":"no such group"}"#);
/// assert_eq!(err.kind, ErrorKind::Http { status: 404 });
/// assert_eq!(err.code, "G001");
/// assert_eq!(err.to_string(), "G001: no such group");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RemoteError {
    /// Error classification
    pub kind: ErrorKind,
    /// Machine-readable code (server supplied when available)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Shape of the server's error body. Both fields are optional because proxies
/// and crashed handlers do not follow the contract.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

impl RemoteError {
    /// Create an error with an explicit kind, code and message.
    #[must_use]
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// No response reached the client.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, "NETWORK", message)
    }

    /// The call exceeded its deadline.
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            "TIMEOUT",
            format!("request timed out after {} ms", after.as_millis()),
        )
    }

    /// The body could not be decoded.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, "PARSE", message)
    }

    /// Missing or unrecoverable credentials.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, "AUTH", message)
    }

    /// The call was aborted.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "CANCELLED", "request cancelled")
    }

    /// Normalize a non-2xx response.
    ///
    /// `401` maps to [`ErrorKind::Auth`]; every other status to
    /// [`ErrorKind::Http`]. The server's `{code, message}` body is used when it
    /// parses, otherwise the code is `HTTP_<status>` and the message is the raw
    /// body text.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let kind = if status == 401 {
            ErrorKind::Auth
        } else {
            ErrorKind::Http { status }
        };

        let parsed = serde_json::from_slice::<ErrorBody>(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|b| b.code.as_ref())
            .and_then(|code| match code {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| format!("HTTP_{status}"));
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    format!("server responded with status {status}")
                } else {
                    text
                }
            });

        Self { kind, code, message }
    }

    /// Whether the failure should trigger a token refresh.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self.kind, ErrorKind::Auth)
    }
}
