//! Resource key type.
//!
//! A resource key names one slot of remote-derived state. The same key is used
//! as the store's mapping key, as the cancellation id of the calls feeding the
//! slot, and as the `resource` field of every log line those calls emit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `ResourceKey` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid resource key: {0}")]
pub struct ParseResourceKeyError(String);

/// Unique name of a resource, e.g. `"user"` or `"schedule.list"`.
///
/// # Validation
///
/// - `FromStr::from_str()`: rejects empty keys and keys containing whitespace
/// - `From::from()` and `new()`: no validation (for application-controlled names)
///
/// # Examples
///
/// ```
/// use meeplo_core::key::ResourceKey;
///
/// let key = ResourceKey::new("schedule");
/// assert_eq!(key.as_str(), "schedule");
///
/// let parsed: ResourceKey = "group.list".parse().unwrap();
/// assert_eq!(parsed, ResourceKey::new("group.list"));
/// assert!("".parse::<ResourceKey>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Create a new `ResourceKey` from a string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the key into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceKey {
    type Err = ParseResourceKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseResourceKeyError("resource key cannot be empty".to_string()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ParseResourceKeyError(format!(
                "resource key cannot contain whitespace: {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ResourceKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
