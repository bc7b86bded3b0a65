//! Transport boundary.
//!
//! A [`Request`] describes one REST call relative to the server's base URL.
//! A [`Transport`] executes it and either returns the 2xx [`Response`] or a
//! normalized [`RemoteError`]; it never panics and never returns a non-2xx
//! response as `Ok`.

use crate::error::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Description of one REST call.
///
/// # Examples
///
/// ```
/// use meeplo_core::transport::{Method, Request};
/// use serde_json::json;
///
/// let request = Request::post("/member/location")
///     .with_body(json!({ "name": "home" }));
/// assert_eq!(request.method, Method::Post);
/// assert!(request.auth);
///
/// let search = Request::get("/location/station").with_query("keyword", "gangnam");
/// assert_eq!(search.to_string(), "GET /location/station?keyword=gangnam");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    /// Query parameters in order
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Whether a bearer token must be attached
    pub auth: bool,
}

impl Request {
    /// An authenticated request without body or query.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: true,
        }
    }

    /// `GET path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST path`
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// `PUT path`
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// `DELETE path`
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Mark the request as not requiring a bearer token.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.auth = false;
        self
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (name, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Response {
    /// A response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A `200` response carrying `value` as JSON.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }
}

/// Executes request descriptors against the remote API.
///
/// # Contract
///
/// - `Ok` only for 2xx responses
/// - Non-2xx responses become [`RemoteError::from_response`]
/// - Deadlines are enforced here and surface as [`RemoteError::timeout`]
/// - Authentication (token attach, one refresh-and-retry) is handled here
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be held as `Arc<dyn Transport>` inside effects.
pub trait Transport: Send + Sync {
    /// Execute one request.
    fn call(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Response, RemoteError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_query_parameters() {
        let request = Request::get("/location/station")
            .with_query("keyword", "seoul")
            .with_query("page", "2");
        assert_eq!(request.to_string(), "GET /location/station?keyword=seoul&page=2");
    }

    #[test]
    fn public_requests_skip_auth() {
        let request = Request::post("/member/refresh").public();
        assert!(!request.auth);
        assert_eq!(request.method.as_str(), "POST");
    }
}
