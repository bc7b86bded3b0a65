//! reqwest-backed [`Transport`].
//!
//! Attaches the stored bearer token to authenticated requests. When the
//! server answers `401`, or no access token is stored, the transport refreshes
//! the token pair once and retries the request once. Every failure is
//! normalized into a [`RemoteError`].

use crate::config::ClientConfig;
use crate::credentials::{ACCESS_TOKEN, CredentialError, CredentialStore, REFRESH_TOKEN};
use meeplo_core::error::RemoteError;
use meeplo_core::transport::{Method, Request, Response, Transport};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;

/// Header carrying the refresh token on the refresh call.
pub const REFRESH_HEADER: &str = "Refresh";

/// Body of a successful token refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

/// HTTP transport for the Meeplo REST API.
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    refresh_lock: Mutex<()>,
}

impl HttpTransport {
    /// Create a transport for `config` using `credentials` for tokens.
    #[must_use]
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: Client::new(),
            config,
            credentials,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The configuration this transport was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn execute(&self, request: Request) -> Result<Response, RemoteError> {
        if !request.auth {
            return self.send(&request, None).await;
        }

        let (token, refreshed) = match self.access_token().await? {
            Some(token) => (token, false),
            None => {
                tracing::debug!("No access token stored, refreshing before the call");
                (self.refresh(None).await?, true)
            },
        };

        // One refresh per call, whether it happened up front or after a 401.
        match self.send(&request, Some(&token)).await {
            Err(error) if error.is_auth() && !refreshed => {
                tracing::debug!(code = %error.code, "Access token rejected, refreshing once");
                let token = self.refresh(Some(&token)).await?;
                self.send(&request, Some(&token)).await
            },
            outcome => outcome,
        }
    }

    async fn access_token(&self) -> Result<Option<String>, RemoteError> {
        self.credentials.get(ACCESS_TOKEN).await.map_err(credential_failure)
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Concurrent callers share one exchange: a caller that finds the stored
    /// access token already replaced uses the new one without calling again.
    async fn refresh(&self, rejected: Option<&str>) -> Result<String, RemoteError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.access_token().await? {
            if rejected != Some(current.as_str()) {
                return Ok(current);
            }
        }

        let refresh_token = self
            .credentials
            .get(REFRESH_TOKEN)
            .await
            .map_err(credential_failure)?
            .ok_or_else(|| RemoteError::auth("not signed in: no refresh token stored"))?;

        metrics::counter!("transport.token_refreshes").increment(1);

        let mut builder = self
            .client
            .post(self.config.url(&self.config.refresh_path))
            .timeout(self.config.timeout)
            .header(REFRESH_HEADER, refresh_token);
        if let Some(rejected) = rejected {
            builder = builder.bearer_auth(rejected);
        }

        let response = builder.send().await.map_err(|e| self.normalize(&e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.normalize(&e))?;

        if !status.is_success() {
            let error = RemoteError::from_response(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), code = %error.code, "Token refresh failed");
            return Err(RemoteError::auth(format!("token refresh failed: {}", error.message)));
        }

        let pair: TokenPair = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::parse(format!("token refresh response: {e}")))?;

        self.credentials
            .set(ACCESS_TOKEN, &pair.access_token)
            .await
            .map_err(credential_failure)?;
        self.credentials
            .set(REFRESH_TOKEN, &pair.refresh_token)
            .await
            .map_err(credential_failure)?;

        tracing::info!("Token pair refreshed");
        Ok(pair.access_token)
    }

    async fn send(&self, request: &Request, token: Option<&str>) -> Result<Response, RemoteError> {
        let mut builder = self
            .client
            .request(method(request.method), self.config.url(&request.path))
            .timeout(self.config.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.normalize(&e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.normalize(&e))?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        if status.is_success() {
            Ok(Response::new(status.as_u16(), body.to_vec()))
        } else {
            Err(RemoteError::from_response(status.as_u16(), &body))
        }
    }

    fn normalize(&self, error: &reqwest::Error) -> RemoteError {
        if error.is_timeout() {
            RemoteError::timeout(self.config.timeout)
        } else if error.is_decode() {
            RemoteError::parse(error.to_string())
        } else {
            RemoteError::network(error.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn call(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Response, RemoteError>> + Send + '_>> {
        let span = tracing::debug_span!(
            "http_call",
            method = %request.method,
            path = %request.path,
        );
        Box::pin(self.execute(request).instrument(span))
    }
}

const fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn credential_failure(error: CredentialError) -> RemoteError {
    RemoteError::auth(format!("credential store unavailable: {error}"))
}
