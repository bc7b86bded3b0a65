//! Async actions: one remote call producing exactly one terminal event.

use crate::model::Payload;
use futures::FutureExt;
use meeplo_core::environment::Clock;
use meeplo_core::error::{ErrorKind, RemoteError};
use meeplo_core::key::ResourceKey;
use meeplo_core::lifecycle::{Lifecycle, Seq};
use meeplo_core::transport::{Request, Transport};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::Instrument;

/// Turns a 2xx body into the resource payload.
pub type Decoder = fn(&[u8]) -> Result<Payload, serde_json::Error>;

/// Decode a JSON body into `P` and wrap it as a [`Payload`].
///
/// # Errors
///
/// Returns the `serde_json` error when the body does not match `P`.
pub fn json<P>(body: &[u8]) -> Result<Payload, serde_json::Error>
where
    P: DeserializeOwned + Into<Payload>,
{
    serde_json::from_slice::<P>(body).map(Into::into)
}

/// Decode any body as an acknowledgement.
///
/// # Errors
///
/// Never fails; the signature matches [`Decoder`].
pub const fn ack(_body: &[u8]) -> Result<Payload, serde_json::Error> {
    Ok(Payload::Ack)
}

/// A request descriptor bound to the resource it feeds.
///
/// Business-rule validation happens before an action is built. Running it
/// makes exactly one transport call and never retries.
#[derive(Clone)]
pub struct AsyncAction {
    /// Resource the outcome is stored under
    pub key: ResourceKey,
    /// Operation name, for logs
    pub name: &'static str,
    /// The call to make
    pub request: Request,
    decode: Decoder,
}

impl fmt::Debug for AsyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAction")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("request", &self.request.to_string())
            .finish_non_exhaustive()
    }
}

impl AsyncAction {
    /// Bind `request` to `key`, decoding 2xx bodies with `decode`.
    #[must_use]
    pub fn new(key: impl Into<ResourceKey>, name: &'static str, request: Request, decode: Decoder) -> Self {
        Self {
            key: key.into(),
            name,
            request,
            decode,
        }
    }

    /// Run the call and produce its terminal event.
    ///
    /// Every failure, including a panic in the transport or the decoder and
    /// an undecodable body, becomes `Lifecycle::Failure`.
    pub async fn run(self, seq: Seq, transport: &dyn Transport, clock: &dyn Clock) -> Lifecycle<Payload> {
        let span = tracing::info_span!(
            "remote_call",
            resource = %self.key,
            seq = seq.get(),
            action = self.name,
        );
        self.settle(seq, transport, clock).instrument(span).await
    }

    async fn settle(self, seq: Seq, transport: &dyn Transport, clock: &dyn Clock) -> Lifecycle<Payload> {
        let resource = self.key.to_string();
        metrics::counter!("remote.calls", "resource" => resource.clone()).increment(1);
        tracing::debug!(request = %self.request, "Calling remote");

        let Self { name, request, decode, .. } = self;
        let call = async move {
            let response = transport.call(request).await?;
            decode(&response.body).map_err(|e| RemoteError::parse(format!("{name} response: {e}")))
        };

        let outcome = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(RemoteError::new(
                ErrorKind::Network,
                "PANIC",
                format!("{name} panicked: {}", panic_message(panic.as_ref())),
            )),
        };

        match outcome {
            Ok(payload) => {
                tracing::debug!("Remote call succeeded");
                Lifecycle::Success {
                    seq,
                    payload,
                    at: clock.now(),
                }
            },
            Err(error) => {
                tracing::warn!(kind = %error.kind, code = %error.code, message = %error.message, "Remote call failed");
                metrics::counter!(
                    "remote.failures",
                    "resource" => resource,
                    "kind" => error.kind.to_string()
                )
                .increment(1);
                Lifecycle::Failure {
                    seq,
                    error,
                    at: clock.now(),
                }
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
