//! In-memory [`Transport`] with scripted responses.
//!
//! Responses are queued per `(method, path)` and consumed in order. A gated
//! response holds its call open until the test releases it, which is how
//! out-of-order completions are produced deterministically.

use meeplo_core::error::RemoteError;
use meeplo_core::transport::{Method, Request, Response, Transport};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type Outcome = Result<Response, RemoteError>;

enum Scripted {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
    Panic(String),
}

#[derive(Default)]
struct Script {
    routes: HashMap<(Method, String), VecDeque<Scripted>>,
    calls: Vec<Request>,
}

/// Scripted transport for tests.
///
/// Calls with no scripted response left fail with a `NETWORK` error naming
/// the request.
///
/// # Example
///
/// ```
/// use meeplo_core::transport::{Method, Request, Transport};
/// use meeplo_testing::MockTransport;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let transport = MockTransport::new();
/// transport.respond_json(Method::Get, "/member", json!({ "id": 7 }));
///
/// let response = transport.call(Request::get("/member")).await.unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(transport.call_count(), 1);
/// # });
/// ```
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
}

impl MockTransport {
    /// Create a transport with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    /// Queue an outcome for the next call to `method path`.
    pub fn respond(&self, method: Method, path: &str, outcome: Result<Response, RemoteError>) {
        self.push(method, path, Scripted::Ready(outcome));
    }

    /// Queue a `200` JSON response.
    pub fn respond_json(&self, method: Method, path: &str, body: serde_json::Value) {
        self.respond(method, path, Ok(Response::json(&body)));
    }

    /// Queue a `200` response with a raw body.
    pub fn respond_raw(&self, method: Method, path: &str, body: &str) {
        self.respond(method, path, Ok(Response::new(200, body)));
    }

    /// Queue a failure.
    pub fn fail(&self, method: Method, path: &str, error: RemoteError) {
        self.respond(method, path, Err(error));
    }

    /// Queue a call that panics when it is awaited.
    pub fn panic_on(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Scripted::Panic(message.to_string()));
    }

    /// Queue a call that stays open until the returned [`Gate`] is released.
    ///
    /// Dropping the gate without releasing it fails the call with a
    /// `NETWORK` error.
    #[must_use]
    pub fn gate(&self, method: Method, path: &str) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.push(method, path, Scripted::Gated(receiver));
        Gate { sender }
    }

    /// Requests received so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<Request> {
        self.lock().calls.clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }
}

impl Transport for MockTransport {
    fn call(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Response, RemoteError>> + Send + '_>> {
        let scripted = {
            let mut script = self.lock();
            let next = script
                .routes
                .get_mut(&(request.method, request.path.clone()))
                .and_then(VecDeque::pop_front);
            script.calls.push(request.clone());
            next
        };

        Box::pin(async move {
            match scripted {
                Some(Scripted::Ready(outcome)) => outcome,
                Some(Scripted::Gated(receiver)) => receiver
                    .await
                    .unwrap_or_else(|_| Err(RemoteError::network("gate dropped"))),
                #[allow(clippy::panic)] // Scripted panic
                Some(Scripted::Panic(message)) => panic!("{message}"),
                None => Err(RemoteError::network(format!("no response scripted for {request}"))),
            }
        })
    }
}

/// Holds a gated call open until released.
#[derive(Debug)]
pub struct Gate {
    sender: oneshot::Sender<Outcome>,
}

impl Gate {
    /// Complete the call with `outcome`.
    pub fn release(self, outcome: Result<Response, RemoteError>) {
        // The call may already be gone (cancelled); nothing to deliver then.
        let _ = self.sender.send(outcome);
    }

    /// Complete the call with a `200` JSON response.
    pub fn release_json(self, body: serde_json::Value) {
        self.release(Ok(Response::json(&body)));
    }

    /// Complete the call with a failure.
    pub fn release_err(self, error: RemoteError) {
        self.release(Err(error));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use meeplo_core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn responses_are_consumed_in_order() {
        tokio_test::block_on(async {
            let transport = MockTransport::new();
            transport.respond_raw(Method::Get, "/group", "[1]");
            transport.respond_raw(Method::Get, "/group", "[2]");

            let first = transport.call(Request::get("/group")).await.unwrap();
            let second = transport.call(Request::get("/group")).await.unwrap();
            assert_eq!(first.body, b"[1]");
            assert_eq!(second.body, b"[2]");

            let third = transport.call(Request::get("/group")).await.unwrap_err();
            assert_eq!(third.kind, ErrorKind::Network);
            assert_eq!(transport.call_count(), 3);
        });
    }

    #[test]
    fn routes_are_keyed_by_method() {
        tokio_test::block_on(async {
            let transport = MockTransport::new();
            transport.respond_json(Method::Put, "/member", json!({ "ok": true }));

            assert!(transport.call(Request::get("/member")).await.is_err());
            assert!(transport.call(Request::put("/member")).await.is_ok());
        });
    }

    #[test]
    fn gated_call_waits_for_release() {
        tokio_test::block_on(async {
            let transport = MockTransport::new();
            let gate = transport.gate(Method::Get, "/schedule/1");

            let pending = transport.call(Request::get("/schedule/1"));
            gate.release_json(json!({ "id": 1 }));

            let response = pending.await.unwrap();
            assert_eq!(response.body, br#"{"id":1}"#);
        });
    }

    #[test]
    fn dropped_gate_fails_the_call() {
        tokio_test::block_on(async {
            let transport = MockTransport::new();
            let gate = transport.gate(Method::Get, "/group/3");
            let pending = transport.call(Request::get("/group/3"));
            drop(gate);

            let error = pending.await.unwrap_err();
            assert_eq!(error.kind, ErrorKind::Network);
        });
    }

    #[test]
    fn records_requests() {
        tokio_test::block_on(async {
            let transport = MockTransport::new();
            let _ = transport
                .call(Request::get("/location/station").with_query("keyword", "seoul"))
                .await;

            let calls = transport.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].to_string(), "GET /location/station?keyword=seoul");
        });
    }
}
