//! In-process test client.
//!
//! [`TestClient`] drives any [`AsgiApp`] without a server: the `receive`
//! side is a scripted event queue, the `send` side records every event, and
//! the call runs to completion on `futures_executor::block_on` with a
//! testing [`Cx`].
//!
//! # Example
//!
//! ```ignore
//! let client = TestClient::new(app);
//! let response = client.get("/items/42").send();
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.text(), "42");
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use asupersync::Cx;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use starlite_types::Method;

use crate::asgi::{
    AsgiApp, BoxFuture, Message, ReceiveEvent, Receiver, Scope, SendEvent, Sender,
};
use crate::context::RequestContext;
use crate::error::Error;
use crate::headers::Headers;

/// A [`Receiver`] replaying a fixed list of events.
///
/// Once the queue is exhausted it yields the configured trailing event
/// forever, or never resolves when there is none (a client that stays
/// connected and silent).
#[derive(Debug)]
pub struct MemoryReceiver {
    events: Mutex<VecDeque<ReceiveEvent>>,
    when_empty: Option<ReceiveEvent>,
}

impl MemoryReceiver {
    /// Replay `events`, then stay silent.
    #[must_use]
    pub fn new(events: Vec<ReceiveEvent>) -> Self {
        Self {
            events: Mutex::new(events.into()),
            when_empty: None,
        }
    }

    /// Yield `event` once the queue is exhausted.
    #[must_use]
    pub fn when_empty(mut self, event: ReceiveEvent) -> Self {
        self.when_empty = Some(event);
        self
    }
}

impl Receiver for MemoryReceiver {
    fn receive(&self) -> BoxFuture<'_, Result<ReceiveEvent, Error>> {
        let next = self.events.lock().pop_front();
        Box::pin(async move {
            match next.or_else(|| self.when_empty.clone()) {
                Some(event) => Ok(event),
                None => futures::future::pending().await,
            }
        })
    }
}

/// A [`Sender`] recording every event.
#[derive(Debug, Default)]
pub struct RecordingSender {
    events: Mutex<Vec<SendEvent>>,
}

impl RecordingSender {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events sent so far.
    #[must_use]
    pub fn events(&self) -> Vec<SendEvent> {
        self.events.lock().clone()
    }
}

impl Sender for RecordingSender {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, Result<(), Error>> {
        self.events.lock().push(event);
        Box::pin(async { Ok(()) })
    }
}

/// Test client for ASGI applications.
pub struct TestClient<A> {
    app: Arc<A>,
    request_id_counter: AtomicU64,
}

impl<A: AsgiApp + 'static> TestClient<A> {
    /// Creates a new test client wrapping the given application.
    pub fn new(app: A) -> Self {
        Self {
            app: Arc::new(app),
            request_id_counter: AtomicU64::new(1),
        }
    }

    /// The wrapped application.
    #[must_use]
    pub fn app(&self) -> &A {
        &self.app
    }

    fn context(&self) -> RequestContext {
        let id = self.request_id_counter.fetch_add(1, Ordering::Relaxed);
        RequestContext::new(Cx::for_testing(), id)
    }

    fn run(&self, scope: Scope, receive: MemoryReceiver) -> (Vec<SendEvent>, Option<Error>) {
        let ctx = self.context();
        let sender = Arc::new(RecordingSender::new());
        let result = futures_executor::block_on(self.app.call(
            &ctx,
            scope,
            Arc::new(receive),
            sender.clone(),
        ));
        (sender.events(), result.err())
    }

    /// Start building a request.
    pub fn request(&self, method: Method, target: &str) -> RequestBuilder<'_, A> {
        RequestBuilder {
            client: self,
            method,
            target: target.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
            disconnect_after_body: false,
        }
    }

    /// GET request.
    pub fn get(&self, target: &str) -> RequestBuilder<'_, A> {
        self.request(Method::Get, target)
    }

    /// HEAD request.
    pub fn head(&self, target: &str) -> RequestBuilder<'_, A> {
        self.request(Method::Head, target)
    }

    /// POST request.
    pub fn post(&self, target: &str) -> RequestBuilder<'_, A> {
        self.request(Method::Post, target)
    }

    /// PUT request.
    pub fn put(&self, target: &str) -> RequestBuilder<'_, A> {
        self.request(Method::Put, target)
    }

    /// PATCH request.
    pub fn patch(&self, target: &str) -> RequestBuilder<'_, A> {
        self.request(Method::Patch, target)
    }

    /// DELETE request.
    pub fn delete(&self, target: &str) -> RequestBuilder<'_, A> {
        self.request(Method::Delete, target)
    }

    /// Start building a WebSocket session.
    pub fn websocket(&self, target: &str) -> WebSocketBuilder<'_, A> {
        WebSocketBuilder {
            client: self,
            target: target.to_string(),
            headers: Headers::new(),
            messages: Vec::new(),
        }
    }

    /// Run the lifespan protocol (startup then shutdown) and return the
    /// events the application sent.
    pub fn lifespan(&self) -> Vec<SendEvent> {
        let receive = MemoryReceiver::new(vec![
            ReceiveEvent::LifespanStartup,
            ReceiveEvent::LifespanShutdown,
        ]);
        let (events, error) = self.run(Scope::lifespan(), receive);
        if let Some(err) = error {
            tracing::debug!(error = %err, "lifespan ended with an error");
        }
        events
    }
}

/// Builder for a test HTTP request.
pub struct RequestBuilder<'a, A> {
    client: &'a TestClient<A>,
    method: Method,
    target: String,
    headers: Headers,
    body: Vec<u8>,
    disconnect_after_body: bool,
}

impl<A: AsgiApp + 'static> RequestBuilder<'_, A> {
    /// Add a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type.
    #[must_use]
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_json::to_vec(value).unwrap_or_default();
        self.headers.insert("content-type", "application/json");
        self
    }

    /// Deliver `http.disconnect` once the body has been consumed.
    #[must_use]
    pub fn disconnect_after_body(mut self) -> Self {
        self.disconnect_after_body = true;
        self
    }

    /// Send the request and collect the response.
    pub fn send(self) -> TestResponse {
        let mut scope = Scope::http(self.method, &self.target);
        scope.headers = self.headers;

        let mut receive = MemoryReceiver::new(vec![ReceiveEvent::HttpRequest {
            body: self.body,
            more_body: false,
        }]);
        if self.disconnect_after_body {
            receive = receive.when_empty(ReceiveEvent::HttpDisconnect);
        }

        let (events, error) = self.client.run(scope, receive);
        TestResponse::from_events(events, error)
    }
}

/// Response collected by the [`TestClient`].
#[derive(Debug)]
pub struct TestResponse {
    events: Vec<SendEvent>,
    status: Option<u16>,
    headers: Headers,
    body: Vec<u8>,
    complete: bool,
    error: Option<Error>,
}

impl TestResponse {
    fn from_events(events: Vec<SendEvent>, error: Option<Error>) -> Self {
        let mut status = None;
        let mut headers = Headers::new();
        let mut body = Vec::new();
        let mut complete = false;

        for event in &events {
            match event {
                SendEvent::HttpResponseStart {
                    status: s,
                    headers: h,
                } => {
                    status = Some(*s);
                    headers = h.clone();
                }
                SendEvent::HttpResponseBody {
                    body: chunk,
                    more_body,
                } => {
                    body.extend_from_slice(chunk);
                    complete = !more_body;
                }
                _ => {}
            }
        }

        Self {
            events,
            status,
            headers,
            body,
            complete,
            error,
        }
    }

    /// Status code, or 0 when no response was started.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(0)
    }

    /// Returns `true` if `http.response.start` was sent.
    #[must_use]
    pub fn started(&self) -> bool {
        self.status.is_some()
    }

    /// Returns `true` if the terminating body event was sent.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a response header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Raw body bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Every event the application sent.
    #[must_use]
    pub fn events(&self) -> &[SendEvent] {
        &self.events
    }

    /// The error the application returned, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

/// Builder for a scripted WebSocket session.
pub struct WebSocketBuilder<'a, A> {
    client: &'a TestClient<A>,
    target: String,
    headers: Headers,
    messages: Vec<Message>,
}

impl<A: AsgiApp + 'static> WebSocketBuilder<'_, A> {
    /// Add a handshake header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Queue a text message from the client.
    #[must_use]
    pub fn send_text(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::Text(text.into()));
        self
    }

    /// Queue a binary message from the client.
    #[must_use]
    pub fn send_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.messages.push(Message::Bytes(bytes.into()));
        self
    }

    /// Connect, deliver the queued messages, then disconnect with 1000.
    pub fn run(self) -> WebSocketSession {
        let mut scope = Scope::websocket(&self.target);
        scope.headers = self.headers;

        let mut events = vec![ReceiveEvent::WebSocketConnect];
        events.extend(self.messages.into_iter().map(ReceiveEvent::WebSocketReceive));
        let receive = MemoryReceiver::new(events)
            .when_empty(ReceiveEvent::WebSocketDisconnect { code: 1000 });

        let (events, error) = self.client.run(scope, receive);
        WebSocketSession { events, error }
    }
}

/// Outcome of a scripted WebSocket session.
#[derive(Debug)]
pub struct WebSocketSession {
    events: Vec<SendEvent>,
    error: Option<Error>,
}

impl WebSocketSession {
    /// Returns `true` if the application accepted the connection.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, SendEvent::WebSocketAccept { .. }))
    }

    /// Messages the application sent.
    #[must_use]
    pub fn messages(&self) -> Vec<&Message> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SendEvent::WebSocketSend(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Text messages the application sent.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Text(text) => Some(text.as_str()),
                Message::Bytes(_) => None,
            })
            .collect()
    }

    /// Close code sent by the application, if it closed the connection.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        self.events.iter().find_map(|e| match e {
            SendEvent::WebSocketClose { code, .. } => Some(*code),
            _ => None,
        })
    }

    /// Every event the application sent.
    #[must_use]
    pub fn events(&self) -> &[SendEvent] {
        &self.events
    }

    /// The error the application returned, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_receiver_replays_then_trails() {
        let receive = MemoryReceiver::new(vec![ReceiveEvent::LifespanStartup])
            .when_empty(ReceiveEvent::HttpDisconnect);
        let first = futures_executor::block_on(receive.receive()).unwrap();
        let second = futures_executor::block_on(receive.receive()).unwrap();
        let third = futures_executor::block_on(receive.receive()).unwrap();
        assert_eq!(first, ReceiveEvent::LifespanStartup);
        assert_eq!(second, ReceiveEvent::HttpDisconnect);
        assert_eq!(third, ReceiveEvent::HttpDisconnect);
    }

    #[test]
    fn test_response_assembles_body() {
        let response = TestResponse::from_events(
            vec![
                SendEvent::HttpResponseStart {
                    status: 201,
                    headers: [("x-a", "1")].into_iter().collect(),
                },
                SendEvent::HttpResponseBody {
                    body: b"ab".to_vec(),
                    more_body: true,
                },
                SendEvent::HttpResponseBody {
                    body: b"c".to_vec(),
                    more_body: false,
                },
            ],
            None,
        );
        assert_eq!(response.status(), 201);
        assert_eq!(response.header("X-A"), Some("1"));
        assert_eq!(response.text(), "abc");
        assert!(response.is_complete());
    }
}
