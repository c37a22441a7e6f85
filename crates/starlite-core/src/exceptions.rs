//! Exception boundary: turns errors into ASGI output.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use starlite_types::ScopeType;

use crate::asgi::{AsgiApp, BoxFuture, Scope, SendEvent, Sender, SharedReceiver, SharedSender};
use crate::context::RequestContext;
use crate::error::{Error, HttpError};
use crate::response::Response;

/// A function rendering an [`HttpError`] for a status code.
pub type ExceptionHandler = Arc<dyn Fn(&Scope, &HttpError) -> Response + Send + Sync>;

/// Exception handlers keyed by status code.
#[derive(Clone, Default)]
pub struct ExceptionHandlers {
    handlers: HashMap<u16, ExceptionHandler>,
}

impl std::fmt::Debug for ExceptionHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<_> = self.handlers.keys().collect();
        codes.sort();
        f.debug_struct("ExceptionHandlers")
            .field("status_codes", &codes)
            .finish()
    }
}

impl ExceptionHandlers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a status code, replacing any previous one.
    pub fn register<F>(&mut self, status: u16, handler: F)
    where
        F: Fn(&Scope, &HttpError) -> Response + Send + Sync + 'static,
    {
        self.handlers.insert(status, Arc::new(handler));
    }

    /// Merge `other` into this registry; `other` wins on conflicts.
    pub fn merge(&mut self, other: &ExceptionHandlers) {
        for (status, handler) in &other.handlers {
            self.handlers.insert(*status, Arc::clone(handler));
        }
    }

    /// The handler for a status code.
    #[must_use]
    pub fn get(&self, status: u16) -> Option<&ExceptionHandler> {
        self.handlers.get(&status)
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Wraps an application and converts its errors into responses.
///
/// - HTTP: a registered handler for the status, else the JSON error body.
///   Unexpected errors become 500; in debug mode the 500 is a plain-text
///   page describing the error.
/// - WebSocket: `websocket.close` with the error's close code.
/// - If the response was already started (or the socket closed), the error
///   is only logged.
pub struct ExceptionBoundary {
    inner: Arc<dyn AsgiApp>,
    handlers: ExceptionHandlers,
    debug: bool,
}

impl ExceptionBoundary {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn AsgiApp>, handlers: ExceptionHandlers, debug: bool) -> Self {
        Self {
            inner,
            handlers,
            debug,
        }
    }

    fn render_http(&self, scope: &Scope, err: &Error) -> Response {
        let http = err.to_http();
        if let Some(handler) = self.handlers.get(http.status()) {
            return handler(scope, &http);
        }
        if self.debug && is_unexpected(err) {
            return debug_response(scope, err);
        }
        Response::from_http_error(&http)
    }
}

fn is_unexpected(err: &Error) -> bool {
    matches!(err, Error::Internal(_) | Error::WebSocket(_))
}

fn debug_response(scope: &Scope, err: &Error) -> Response {
    let mut page = String::from("Internal Server Error\n\n");
    let _ = writeln!(page, "{} {}", scope.method.map_or("-", |m| m.as_str()), scope.path);
    let _ = writeln!(page, "error: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let _ = writeln!(page, "caused by: {cause}");
        source = std::error::Error::source(cause);
    }
    Response::text(page).status(500)
}

struct StartTracker {
    inner: SharedSender,
    started: AtomicBool,
}

impl Sender for StartTracker {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, Result<(), Error>> {
        // A websocket can still be closed after accept, so only the close
        // event ends it.
        if matches!(
            event,
            SendEvent::HttpResponseStart { .. } | SendEvent::WebSocketClose { .. }
        ) {
            self.started.store(true, Ordering::Release);
        }
        self.inner.send(event)
    }
}

impl AsgiApp for ExceptionBoundary {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let tracker = Arc::new(StartTracker {
                inner: Arc::clone(&send),
                started: AtomicBool::new(false),
            });
            let retained = scope.clone();
            let result = self
                .inner
                .call(ctx, scope, Arc::clone(&receive), tracker.clone())
                .await;

            let Err(err) = result else {
                return Ok(());
            };
            let scope = retained;

            if err.is_disconnect() {
                tracing::debug!(request_id = ctx.request_id(), path = %scope.path, "connection closed by client");
                return Ok(());
            }

            if tracker.started.load(Ordering::Acquire) {
                tracing::error!(
                    request_id = ctx.request_id(),
                    path = %scope.path,
                    error = %err,
                    "error raised after the response started"
                );
                return Ok(());
            }

            match scope.scope_type {
                ScopeType::Http => {
                    let response = self.render_http(&scope, &err);
                    if response.status_code() >= 500 {
                        tracing::error!(request_id = ctx.request_id(), path = %scope.path, error = %err, "request failed");
                    } else {
                        tracing::debug!(request_id = ctx.request_id(), path = %scope.path, error = %err, status = response.status_code(), "request rejected");
                    }
                    response.send(ctx, scope.method, receive, send).await
                }
                ScopeType::WebSocket => {
                    let code = err.websocket_close_code();
                    tracing::debug!(request_id = ctx.request_id(), path = %scope.path, code, error = %err, "closing websocket");
                    let reason = match &err {
                        Error::WebSocket(ws) => ws.reason.clone(),
                        other => other.to_http().detail().to_string(),
                    };
                    send.send(SendEvent::WebSocketClose { code, reason }).await
                }
                ScopeType::Lifespan => Err(err),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use starlite_types::Method;

    use super::*;
    use crate::error::WebSocketError;
    use crate::testing::TestClient;

    /// An app that fails with a fixed error, optionally after starting.
    struct Failing {
        start_first: bool,
        error: fn() -> Error,
    }

    impl AsgiApp for Failing {
        fn call<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _scope: Scope,
            _receive: SharedReceiver,
            send: SharedSender,
        ) -> BoxFuture<'a, Result<(), Error>> {
            Box::pin(async move {
                if self.start_first {
                    send.send(SendEvent::HttpResponseStart {
                        status: 200,
                        headers: crate::headers::Headers::new(),
                    })
                    .await?;
                }
                Err((self.error)())
            })
        }
    }

    fn boundary(error: fn() -> Error, handlers: ExceptionHandlers, debug: bool) -> TestClient<ExceptionBoundary> {
        TestClient::new(ExceptionBoundary::new(
            Arc::new(Failing {
                start_first: false,
                error,
            }),
            handlers,
            debug,
        ))
    }

    #[test]
    fn http_error_becomes_json() {
        let client = boundary(
            || HttpError::new(403).with_detail("forbidden zone").with_header("x-why", "no").into(),
            ExceptionHandlers::new(),
            false,
        );
        let response = client.get("/").send();
        assert_eq!(response.status(), 403);
        assert_eq!(response.header("x-why"), Some("no"));
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["status_code"], 403);
        assert_eq!(body["detail"], "forbidden zone");
        assert!(response.error().is_none());
    }

    #[test]
    fn internal_error_becomes_500() {
        let client = boundary(|| Error::internal("db down"), ExceptionHandlers::new(), false);
        let response = client.get("/").send();
        assert_eq!(response.status(), 500);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["detail"], "Internal Server Error");
        assert!(!response.text().contains("db down"));
    }

    #[test]
    fn debug_mode_renders_error_page() {
        let client = boundary(|| Error::internal("db down"), ExceptionHandlers::new(), true);
        let response = client.get("/report").send();
        assert_eq!(response.status(), 500);
        assert!(response.header("content-type").unwrap().starts_with("text/plain"));
        assert!(response.text().contains("db down"));
        assert!(response.text().contains("GET /report"));
    }

    #[test]
    fn status_handler_overrides_rendering() {
        let mut handlers = ExceptionHandlers::new();
        handlers.register(404, |scope, _err| Response::text(format!("nothing at {}", scope.path)).status(404));
        let client = boundary(|| HttpError::not_found().into(), handlers, false);

        let response = client.get("/missing").send();
        assert_eq!(response.status(), 404);
        assert_eq!(response.text(), "nothing at /missing");
    }

    #[test]
    fn websocket_errors_close_the_socket() {
        let client = boundary(|| WebSocketError::new(4401, "unauthorized").into(), ExceptionHandlers::new(), false);
        let session = client.websocket("/ws").run();
        assert_eq!(session.close_code(), Some(4401));

        let client = boundary(|| HttpError::new(403).into(), ExceptionHandlers::new(), false);
        assert_eq!(client.websocket("/ws").run().close_code(), Some(4403));
    }

    #[test]
    fn started_response_is_not_restarted() {
        let client = TestClient::new(ExceptionBoundary::new(
            Arc::new(Failing {
                start_first: true,
                error: || Error::internal("late failure"),
            }),
            ExceptionHandlers::new(),
            false,
        ));
        let response = client.request(Method::Get, "/").send();
        let starts = response
            .events()
            .iter()
            .filter(|e| matches!(e, SendEvent::HttpResponseStart { .. }))
            .count();
        assert_eq!(starts, 1);
        assert_eq!(response.status(), 200);
    }
}
