//! The ASGI calling convention modelled as Rust types.
//!
//! An application is invoked with a [`Scope`] describing the connection, a
//! [`Receiver`] yielding [`ReceiveEvent`]s and a [`Sender`] accepting
//! [`SendEvent`]s. Everything in the dispatch layer (routing, middleware,
//! exception boundary, handlers, mounted sub-applications) implements
//! [`AsgiApp`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use starlite_router::PathParams;
use starlite_types::{HandlerKind, Method, ScopeType};

use crate::context::RequestContext;
use crate::error::Error;
use crate::headers::Headers;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Free-form options attached to route handlers and routers.
pub type Opt = Map<String, Value>;

/// Metadata about the route handler serving a connection.
#[derive(Debug, Clone, Default)]
pub struct RouteInfo {
    /// Unique handler name, when one was given.
    pub name: Option<String>,
    /// The route path format (`/items/{item_id}`).
    pub path_format: String,
    /// Handler kinds registered by the route handler.
    pub kinds: Vec<HandlerKind>,
    /// Merged router and handler options.
    pub opt: Arc<Opt>,
}

/// Connection description.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Connection type.
    pub scope_type: ScopeType,
    /// Request path, relative to `root_path`.
    pub path: String,
    /// The path exactly as received.
    pub raw_path: String,
    /// Prefix consumed by mounts on the way to this application.
    pub root_path: String,
    /// HTTP method, `None` for WebSocket and lifespan scopes.
    pub method: Option<Method>,
    /// Request headers.
    pub headers: Headers,
    /// Raw query string, without the leading `?`.
    pub query_string: String,
    /// Converted path parameters, filled in by the router.
    pub path_params: PathParams,
    /// The matched route, filled in by the router.
    pub route: Option<Arc<RouteInfo>>,
}

impl Scope {
    fn with_type(scope_type: ScopeType, method: Option<Method>, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            scope_type,
            path: path.to_string(),
            raw_path: path.to_string(),
            root_path: String::new(),
            method,
            headers: Headers::new(),
            query_string: query.to_string(),
            path_params: PathParams::new(),
            route: None,
        }
    }

    /// An HTTP scope. A `?query` suffix on `target` becomes the query string.
    #[must_use]
    pub fn http(method: Method, target: &str) -> Self {
        Self::with_type(ScopeType::Http, Some(method), target)
    }

    /// A WebSocket scope.
    #[must_use]
    pub fn websocket(target: &str) -> Self {
        Self::with_type(ScopeType::WebSocket, None, target)
    }

    /// A lifespan scope.
    #[must_use]
    pub fn lifespan() -> Self {
        Self::with_type(ScopeType::Lifespan, None, "/")
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Route options of the matched handler, if any.
    #[must_use]
    pub fn route_opt(&self) -> Option<&Opt> {
        self.route.as_deref().map(|info| info.opt.as_ref())
    }
}

/// A WebSocket data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Text frame.
    Text(String),
    /// Binary frame.
    Bytes(Vec<u8>),
}

/// Events an application receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// `http.request`: a chunk of the request body.
    HttpRequest {
        /// Chunk contents.
        body: Vec<u8>,
        /// `true` if more chunks follow.
        more_body: bool,
    },
    /// `http.disconnect`.
    HttpDisconnect,
    /// `websocket.connect`.
    WebSocketConnect,
    /// `websocket.receive`.
    WebSocketReceive(Message),
    /// `websocket.disconnect`.
    WebSocketDisconnect {
        /// Close code sent by the client.
        code: u16,
    },
    /// `lifespan.startup`.
    LifespanStartup,
    /// `lifespan.shutdown`.
    LifespanShutdown,
}

impl ReceiveEvent {
    /// The ASGI event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::HttpRequest { .. } => "http.request",
            Self::HttpDisconnect => "http.disconnect",
            Self::WebSocketConnect => "websocket.connect",
            Self::WebSocketReceive(_) => "websocket.receive",
            Self::WebSocketDisconnect { .. } => "websocket.disconnect",
            Self::LifespanStartup => "lifespan.startup",
            Self::LifespanShutdown => "lifespan.shutdown",
        }
    }
}

/// Events an application sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    /// `http.response.start`.
    HttpResponseStart {
        /// Status code.
        status: u16,
        /// Response headers.
        headers: Headers,
    },
    /// `http.response.body`.
    HttpResponseBody {
        /// Chunk contents.
        body: Vec<u8>,
        /// `true` if more chunks follow.
        more_body: bool,
    },
    /// `websocket.accept`.
    WebSocketAccept {
        /// Extra handshake headers.
        headers: Headers,
    },
    /// `websocket.send`.
    WebSocketSend(Message),
    /// `websocket.close`.
    WebSocketClose {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
    /// `lifespan.startup.complete`.
    LifespanStartupComplete,
    /// `lifespan.startup.failed`.
    LifespanStartupFailed {
        /// Failure description.
        message: String,
    },
    /// `lifespan.shutdown.complete`.
    LifespanShutdownComplete,
    /// `lifespan.shutdown.failed`.
    LifespanShutdownFailed {
        /// Failure description.
        message: String,
    },
}

impl SendEvent {
    /// The ASGI event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::HttpResponseStart { .. } => "http.response.start",
            Self::HttpResponseBody { .. } => "http.response.body",
            Self::WebSocketAccept { .. } => "websocket.accept",
            Self::WebSocketSend(_) => "websocket.send",
            Self::WebSocketClose { .. } => "websocket.close",
            Self::LifespanStartupComplete => "lifespan.startup.complete",
            Self::LifespanStartupFailed { .. } => "lifespan.startup.failed",
            Self::LifespanShutdownComplete => "lifespan.shutdown.complete",
            Self::LifespanShutdownFailed { .. } => "lifespan.shutdown.failed",
        }
    }
}

/// The `receive` callable.
pub trait Receiver: Send + Sync {
    /// Wait for the next event from the server.
    fn receive(&self) -> BoxFuture<'_, Result<ReceiveEvent, Error>>;
}

/// The `send` callable.
pub trait Sender: Send + Sync {
    /// Send an event to the server.
    fn send(&self, event: SendEvent) -> BoxFuture<'_, Result<(), Error>>;
}

/// Shared handle to a [`Receiver`].
pub type SharedReceiver = Arc<dyn Receiver>;

/// Shared handle to a [`Sender`].
pub type SharedSender = Arc<dyn Sender>;

/// An ASGI application.
pub trait AsgiApp: Send + Sync {
    /// Serve one connection.
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

impl<A: AsgiApp + ?Sized> AsgiApp for Arc<A> {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        (**self).call(ctx, scope, receive, send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_scope_splits_query_string() {
        let scope = Scope::http(Method::Get, "/search?q=rust&page=2").with_header("Accept", "*/*");
        assert_eq!(scope.scope_type, ScopeType::Http);
        assert_eq!(scope.path, "/search");
        assert_eq!(scope.query_string, "q=rust&page=2");
        assert_eq!(scope.headers.get("accept"), Some("*/*"));
        assert!(scope.route_opt().is_none());
    }

    #[test]
    fn event_type_names() {
        assert_eq!(ReceiveEvent::HttpDisconnect.event_type(), "http.disconnect");
        assert_eq!(
            SendEvent::WebSocketClose {
                code: 1000,
                reason: String::new()
            }
            .event_type(),
            "websocket.close"
        );
        assert_eq!(
            SendEvent::LifespanStartupFailed {
                message: "x".into()
            }
            .event_type(),
            "lifespan.startup.failed"
        );
    }
}
