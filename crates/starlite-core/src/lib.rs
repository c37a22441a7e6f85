//! ASGI dispatch layer for starlite_rust.
//!
//! This crate turns the routing trie into a running application:
//! - [`Scope`], receive/send events and the [`AsgiApp`] trait modelling
//!   the ASGI calling convention
//! - [`RouteHandler`] declarations for HTTP, WebSocket and raw ASGI
//!   endpoints, grouped by [`Controller`]s and [`Router`]s
//! - [`Guards`] rejecting connections before the endpoint runs
//! - [`Middleware`] stacks composed once at startup, with exclusions
//! - Exception boundaries mapping errors to responses and close codes
//! - [`App`] with lifespan hooks, reverse URL lookup and static files
//! - [`TestClient`] for in-process tests
//!
//! # Asupersync Integration
//!
//! Every connection carries a [`RequestContext`] wrapping an asupersync
//! [`Cx`](asupersync::Cx). Middleware layers checkpoint before delegating
//! and streaming responses cancel the context when the client goes away.

#![forbid(unsafe_code)]

pub mod app;
pub mod asgi;
pub mod config;
mod context;
pub mod controller;
pub mod error;
pub mod exceptions;
pub mod guards;
mod handler;
mod headers;
pub mod logging;
pub mod middleware;
mod request;
mod response;
pub mod router;
pub mod static_files;
pub mod testing;
mod websocket;

pub use app::{App, AppBuilder, LifespanHook, RouteSummary};
pub use asgi::{
    AsgiApp, BoxFuture, Message, Opt, ReceiveEvent, Receiver, RouteInfo, Scope, SendEvent, Sender,
    SharedReceiver, SharedSender,
};
pub use config::AppConfig;
pub use context::{CancelledError, RequestContext};
pub use controller::Controller;
pub use error::{Error, HttpError, WebSocketError};
pub use exceptions::{ExceptionBoundary, ExceptionHandler, ExceptionHandlers};
pub use guards::{Guard, Guards};
pub use handler::{BlockingHandler, Handler, RouteHandler, WebSocketHandler};
pub use headers::Headers;
pub use logging::{LogConfig, LogLevel, init_logging};
pub use middleware::{
    AddResponseHeader, AllowedHosts, CompiledExclusion, Exclusion, Layered, Middleware,
    MiddlewareLayer, MiddlewareStack, RateLimit, RateUnit, RequestLogger, RequireHeader,
};
pub use request::{DEFAULT_MAX_BODY_SIZE, Request};
pub use response::{
    IntoResponse, Json, Response, ResponseBody, mime_type_for_extension, reason_phrase,
};
pub use router::Router;
pub use static_files::StaticFiles;
pub use testing::{TestClient, TestResponse, WebSocketSession};
pub use websocket::{CLOSE_NORMAL, WebSocket};

// Re-export key asupersync types for convenience
pub use asupersync::Cx;
