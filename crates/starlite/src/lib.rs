//! ASGI-style web framework built around a prefix-trie router.
//!
//! starlite_rust provides:
//!
//! - **Typed path parameters** resolved by a trie with literal-over-parameter
//!   precedence (`/users/me` beats `/users/{user_id:int}`)
//! - **Build-time validation** of the route tree: duplicate handlers,
//!   conflicting parameter names, ASGI path conflicts
//! - **ASGI dispatch** with HTTP, WebSocket and lifespan scopes
//! - **Layers**: application, routers, controllers and route handlers each
//!   contribute middleware, guards, exception handlers and `opt` values
//! - **Middleware stacks** composed once at startup, with path, scope and
//!   `opt` based exclusions
//! - **Mounts** for raw ASGI applications and static files
//!
//! # Quick Start
//!
//! ```ignore
//! use starlite_rust::prelude::*;
//!
//! async fn get_item(_ctx: RequestContext, req: Request) -> Result<String, Error> {
//!     let id = req.path_params().get_int("item_id").unwrap_or_default();
//!     Ok(format!("item {id}"))
//! }
//!
//! let app = App::builder()
//!     .route(RouteHandler::get("/items/{item_id:int}", get_item).name("get_item"))
//!     .build()?;
//!
//! let client = TestClient::new(app);
//! assert_eq!(client.get("/items/3").send().status(), 200);
//! ```
//!
//! # Crate Structure
//!
//! - [`starlite_core`]: ASGI model, handlers, middleware, application
//! - [`starlite_router`]: path parsing, the routing trie and reverse lookup
//! - [`starlite_types`]: shared enums (`Method`, `ScopeType`, `HandlerKind`)

#![forbid(unsafe_code)]

// Re-export crates
pub use starlite_core as core;
pub use starlite_router as router;
pub use starlite_types as types;

// Re-export commonly used types
pub use starlite_core::{
    AddResponseHeader, AllowedHosts, App, AppBuilder, AppConfig, AsgiApp, Controller, Error,
    Exclusion, Guard, HttpError, IntoResponse, Json, LogConfig, LogLevel, Middleware, RateLimit,
    RateUnit, Request, RequestContext, RequestLogger, RequireHeader, Response, RouteHandler,
    RouteInfo, Router, Scope, StaticFiles, WebSocket, WebSocketError, init_logging,
};
pub use starlite_router::{ConfigError, PathParams, ReverseError, RouteError};
pub use starlite_types::{HandlerKind, Method, ScopeType};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        App, AppBuilder, AppConfig, AsgiApp, Controller, Error, Exclusion, HttpError, IntoResponse,
        Json, Method, Middleware, Request, RequestContext, Response, RouteHandler, RouteInfo,
        Router, Scope, StaticFiles, WebSocket, WebSocketError,
    };
    pub use crate::testing::TestClient;
    pub use serde::{Deserialize, Serialize};
}

/// Testing utilities module.
pub mod testing {
    pub use starlite_core::testing::{
        MemoryReceiver, RecordingSender, RequestBuilder, TestClient, TestResponse,
        WebSocketBuilder, WebSocketSession,
    };
}
