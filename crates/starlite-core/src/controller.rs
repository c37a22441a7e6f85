//! Controllers: route handlers grouped under one path.
//!
//! A [`Controller`] is the layer between a [`Router`](crate::Router) and
//! its route handlers. It has a path appended to the router prefix and its
//! own `opt` values, middleware, exception handlers and guards, merged the
//! same way a router's are.
//!
//! ```ignore
//! let users = Controller::new("/users")
//!     .guard(require_login)
//!     .route(RouteHandler::get("/", list_users))
//!     .route(RouteHandler::get("/{user_id:int}", get_user))
//!     .route(RouteHandler::delete("/{user_id:int}", delete_user).opt("admin", true));
//!
//! let app = App::builder()
//!     .include(Router::new("/api").controller(users))
//!     .build()?;
//! ```

use serde_json::Value;
use starlite_router::join_paths;

use crate::asgi::{RouteInfo, Scope};
use crate::error::{Error, HttpError};
use crate::handler::RouteHandler;
use crate::middleware::{Exclusion, Middleware, MiddlewareLayer};
use crate::response::Response;
use crate::router::Layer;

/// Route handlers sharing a path and configuration.
#[derive(Debug, Clone, Default)]
pub struct Controller {
    path: String,
    handlers: Vec<RouteHandler>,
    layer: Layer,
}

impl Controller {
    /// Creates an empty controller at `path`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: join_paths([path]),
            ..Self::default()
        }
    }

    /// The normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Add a route handler. Its path is relative to the controller path.
    #[must_use]
    pub fn route(mut self, handler: RouteHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set an option value inherited by every route handler.
    #[must_use]
    pub fn opt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layer.opt.insert(key.into(), value.into());
        self
    }

    /// Add a middleware layer for every route handler.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.layer.middleware.push(MiddlewareLayer::new(middleware));
        self
    }

    /// Add a middleware layer with exclusion rules.
    #[must_use]
    pub fn middleware_with<M: Middleware + 'static>(mut self, middleware: M, exclusion: Exclusion) -> Self {
        self.layer
            .middleware
            .push(MiddlewareLayer::with_exclusion(middleware, exclusion));
        self
    }

    /// Register an exception handler for every route handler.
    #[must_use]
    pub fn exception_handler<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn(&Scope, &HttpError) -> Response + Send + Sync + 'static,
    {
        self.layer.exception_handlers.register(status, handler);
        self
    }

    /// Add a guard for every route handler.
    #[must_use]
    pub fn guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Scope, &RouteInfo) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.layer.guards.push(guard);
        self
    }

    /// The route handlers with the controller path and configuration applied.
    #[must_use]
    pub fn into_handlers(self) -> Vec<RouteHandler> {
        let Self {
            path,
            handlers,
            layer,
        } = self;
        handlers
            .into_iter()
            .map(|handler| layer.apply(&path, handler))
            .collect()
    }
}
