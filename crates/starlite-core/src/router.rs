//! Routers for grouping route handlers under a shared prefix.
//!
//! A [`Router`] carries a path prefix, `opt` values, middleware layers and
//! exception handlers that apply to every route handler it contains.
//! Routers nest: an included router's prefix is appended to its parent's.
//!
//! ```ignore
//! let users = Router::new("/users")
//!     .route(RouteHandler::get("/", list_users))
//!     .route(RouteHandler::get("/{user_id:int}", get_user));
//!
//! let api = Router::new("/api/v1")
//!     .middleware(RequestLogger::new())
//!     .include(users);
//!
//! // Registered paths: /api/v1/users and /api/v1/users/{user_id:int}
//! ```
//!
//! Routers are flattened when the application is built. For each route
//! handler:
//!
//! 1. **path**: router prefix + handler path
//! 2. **middleware**: router layers, then handler layers (outer first)
//! 3. **opt**: router values, overridden by handler values
//! 4. **exception handlers**: handler > router
//! 5. **guards**: router guards, then handler guards
//!
//! [`Controller`]s sit between a router and its route handlers and follow
//! the same rules.

use serde_json::Value;
use starlite_router::join_paths;

use crate::asgi::{Opt, RouteInfo, Scope};
use crate::controller::Controller;
use crate::error::{Error, HttpError};
use crate::exceptions::ExceptionHandlers;
use crate::guards::Guards;
use crate::handler::RouteHandler;
use crate::middleware::{Exclusion, Middleware, MiddlewareLayer, MiddlewareStack};
use crate::response::Response;

/// Configuration a router or controller passes down to its route handlers.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layer {
    pub(crate) opt: Opt,
    pub(crate) middleware: MiddlewareStack,
    pub(crate) exception_handlers: ExceptionHandlers,
    pub(crate) guards: Guards,
}

impl Layer {
    /// Prefix the handler path and merge this layer's configuration into
    /// the handler's.
    pub(crate) fn apply(&self, prefix: &str, mut handler: RouteHandler) -> RouteHandler {
        handler.path = join_paths([prefix, handler.path.as_str()]);

        let mut opt = self.opt.clone();
        opt.extend(std::mem::take(&mut handler.opt));
        handler.opt = opt;

        let mut middleware = self.middleware.clone();
        middleware.extend(&handler.middleware);
        handler.middleware = middleware;

        let mut exception_handlers = self.exception_handlers.clone();
        exception_handlers.merge(&handler.exception_handlers);
        handler.exception_handlers = exception_handlers;

        let mut guards = self.guards.clone();
        guards.extend(&handler.guards);
        handler.guards = guards;

        handler
    }
}

/// A group of route handlers sharing a prefix and configuration.
#[derive(Debug, Clone, Default)]
pub struct Router {
    prefix: String,
    handlers: Vec<RouteHandler>,
    controllers: Vec<Controller>,
    routers: Vec<Router>,
    layer: Layer,
}

impl Router {
    /// Creates an empty router mounted at `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: join_paths([prefix]),
            ..Self::default()
        }
    }

    /// The normalized prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add a route handler.
    #[must_use]
    pub fn route(mut self, handler: RouteHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Add a controller.
    #[must_use]
    pub fn controller(mut self, controller: Controller) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Nest another router below this one.
    #[must_use]
    pub fn include(mut self, router: Router) -> Self {
        self.routers.push(router);
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

    /// Flatten this router and its children into route handlers carrying
    /// their full path and effective configuration.
    ///
    /// Nested routers come first, then controllers, then the router's own
    /// route handlers.
    #[must_use]
    pub fn into_handlers(self) -> Vec<RouteHandler> {
        let Self {
            prefix,
            handlers,
            controllers,
            routers,
            layer,
        } = self;

        routers
            .into_iter()
            .flat_map(Router::into_handlers)
            .chain(controllers.into_iter().flat_map(Controller::into_handlers))
            .chain(handlers)
            .map(|handler| layer.apply(&prefix, handler))
            .collect()
    }
}
