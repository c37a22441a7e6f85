//! Application builder and the top-level ASGI application.
//!
//! [`AppBuilder`] collects route handlers, routers, middleware, exception
//! handlers and lifespan hooks. [`AppBuilder::build`] compiles everything
//! once:
//!
//! 1. Routers and controllers are flattened into route handlers with full
//!    paths and merged configuration.
//! 2. Each route handler gets its own stack:
//!    `boundary(middleware(boundary(guards + endpoint)))`.
//! 3. The stacks are inserted into a [`RouteTrie`], which is validated.
//!
//! The built [`App`] is immutable. Incoming connections are resolved
//! against the trie and handed to the matched stack; routing errors are
//! rendered by an application-level exception boundary.
//!
//! # Example
//!
//! ```ignore
//! let app = App::builder()
//!     .config(AppConfig::new().debug(true))
//!     .middleware(RequestLogger::new())
//!     .route(RouteHandler::get("/items/{item_id:int}", get_item).name("get_item"))
//!     .include(Router::new("/admin").route(RouteHandler::get("/", dashboard)))
//!     .on_startup(|| async { Ok(()) })
//!     .build()?;
//!
//! assert_eq!(app.url_for("get_item", &[("item_id", "7")])?, "/items/7");
//! ```

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use starlite_router::{
    ConfigError, ParsedPath, ReverseError, RouteIndex, RouteRegistration, RouteTrie, Target,
    normalize_path,
};
use starlite_types::{HandlerKind, ScopeType};

use crate::asgi::{
    AsgiApp, BoxFuture, ReceiveEvent, RouteInfo, Scope, SendEvent, SharedReceiver, SharedSender,
};
use crate::config::AppConfig;
use crate::controller::Controller;
use crate::context::RequestContext;
use crate::error::{Error, HttpError};
use crate::exceptions::{ExceptionBoundary, ExceptionHandlers};
use crate::handler::{EndpointApp, RouteHandler};
use crate::middleware::{Exclusion, Middleware};
use crate::response::Response;
use crate::router::Router;

/// A lifespan hook.
pub type LifespanHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), Error>> + Send + Sync>;

/// The compiled stack of one route handler, stored in the trie.
#[derive(Clone)]
struct RouteEntry {
    app: Arc<dyn AsgiApp>,
    info: Arc<RouteInfo>,
}

/// One registered handler, as listed by [`App::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    /// Handler kind.
    pub kind: HandlerKind,
    /// Path format (`/items/{item_id}`).
    pub path: String,
    /// Handler name, if any.
    pub name: Option<String>,
}

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: AppConfig,
    root: Router,
    exception_handlers: ExceptionHandlers,
    startup_hooks: Vec<LifespanHook>,
    shutdown_hooks: Vec<LifespanHook>,
}

impl AppBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration.
    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a route handler.
    #[must_use]
    pub fn route(mut self, handler: RouteHandler) -> Self {
        self.root = self.root.route(handler);
        self
    }

    /// Register a controller.
    #[must_use]
    pub fn controller(mut self, controller: Controller) -> Self {
        self.root = self.root.controller(controller);
        self
    }

    /// Register every route handler of a router.
    #[must_use]
    pub fn include(mut self, router: Router) -> Self {
        self.root = self.root.include(router);
        self
    }

    /// Set an application-wide option value.
    #[must_use]
    pub fn opt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.root = self.root.opt(key, value);
        self
    }

    /// Add an application-wide middleware layer.
    ///
    /// The first layer added is the outermost for every route handler.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.root = self.root.middleware(middleware);
        self
    }

    /// Add an application-wide middleware layer with exclusion rules.
    #[must_use]
    pub fn middleware_with<M: Middleware + 'static>(mut self, middleware: M, exclusion: Exclusion) -> Self {
        self.root = self.root.middleware_with(middleware, exclusion);
        self
    }

    /// Register an application-wide exception handler.
    ///
    /// Application handlers also render routing errors (404, 405).
    #[must_use]
    pub fn exception_handler<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn(&Scope, &HttpError) -> Response + Send + Sync + 'static,
    {
        self.exception_handlers.register(status, handler);
        self
    }

    /// Add an application-wide guard.
    ///
    /// Application guards run before router, controller and handler guards.
    #[must_use]
    pub fn guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Scope, &RouteInfo) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.root = self.root.guard(guard);
        self
    }

    /// Register a startup hook. Hooks run in registration order.
    #[must_use]
    pub fn on_startup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.startup_hooks.push(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Register a shutdown hook. Hooks run in registration order.
    #[must_use]
    pub fn on_shutdown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.shutdown_hooks.push(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Compile and validate the application.
    pub fn build(self) -> Result<App, ConfigError> {
        let Self {
            config,
            root,
            exception_handlers,
            startup_hooks,
            shutdown_hooks,
        } = self;

        let mut trie = RouteTrie::new();
        let mut index = RouteIndex::new();
        let mut routes = Vec::new();

        for handler in root.into_handlers() {
            let parsed = ParsedPath::parse(&handler.path)?;
            if let Some(name) = &handler.name {
                index.insert(name.clone(), parsed.clone())?;
            }
            routes.extend(handler.kinds.iter().map(|kind| RouteSummary {
                kind: *kind,
                path: parsed.path_format.clone(),
                name: handler.name.clone(),
            }));

            let entry = compile(&config, &exception_handlers, &handler, &parsed)?;
            let registration = RouteRegistration::from_parsed(parsed);
            let registration = if handler.mount.is_mount() {
                registration.mount(handler.mount, entry)
            } else {
                handler
                    .kinds
                    .iter()
                    .fold(registration, |reg, kind| reg.handler(*kind, entry.clone()))
            };
            trie.insert(registration)?;
        }
        trie.validate()?;

        tracing::info!(app = %config.name, routes = routes.len(), "application built");

        let router: Arc<dyn AsgiApp> = Arc::new(Dispatcher {
            trie: Arc::new(trie),
        });
        let boundary = ExceptionBoundary::new(router, exception_handlers, config.debug);

        Ok(App {
            config,
            index,
            routes,
            boundary,
            startup_hooks,
            shutdown_hooks,
        })
    }
}

/// Build the stack for one route handler.
fn compile(
    config: &AppConfig,
    app_handlers: &ExceptionHandlers,
    handler: &RouteHandler,
    parsed: &ParsedPath,
) -> Result<RouteEntry, ConfigError> {
    let mut handlers = app_handlers.clone();
    handlers.merge(&handler.exception_handlers);

    let endpoint: Arc<dyn AsgiApp> = Arc::new(EndpointApp {
        endpoint: handler.endpoint.clone(),
        guards: handler.guards.clone(),
        max_body_size: config.max_body_size,
    });
    let inner = Arc::new(ExceptionBoundary::new(endpoint, handlers.clone(), config.debug));
    let layered = handler.middleware.wrap(inner)?;
    let app = Arc::new(ExceptionBoundary::new(layered, handlers, config.debug));

    Ok(RouteEntry {
        app,
        info: Arc::new(RouteInfo {
            name: handler.name.clone(),
            path_format: parsed.path_format.clone(),
            kinds: handler.kinds.clone(),
            opt: Arc::new(handler.opt.clone()),
        }),
    })
}

/// Resolves connections against the trie and calls the matched stack.
struct Dispatcher {
    trie: Arc<RouteTrie<RouteEntry>>,
}

impl AsgiApp for Dispatcher {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        mut scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            ctx.checkpoint()?;
            let target = match scope.scope_type {
                ScopeType::Http => Target::Http(
                    scope
                        .method
                        .ok_or_else(|| HttpError::bad_request().with_detail("missing request method"))?,
                ),
                ScopeType::WebSocket => Target::WebSocket,
                ScopeType::Lifespan => return Err(Error::internal("lifespan scopes are not routed")),
            };

            let path = normalize_path(&scope.path);
            let matched = self.trie.resolve(&path, target)?;
            let entry = matched.handler;
            tracing::trace!(
                request_id = ctx.request_id(),
                path = %path,
                kind = %matched.kind,
                route = %entry.info.path_format,
                "dispatching"
            );

            scope.path_params = matched.params;
            scope.route = Some(Arc::clone(&entry.info));
            if let Some(mount) = matched.mount {
                if mount.prefix != "/" {
                    scope.root_path.push_str(&mount.prefix);
                }
                scope.path = mount.remaining;
            }
            entry.app.call(ctx, scope, receive, send).await
        })
    }
}

/// A built application.
pub struct App {
    config: AppConfig,
    index: RouteIndex,
    routes: Vec<RouteSummary>,
    boundary: ExceptionBoundary,
    startup_hooks: Vec<LifespanHook>,
    shutdown_hooks: Vec<LifespanHook>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Start building an application.
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// The application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Every registered handler with its path format.
    #[must_use]
    pub fn routes(&self) -> &[RouteSummary] {
        &self.routes
    }

    /// Build the path of a named route handler.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError> {
        self.index.reverse(name, params)
    }

    /// Install the configured logging subscriber.
    ///
    /// Returns `false` if a global subscriber already exists.
    pub fn init_logging(&self) -> bool {
        crate::logging::init_logging(&self.config.log)
    }

    async fn lifespan(&self, receive: SharedReceiver, send: SharedSender) -> Result<(), Error> {
        loop {
            match receive.receive().await? {
                ReceiveEvent::LifespanStartup => {
                    if let Err(err) = run_hooks(&self.startup_hooks).await {
                        tracing::error!(app = %self.config.name, error = %err, "startup failed");
                        send.send(SendEvent::LifespanStartupFailed {
                            message: err.to_string(),
                        })
                        .await?;
                        return Err(err);
                    }
                    tracing::info!(app = %self.config.name, "startup complete");
                    send.send(SendEvent::LifespanStartupComplete).await?;
                }
                ReceiveEvent::LifespanShutdown => {
                    if let Err(err) = run_hooks(&self.shutdown_hooks).await {
                        tracing::error!(app = %self.config.name, error = %err, "shutdown failed");
                        send.send(SendEvent::LifespanShutdownFailed {
                            message: err.to_string(),
                        })
                        .await?;
                        return Err(err);
                    }
                    tracing::info!(app = %self.config.name, "shutdown complete");
                    return send.send(SendEvent::LifespanShutdownComplete).await;
                }
                other => tracing::trace!(event = other.event_type(), "ignoring lifespan event"),
            }
        }
    }
}

async fn run_hooks(hooks: &[LifespanHook]) -> Result<(), Error> {
    for hook in hooks {
        hook().await?;
    }
    Ok(())
}

impl AsgiApp for App {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        if scope.scope_type == ScopeType::Lifespan {
            return Box::pin(self.lifespan(receive, send));
        }
        self.boundary.call(ctx, scope, receive, send)
    }
}

#[cfg(test)]
mod tests {
    use starlite_types::Method;

    use super::*;
    use crate::request::Request;
    use crate::testing::TestClient;

    async fn hello(_ctx: RequestContext, _req: Request) -> Result<&'static str, Error> {
        Ok("hello")
    }

    #[test]
    fn builds_and_lists_routes() {
        let app = App::builder()
            .route(RouteHandler::http("/items/{item_id:int}", &[Method::Get, Method::Delete], hello).name("item"))
            .route(RouteHandler::get("/", hello))
            .build()
            .unwrap();

        assert_eq!(app.routes().len(), 3);
        assert_eq!(app.routes()[0].path, "/items/{item_id}");
        assert_eq!(app.routes()[0].name.as_deref(), Some("item"));
        assert_eq!(app.url_for("item", &[("item_id", "3")]).unwrap(), "/items/3");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = App::builder()
            .route(RouteHandler::get("/a", hello).name("same"))
            .route(RouteHandler::get("/b", hello).name("same"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateHandlerName { .. }));
    }

    #[test]
    fn duplicate_handlers_are_rejected() {
        let err = App::builder()
            .route(RouteHandler::get("/a", hello))
            .route(RouteHandler::get("/a/", hello))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateHandler { .. }));
    }

    #[test]
    fn routes_and_renders_not_found() {
        let app = App::builder().route(RouteHandler::get("/", hello)).build().unwrap();
        let client = TestClient::new(app);

        assert_eq!(client.get("/").send().text(), "hello");
        let missing = client.get("/nope").send();
        assert_eq!(missing.status(), 404);
        assert!(missing.error().is_none());
    }
}
