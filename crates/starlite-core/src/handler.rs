//! Route handlers: the innermost application of every route stack.

use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use serde_json::Value;
use starlite_router::MountKind;
use starlite_types::{HandlerKind, Method};

use crate::asgi::{AsgiApp, BoxFuture, Opt, RouteInfo, Scope, SharedReceiver, SharedSender};
use crate::context::RequestContext;
use crate::error::Error;
use crate::exceptions::ExceptionHandlers;
use crate::guards::Guards;
use crate::middleware::{Exclusion, Middleware, MiddlewareLayer, MiddlewareStack};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::static_files::StaticFiles;
use crate::websocket::WebSocket;

/// An HTTP endpoint.
///
/// Implemented for async functions and closures taking the request context
/// and the request by value:
///
/// ```ignore
/// async fn get_item(_ctx: RequestContext, req: Request) -> Result<Response, Error> {
///     let id = req.path_params().get_int("item_id").unwrap_or_default();
///     Response::json(&serde_json::json!({ "id": id }))
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Produce a response for the request.
    fn call(&self, ctx: RequestContext, req: Request) -> BoxFuture<'static, Result<Response, Error>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RequestContext, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, ctx: RequestContext, req: Request) -> BoxFuture<'static, Result<Response, Error>> {
        let fut = self(ctx, req);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}

/// A WebSocket endpoint.
pub trait WebSocketHandler: Send + Sync {
    /// Serve the connection.
    fn call(&self, ctx: RequestContext, socket: WebSocket) -> BoxFuture<'static, Result<(), Error>>;
}

impl<F, Fut> WebSocketHandler for F
where
    F: Fn(RequestContext, WebSocket) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext, socket: WebSocket) -> BoxFuture<'static, Result<(), Error>> {
        Box::pin(self(ctx, socket))
    }
}

/// A synchronous endpoint run on a dedicated thread.
///
/// The request body is read before the function is called, so
/// [`Request::cached_body`] is always populated.
pub struct BlockingHandler<F> {
    func: Arc<F>,
}

impl<F> BlockingHandler<F>
where
    F: Fn(Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    /// Wrap a blocking function.
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

impl<F> Handler for BlockingHandler<F>
where
    F: Fn(Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    fn call(&self, _ctx: RequestContext, mut req: Request) -> BoxFuture<'static, Result<Response, Error>> {
        let func = Arc::clone(&self.func);
        Box::pin(async move {
            req.body().await?;
            let (tx, rx) = oneshot::channel();
            std::thread::Builder::new()
                .name("starlite-blocking".into())
                .spawn(move || {
                    let _ = tx.send(func(req));
                })
                .map_err(Error::internal)?;
            rx.await
                .map_err(|_| Error::internal("blocking handler terminated without a response"))?
        })
    }
}

/// The endpoint at the bottom of a route stack.
#[derive(Clone)]
pub(crate) enum Endpoint {
    Http(Arc<dyn Handler>),
    WebSocket(Arc<dyn WebSocketHandler>),
    Asgi(Arc<dyn AsgiApp>),
}

/// An [`Endpoint`] bound to its guards and the request body limit.
pub(crate) struct EndpointApp {
    pub(crate) endpoint: Endpoint,
    pub(crate) guards: Guards,
    pub(crate) max_body_size: usize,
}

impl AsgiApp for EndpointApp {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        if let Err(err) = self.guards.check(&scope) {
            return Box::pin(async move { Err(err) });
        }
        match &self.endpoint {
            Endpoint::Http(handler) => Box::pin(async move {
                let method = scope.method;
                let request = Request::new(scope, Arc::clone(&receive), self.max_body_size);
                let response = handler.call(ctx.clone(), request).await?;
                response.send(ctx, method, receive, send).await
            }),
            Endpoint::WebSocket(handler) => {
                let socket = WebSocket::new(scope, receive, send);
                let fut = handler.call(ctx.clone(), socket);
                Box::pin(fut)
            }
            Endpoint::Asgi(app) => app.call(ctx, scope, receive, send),
        }
    }
}

/// A route handler declaration: path, handler kinds, endpoint and the
/// options, middleware and exception handlers that apply to it.
///
/// # Example
///
/// ```ignore
/// let handler = RouteHandler::get("/items/{item_id:int}", get_item)
///     .name("get_item")
///     .opt("cache", true)
///     .middleware(RequestLogger::new());
/// ```
#[derive(Clone)]
pub struct RouteHandler {
    pub(crate) path: String,
    pub(crate) kinds: Vec<HandlerKind>,
    pub(crate) endpoint: Endpoint,
    pub(crate) mount: MountKind,
    pub(crate) name: Option<String>,
    pub(crate) opt: Opt,
    pub(crate) middleware: MiddlewareStack,
    pub(crate) exception_handlers: ExceptionHandlers,
    pub(crate) guards: Guards,
}

impl std::fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteHandler")
            .field("path", &self.path)
            .field("kinds", &self.kinds)
            .field("mount", &self.mount)
            .field("name", &self.name)
            .field("guards", &self.guards.len())
            .finish_non_exhaustive()
    }
}

impl RouteHandler {
    fn from_endpoint(path: &str, kinds: Vec<HandlerKind>, endpoint: Endpoint) -> Self {
        Self {
            path: path.to_string(),
            kinds,
            endpoint,
            mount: MountKind::None,
            name: None,
            opt: Opt::new(),
            middleware: MiddlewareStack::new(),
            exception_handlers: ExceptionHandlers::new(),
            guards: Guards::new(),
        }
    }

    /// An HTTP handler for several methods.
    pub fn http<H: Handler + 'static>(path: &str, methods: &[Method], handler: H) -> Self {
        let kinds = methods.iter().copied().map(HandlerKind::Http).collect();
        Self::from_endpoint(path, kinds, Endpoint::Http(Arc::new(handler)))
    }

    /// A GET handler (also serving HEAD).
    pub fn get<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::http(path, &[Method::Get], handler)
    }

    /// A POST handler.
    pub fn post<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::http(path, &[Method::Post], handler)
    }

    /// A PUT handler.
    pub fn put<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::http(path, &[Method::Put], handler)
    }

    /// A PATCH handler.
    pub fn patch<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::http(path, &[Method::Patch], handler)
    }

    /// A DELETE handler.
    pub fn delete<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::http(path, &[Method::Delete], handler)
    }

    /// A synchronous handler run off the async executor.
    pub fn blocking<F>(path: &str, methods: &[Method], func: F) -> Self
    where
        F: Fn(Request) -> Result<Response, Error> + Send + Sync + 'static,
    {
        Self::http(path, methods, BlockingHandler::new(func))
    }

    /// A WebSocket handler.
    pub fn websocket<H: WebSocketHandler + 'static>(path: &str, handler: H) -> Self {
        Self::from_endpoint(
            path,
            vec![HandlerKind::WebSocket],
            Endpoint::WebSocket(Arc::new(handler)),
        )
    }

    /// A raw ASGI application owning exactly this path.
    pub fn asgi<A: AsgiApp + 'static>(path: &str, app: A) -> Self {
        Self::from_endpoint(path, vec![HandlerKind::Asgi], Endpoint::Asgi(Arc::new(app)))
    }

    /// A raw ASGI application receiving every path below `path`.
    ///
    /// The application sees the remaining path in `scope.path` and the mount
    /// prefix appended to `scope.root_path`.
    pub fn mount<A: AsgiApp + 'static>(path: &str, app: A) -> Self {
        let mut handler = Self::asgi(path, app);
        handler.mount = MountKind::Asgi;
        handler
    }

    /// Serve a directory below `path`.
    #[must_use]
    pub fn static_files(path: &str, files: StaticFiles) -> Self {
        let mut handler = Self::asgi(path, files);
        handler.mount = MountKind::Static;
        handler
    }

    /// Set the unique handler name used by `App::url_for`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set an option value.
    #[must_use]
    pub fn opt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.opt.insert(key.into(), value.into());
        self
    }

    /// Add a middleware layer applying to every connection of this handler.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(MiddlewareLayer::new(middleware));
        self
    }

    /// Add a middleware layer with exclusion rules.
    #[must_use]
    pub fn middleware_with<M: Middleware + 'static>(mut self, middleware: M, exclusion: Exclusion) -> Self {
        self.middleware
            .push(MiddlewareLayer::with_exclusion(middleware, exclusion));
        self
    }

    /// Register an exception handler for a status code.
    #[must_use]
    pub fn exception_handler<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn(&Scope, &crate::error::HttpError) -> Response + Send + Sync + 'static,
    {
        self.exception_handlers.register(status, handler);
        self
    }

    /// Add a guard run before the endpoint.
    #[must_use]
    pub fn guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Scope, &RouteInfo) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.guards.push(guard);
        self
    }

    /// The declared path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Handler kinds this declaration registers.
    #[must_use]
    pub fn kinds(&self) -> &[HandlerKind] {
        &self.kinds
    }

    /// The handler name.
    #[must_use]
    pub fn handler_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestClient;

    fn endpoint_client(handler: &RouteHandler) -> TestClient<EndpointApp> {
        TestClient::new(EndpointApp {
            endpoint: handler.endpoint.clone(),
            guards: handler.guards.clone(),
            max_body_size: 16,
        })
    }

    #[test]
    fn async_closure_handler() {
        let handler = RouteHandler::post("/echo", |_ctx: RequestContext, mut req: Request| async move {
            let body = req.text().await?;
            Ok::<_, Error>(format!("got {body}"))
        });
        let client = endpoint_client(&handler);
        let response = client.post("/echo").body("hi").send();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text(), "got hi");
    }

    #[test]
    fn body_limit_applies_to_handlers() {
        let handler = RouteHandler::post("/echo", |_ctx: RequestContext, mut req: Request| async move {
            req.body().await?;
            Ok::<_, Error>(Response::with_status(204))
        });
        let client = endpoint_client(&handler);
        let response = client.post("/echo").body(vec![b'x'; 64]).send();
        assert_eq!(response.error().map(|e| e.to_http().status()), Some(413));
    }

    #[test]
    fn blocking_handler_runs_on_a_thread() {
        let handler = RouteHandler::blocking("/sync", &[Method::Post], |req| {
            let name = std::thread::current().name().map(str::to_string);
            let body = String::from_utf8_lossy(req.cached_body().unwrap_or_default()).into_owned();
            Ok(Response::text(format!("{}:{body}", name.unwrap_or_default())))
        });
        let client = endpoint_client(&handler);
        let response = client.post("/sync").body("abc").send();
        assert_eq!(response.text(), "starlite-blocking:abc");
    }

    #[test]
    fn guards_run_before_the_endpoint() {
        let handler = RouteHandler::post("/echo", |_ctx: RequestContext, mut req: Request| async move {
            req.text().await
        })
        .guard(|scope, _| {
            if scope.headers.contains("x-token") {
                Ok(())
            } else {
                Err(crate::error::HttpError::forbidden().into())
            }
        });
        let client = endpoint_client(&handler);

        let rejected = client.post("/echo").body("hi").send();
        assert!(!rejected.started());
        assert_eq!(rejected.error().map(|e| e.to_http().status()), Some(403));
        assert_eq!(client.post("/echo").header("x-token", "t").body("hi").send().text(), "hi");
    }

    #[test]
    fn declaration_builders() {
        let handler = RouteHandler::http("/items", &[Method::Get, Method::Post], |_ctx: RequestContext, _req: Request| async {
            Ok::<_, Error>("ok")
        })
        .name("items")
        .opt("skip_auth", true);

        assert_eq!(handler.path(), "/items");
        assert_eq!(
            handler.kinds(),
            &[HandlerKind::Http(Method::Get), HandlerKind::Http(Method::Post)]
        );
        assert_eq!(handler.handler_name(), Some("items"));
        assert_eq!(handler.opt.get("skip_auth"), Some(&Value::Bool(true)));
    }
}
