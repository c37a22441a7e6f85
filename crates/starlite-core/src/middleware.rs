//! Middleware composition.
//!
//! A middleware sits in front of an [`AsgiApp`] and receives the connection
//! together with a `next` application. It may:
//!
//! - modify the [`Scope`] before delegating,
//! - wrap `send` to observe or rewrite outgoing events,
//! - short-circuit by answering the connection itself or returning an error.
//!
//! Built in: [`AddResponseHeader`], [`RequireHeader`], [`AllowedHosts`],
//! [`RateLimit`] and [`RequestLogger`].
//!
//! Stacks are composed once at startup. For a route handler the order is
//! application middleware, then router middleware (outermost router first),
//! then handler middleware, with the handler innermost. The first
//! middleware registered on the application therefore sees the connection
//! first.
//!
//! # Exclusion
//!
//! Each middleware layer carries an [`Exclusion`]: the scope types it
//! applies to, path patterns it skips and an `opt` key which, when truthy on
//! the matched route handler, skips the middleware for that route.
//!
//! # Example
//!
//! ```ignore
//! let app = App::builder()
//!     .middleware(AddResponseHeader::new("x-powered-by", "starlite"))
//!     .middleware_with(
//!         RequireHeader::new("authorization"),
//!         Exclusion::new().exclude("^/health").exclude_opt_key("no_auth"),
//!     )
//!     .route(RouteHandler::get("/health", health))
//!     .build()?;
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use regex::RegexSet;
use serde_json::Value;
use starlite_router::ConfigError;
use starlite_types::ScopeType;

use crate::asgi::{
    AsgiApp, BoxFuture, Scope, SendEvent, Sender, SharedReceiver, SharedSender,
};
use crate::context::RequestContext;
use crate::error::{Error, HttpError};

/// A component wrapping an ASGI application.
pub trait Middleware: Send + Sync {
    /// Handle one connection, delegating to `next` to continue the chain.
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
        next: &'a dyn AsgiApp,
    ) -> BoxFuture<'a, Result<(), Error>>;

    /// Returns the middleware name for debugging and logging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// When a middleware layer is skipped.
#[derive(Debug, Clone)]
pub struct Exclusion {
    scopes: Vec<ScopeType>,
    patterns: Vec<String>,
    opt_key: Option<String>,
}

impl Default for Exclusion {
    fn default() -> Self {
        Self {
            scopes: vec![ScopeType::Http, ScopeType::WebSocket],
            patterns: Vec::new(),
            opt_key: None,
        }
    }
}

impl Exclusion {
    /// Apply to HTTP and WebSocket scopes, exclude nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the middleware to the given scope types.
    #[must_use]
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = ScopeType>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    /// Skip paths matching a regular expression.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Skip route handlers whose `opt` holds a truthy value under `key`.
    #[must_use]
    pub fn exclude_opt_key(mut self, key: impl Into<String>) -> Self {
        self.opt_key = Some(key.into());
        self
    }

    /// Compile the path patterns.
    pub fn compile(&self) -> Result<CompiledExclusion, ConfigError> {
        let patterns = if self.patterns.is_empty() {
            None
        } else {
            Some(
                RegexSet::new(&self.patterns).map_err(|err| ConfigError::InvalidExcludePattern {
                    pattern: self.patterns.join("|"),
                    message: err.to_string(),
                })?,
            )
        };
        Ok(CompiledExclusion {
            scopes: self.scopes.clone(),
            patterns,
            opt_key: self.opt_key.clone(),
        })
    }
}

/// An [`Exclusion`] with compiled path patterns.
#[derive(Debug, Clone)]
pub struct CompiledExclusion {
    scopes: Vec<ScopeType>,
    patterns: Option<RegexSet>,
    opt_key: Option<String>,
}

impl CompiledExclusion {
    /// Returns `true` if the middleware must be skipped for `scope`.
    #[must_use]
    pub fn should_bypass(&self, scope: &Scope) -> bool {
        if !self.scopes.contains(&scope.scope_type) {
            return true;
        }

        if let (Some(key), Some(opt)) = (&self.opt_key, scope.route_opt()) {
            if opt.get(key).is_some_and(is_truthy) {
                return true;
            }
        }

        self.patterns
            .as_ref()
            .is_some_and(|set| set.is_match(&scope.path))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A middleware paired with its exclusion rules.
#[derive(Clone)]
pub struct MiddlewareLayer {
    middleware: Arc<dyn Middleware>,
    exclusion: Exclusion,
}

impl std::fmt::Debug for MiddlewareLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareLayer")
            .field("middleware", &self.middleware.name())
            .field("exclusion", &self.exclusion)
            .finish()
    }
}

impl MiddlewareLayer {
    /// Layer applying to every HTTP and WebSocket connection.
    pub fn new<M: Middleware + 'static>(middleware: M) -> Self {
        Self::with_exclusion(middleware, Exclusion::new())
    }

    /// Layer with explicit exclusion rules.
    pub fn with_exclusion<M: Middleware + 'static>(middleware: M, exclusion: Exclusion) -> Self {
        Self {
            middleware: Arc::new(middleware),
            exclusion,
        }
    }

    /// Wrap `inner` with this layer.
    pub fn wrap(&self, inner: Arc<dyn AsgiApp>) -> Result<Layered, ConfigError> {
        Ok(Layered {
            middleware: Arc::clone(&self.middleware),
            exclusion: self.exclusion.compile()?,
            inner,
        })
    }
}

/// An application wrapped by one middleware.
pub struct Layered {
    middleware: Arc<dyn Middleware>,
    exclusion: CompiledExclusion,
    inner: Arc<dyn AsgiApp>,
}

impl AsgiApp for Layered {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            ctx.checkpoint()?;
            if self.exclusion.should_bypass(&scope) {
                tracing::trace!(
                    middleware = self.middleware.name(),
                    path = %scope.path,
                    "middleware bypassed"
                );
                return self.inner.call(ctx, scope, receive, send).await;
            }
            self.middleware
                .call(ctx, scope, receive, send, self.inner.as_ref())
                .await
        })
    }
}

/// An ordered list of middleware layers.
///
/// The first layer pushed is the outermost.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareStack {
    layers: Vec<MiddlewareLayer>,
}

impl MiddlewareStack {
    /// Creates an empty middleware stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer to the inner end of the stack.
    pub fn push(&mut self, layer: MiddlewareLayer) {
        self.layers.push(layer);
    }

    /// Adds every layer of `other` inside the existing ones.
    pub fn extend(&mut self, other: &MiddlewareStack) {
        self.layers.extend(other.layers.iter().cloned());
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if there are no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wrap `app` so that the first layer runs first.
    pub fn wrap(&self, app: Arc<dyn AsgiApp>) -> Result<Arc<dyn AsgiApp>, ConfigError> {
        self.layers
            .iter()
            .rev()
            .try_fold(app, |inner, layer| Ok(Arc::new(layer.wrap(inner)?) as Arc<dyn AsgiApp>))
    }
}

// ============================================================================
// Built-in middleware
// ============================================================================

/// Adds a header to every HTTP response.
#[derive(Debug, Clone)]
pub struct AddResponseHeader {
    name: String,
    value: String,
}

impl AddResponseHeader {
    /// Create the middleware.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

struct HeaderInjectingSender {
    inner: SharedSender,
    name: String,
    value: String,
}

impl Sender for HeaderInjectingSender {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, Result<(), Error>> {
        let event = match event {
            SendEvent::HttpResponseStart {
                status,
                mut headers,
            } => {
                headers.append(self.name.clone(), self.value.clone());
                SendEvent::HttpResponseStart { status, headers }
            }
            other => other,
        };
        self.inner.send(event)
    }
}

impl Middleware for AddResponseHeader {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
        next: &'a dyn AsgiApp,
    ) -> BoxFuture<'a, Result<(), Error>> {
        let send: SharedSender = Arc::new(HeaderInjectingSender {
            inner: send,
            name: self.name.clone(),
            value: self.value.clone(),
        });
        next.call(ctx, scope, receive, send)
    }

    fn name(&self) -> &'static str {
        "AddResponseHeader"
    }
}

/// Rejects connections that lack a request header with 400.
#[derive(Debug, Clone)]
pub struct RequireHeader {
    header: String,
}

impl RequireHeader {
    /// Create the middleware.
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Middleware for RequireHeader {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
        next: &'a dyn AsgiApp,
    ) -> BoxFuture<'a, Result<(), Error>> {
        if scope.headers.contains(&self.header) {
            return next.call(ctx, scope, receive, send);
        }
        let detail = format!("missing required header: {}", self.header);
        Box::pin(async move { Err(HttpError::bad_request().with_detail(detail).into()) })
    }

    fn name(&self) -> &'static str {
        "RequireHeader"
    }
}

/// Logs one `tracing` event per HTTP request with status and duration.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger;

impl RequestLogger {
    /// Create the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct StatusRecorder {
    inner: SharedSender,
    status: Mutex<Option<u16>>,
}

impl Sender for StatusRecorder {
    fn send(&self, event: SendEvent) -> BoxFuture<'_, Result<(), Error>> {
        if let SendEvent::HttpResponseStart { status, .. } = &event {
            *self.status.lock() = Some(*status);
        }
        self.inner.send(event)
    }
}

impl Middleware for RequestLogger {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
        next: &'a dyn AsgiApp,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = scope.method.map_or("-", |m| m.as_str());
            let path = scope.path.clone();
            let recorder = Arc::new(StatusRecorder {
                inner: send,
                status: Mutex::new(None),
            });

            let result = next.call(ctx, scope, receive, recorder.clone()).await;
            let status = *recorder.status.lock();
            let elapsed_ms = start.elapsed().as_millis();

            match &result {
                Ok(()) => tracing::info!(
                    request_id = ctx.request_id(),
                    method,
                    path = %path,
                    status = status.unwrap_or(0),
                    elapsed_ms,
                    "request completed"
                ),
                Err(err) => tracing::warn!(
                    request_id = ctx.request_id(),
                    method,
                    path = %path,
                    error = %err,
                    elapsed_ms,
                    "request failed"
                ),
            }
            result
        })
    }

    fn name(&self) -> &'static str {
        "RequestLogger"
    }
}

/// Rejects connections whose `host` header is not in an allow list.
///
/// Entries are exact host names (`example.com`), wildcard subdomains
/// (`*.example.com`, which does not match `example.com` itself) or `*` to
/// allow every host. Ports are ignored. `x-forwarded-host` is consulted
/// when `host` is missing. Mismatches are rejected with 400.
#[derive(Debug, Clone)]
pub struct AllowedHosts {
    exact: Vec<String>,
    suffixes: Vec<String>,
    any: bool,
}

impl AllowedHosts {
    /// Create the middleware from host patterns.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = Self {
            exact: Vec::new(),
            suffixes: Vec::new(),
            any: false,
        };
        for host in hosts {
            let host = host.as_ref().trim().to_ascii_lowercase();
            if host == "*" {
                allowed.any = true;
            } else if let Some(domain) = host.strip_prefix("*.") {
                allowed.suffixes.push(format!(".{domain}"));
            } else {
                allowed.exact.push(host);
            }
        }
        allowed
    }

    /// Returns `true` if `host` (without port) is allowed.
    #[must_use]
    pub fn is_allowed(&self, host: &str) -> bool {
        if self.any {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.exact.iter().any(|allowed| *allowed == host)
            || self
                .suffixes
                .iter()
                .any(|suffix| host.len() > suffix.len() && host.ends_with(suffix.as_str()))
    }
}

/// The host name of a request, without port.
fn request_host(scope: &Scope) -> &str {
    let raw = scope
        .headers
        .get("host")
        .or_else(|| scope.headers.get("x-forwarded-host"))
        .unwrap_or("")
        .trim();
    if raw.starts_with('[') {
        return raw.split_inclusive(']').next().unwrap_or(raw);
    }
    raw.split(':').next().unwrap_or(raw)
}

impl Middleware for AllowedHosts {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
        next: &'a dyn AsgiApp,
    ) -> BoxFuture<'a, Result<(), Error>> {
        let host = request_host(&scope);
        if !host.is_empty() && self.is_allowed(host) {
            return next.call(ctx, scope, receive, send);
        }
        tracing::debug!(host, path = %scope.path, "rejected host");
        Box::pin(async move { Err(HttpError::bad_request().with_detail("invalid host header").into()) })
    }

    fn name(&self) -> &'static str {
        "AllowedHosts"
    }
}

/// Window of a [`RateLimit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    /// One second.
    Second,
    /// One minute.
    Minute,
    /// One hour.
    Hour,
    /// One day.
    Day,
}

impl RateUnit {
    /// Length of the window.
    #[must_use]
    pub fn duration(self) -> Duration {
        Duration::from_secs(match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        })
    }
}

/// Limits HTTP requests per client within a sliding window.
///
/// Clients are identified by `x-forwarded-for`, then `x-real-ip`; requests
/// carrying neither share one `anonymous` bucket. Request history is kept in
/// process. A client over the limit gets 429 with a `retry-after` header
/// counting the seconds until its oldest request leaves the window.
#[derive(Debug)]
pub struct RateLimit {
    unit: RateUnit,
    max_requests: usize,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimit {
    /// Allow `max_requests` per `unit` and client.
    #[must_use]
    pub fn new(unit: RateUnit, max_requests: usize) -> Self {
        Self {
            unit,
            max_requests,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `client` at `now`.
    ///
    /// Returns the time to wait when the client is over the limit.
    fn admit(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let window = self.unit.duration();
        let mut history = self.history.lock();
        history.retain(|_, seen| {
            while seen
                .front()
                .is_some_and(|at| now.saturating_duration_since(*at) >= window)
            {
                seen.pop_front();
            }
            !seen.is_empty()
        });

        let seen = history.entry(client.to_string()).or_default();
        if seen.len() >= self.max_requests {
            let wait = seen
                .front()
                .map_or(window, |oldest| window.saturating_sub(now.saturating_duration_since(*oldest)));
            return Err(wait);
        }
        seen.push_back(now);
        Ok(())
    }
}

fn client_key(scope: &Scope) -> &str {
    scope
        .headers
        .get("x-forwarded-for")
        .or_else(|| scope.headers.get("x-real-ip"))
        .unwrap_or("anonymous")
}

impl Middleware for RateLimit {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
        next: &'a dyn AsgiApp,
    ) -> BoxFuture<'a, Result<(), Error>> {
        if scope.scope_type != ScopeType::Http {
            return next.call(ctx, scope, receive, send);
        }
        let client = client_key(&scope);
        if let Err(wait) = self.admit(client, Instant::now()) {
            let seconds = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            tracing::debug!(client, path = %scope.path, retry_after = seconds, "rate limit exceeded");
            let err = HttpError::too_many_requests().with_header("retry-after", seconds.to_string());
            return Box::pin(async move { Err(err.into()) });
        }
        next.call(ctx, scope, receive, send)
    }

    fn name(&self) -> &'static str {
        "RateLimit"
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;
    use starlite_types::Method;

    use super::*;
    use crate::asgi::RouteInfo;
    use crate::response::Response;
    use crate::testing::TestClient;

    /// Innermost app answering 200 with the path it saw.
    struct Echo;

    impl AsgiApp for Echo {
        fn call<'a>(
            &'a self,
            ctx: &'a RequestContext,
            scope: Scope,
            receive: SharedReceiver,
            send: SharedSender,
        ) -> BoxFuture<'a, Result<(), Error>> {
            Box::pin(async move {
                Response::text(scope.path.clone())
                    .send(ctx, scope.method, receive, send)
                    .await
            })
        }
    }

    /// Records its name into a shared log before and after `next`.
    struct Trace {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Trace {
        fn call<'a>(
            &'a self,
            ctx: &'a RequestContext,
            scope: Scope,
            receive: SharedReceiver,
            send: SharedSender,
            next: &'a dyn AsgiApp,
        ) -> BoxFuture<'a, Result<(), Error>> {
            Box::pin(async move {
                self.log.lock().push(format!("{}:before", self.label));
                let result = next.call(ctx, scope, receive, send).await;
                self.log.lock().push(format!("{}:after", self.label));
                result
            })
        }
    }

    fn scope_with_opt(path: &str, opt: serde_json::Value) -> Scope {
        let mut scope = Scope::http(Method::Get, path);
        let serde_json::Value::Object(map) = opt else {
            panic!("opt must be an object");
        };
        scope.route = Some(Arc::new(RouteInfo {
            opt: Arc::new(map),
            ..RouteInfo::default()
        }));
        scope
    }

    #[test]
    fn first_layer_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = MiddlewareStack::new();
        stack.push(MiddlewareLayer::new(Trace {
            label: "outer",
            log: Arc::clone(&log),
        }));
        stack.push(MiddlewareLayer::new(Trace {
            label: "inner",
            log: Arc::clone(&log),
        }));
        let app = stack.wrap(Arc::new(Echo)).unwrap();

        let client = TestClient::new(app);
        assert_eq!(client.get("/x").send().status(), 200);
        assert_eq!(
            *log.lock(),
            vec!["outer:before", "inner:before", "inner:after", "outer:after"]
        );
    }

    #[test]
    fn exclusion_by_scope_type() {
        let only_ws = Exclusion::new().scopes([ScopeType::WebSocket]).compile().unwrap();
        assert!(only_ws.should_bypass(&Scope::http(Method::Get, "/")));
        assert!(!only_ws.should_bypass(&Scope::websocket("/")));
    }

    #[test]
    fn exclusion_by_path_pattern() {
        let exclusion = Exclusion::new().exclude("^/health").exclude("/metrics$").compile().unwrap();
        assert!(exclusion.should_bypass(&Scope::http(Method::Get, "/health/live")));
        assert!(exclusion.should_bypass(&Scope::http(Method::Get, "/internal/metrics")));
        assert!(!exclusion.should_bypass(&Scope::http(Method::Get, "/items")));
    }

    #[test]
    fn exclusion_by_opt_key() {
        let exclusion = Exclusion::new().exclude_opt_key("skip_auth").compile().unwrap();
        assert!(exclusion.should_bypass(&scope_with_opt("/a", json!({"skip_auth": true}))));
        assert!(!exclusion.should_bypass(&scope_with_opt("/a", json!({"skip_auth": false}))));
        assert!(!exclusion.should_bypass(&scope_with_opt("/a", json!({"skip_auth": ""}))));
        assert!(exclusion.should_bypass(&scope_with_opt("/a", json!({"skip_auth": 1}))));
        assert!(!exclusion.should_bypass(&scope_with_opt("/a", json!({}))));
        assert!(!exclusion.should_bypass(&Scope::http(Method::Get, "/a")));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = Exclusion::new().exclude("(unclosed").compile().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExcludePattern { .. }));
    }

    #[test]
    fn add_response_header_wraps_send() {
        let mut stack = MiddlewareStack::new();
        stack.push(MiddlewareLayer::new(AddResponseHeader::new("X-Frame-Options", "DENY")));
        let client = TestClient::new(stack.wrap(Arc::new(Echo)).unwrap());

        let response = client.get("/page").send();
        assert_eq!(response.header("x-frame-options"), Some("DENY"));
        assert_eq!(response.text(), "/page");
    }

    #[test]
    fn require_header_short_circuits() {
        let mut stack = MiddlewareStack::new();
        stack.push(MiddlewareLayer::new(RequireHeader::new("x-api-key")));
        let client = TestClient::new(stack.wrap(Arc::new(Echo)).unwrap());

        let rejected = client.get("/secret").send();
        assert!(!rejected.started());
        assert_eq!(
            rejected.error().map(|e| e.to_http().status()),
            Some(400)
        );

        let accepted = client.get("/secret").header("X-Api-Key", "k").send();
        assert_eq!(accepted.status(), 200);
    }

    #[test]
    fn request_logger_passes_through() {
        let mut stack = MiddlewareStack::new();
        stack.push(MiddlewareLayer::new(RequestLogger::new()));
        let client = TestClient::new(stack.wrap(Arc::new(Echo)).unwrap());
        assert_eq!(client.get("/logged").send().text(), "/logged");
    }
    #[test]
    fn allowed_hosts_patterns() {
        let hosts = AllowedHosts::new(["example.com", "*.api.example.com"]);
        assert!(hosts.is_allowed("example.com"));
        assert!(hosts.is_allowed("EXAMPLE.com"));
        assert!(hosts.is_allowed("v1.api.example.com"));
        assert!(!hosts.is_allowed("api.example.com"));
        assert!(!hosts.is_allowed("badexample.com"));
        assert!(!hosts.is_allowed("example.org"));
        assert!(AllowedHosts::new(["*"]).is_allowed("anything.test"));
    }

    #[test]
    fn allowed_hosts_rejects_unknown_hosts() {
        let mut stack = MiddlewareStack::new();
        stack.push(MiddlewareLayer::new(AllowedHosts::new(["example.com", "*.example.com"])));
        let client = TestClient::new(stack.wrap(Arc::new(Echo)).unwrap());

        assert_eq!(client.get("/").header("Host", "example.com:8080").send().status(), 200);
        assert_eq!(client.get("/").header("Host", "www.example.com").send().status(), 200);
        assert_eq!(
            client.get("/").header("X-Forwarded-Host", "cdn.example.com").send().status(),
            200
        );

        let rejected = client.get("/").header("Host", "evil.test").send();
        let err = rejected.error().map(Error::to_http);
        assert_eq!(err.as_ref().map(HttpError::status), Some(400));
        assert_eq!(err.as_ref().map(HttpError::detail), Some("invalid host header"));
        assert_eq!(client.get("/").send().error().map(|e| e.to_http().status()), Some(400));
    }

    #[test]
    fn rate_limit_window() {
        let limit = RateLimit::new(RateUnit::Minute, 2);
        let start = Instant::now();
        assert!(limit.admit("a", start).is_ok());
        assert!(limit.admit("a", start + Duration::from_secs(10)).is_ok());

        let wait = limit.admit("a", start + Duration::from_secs(20)).unwrap_err();
        assert_eq!(wait, Duration::from_secs(40));
        assert!(limit.admit("b", start + Duration::from_secs(20)).is_ok());

        assert!(limit.admit("a", start + Duration::from_secs(60)).is_ok());
        assert!(limit.admit("a", start + Duration::from_secs(61)).is_err());
    }

    #[test]
    fn rate_limit_rejects_with_retry_after() {
        let mut stack = MiddlewareStack::new();
        stack.push(MiddlewareLayer::new(RateLimit::new(RateUnit::Hour, 1)));
        let client = TestClient::new(stack.wrap(Arc::new(Echo)).unwrap());

        let first = client.get("/a").header("X-Real-IP", "10.0.0.1").send();
        assert_eq!(first.status(), 200);

        let second = client.get("/a").header("X-Real-IP", "10.0.0.1").send();
        assert!(!second.started());
        let err = second.error().map(Error::to_http).unwrap();
        assert_eq!(err.status(), 429);
        let retry_after: u64 = err.headers().get("retry-after").unwrap().parse().unwrap();
        assert!(retry_after > 3_500 && retry_after <= 3_600);

        let other = client.get("/a").header("X-Real-IP", "10.0.0.2").send();
        assert_eq!(other.status(), 200);
    }
}
