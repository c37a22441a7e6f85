//! Dispatch error types.
//!
//! Handlers and middleware return [`Error`]; the exception boundary turns it
//! into well-formed ASGI output so that one bad request never takes down the
//! serving loop.

use serde_json::Value;
use starlite_router::RouteError;

use crate::context::CancelledError;
use crate::headers::Headers;
use crate::response::reason_phrase;

/// An error carrying an HTTP status code.
///
/// Rendered as `{"status_code": .., "detail": .., "extra": ..}`.
///
/// # Example
///
/// ```
/// use starlite_core::HttpError;
///
/// let err = HttpError::new(409)
///     .with_detail("item already exists")
///     .with_header("retry-after", "10");
/// assert_eq!(err.status(), 409);
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{status}: {detail}")]
pub struct HttpError {
    status: u16,
    detail: String,
    headers: Headers,
    extra: Option<Value>,
}

impl HttpError {
    /// Create an error whose detail is the reason phrase of `status`.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            detail: reason_phrase(status).to_string(),
            headers: Headers::new(),
            extra: None,
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(400)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(403)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// 413 Payload Too Large.
    #[must_use]
    pub fn payload_too_large() -> Self {
        Self::new(413)
    }

    /// 429 Too Many Requests.
    #[must_use]
    pub fn too_many_requests() -> Self {
        Self::new(429)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(500)
    }

    /// Replace the detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Attach extra structured data to the rendered body.
    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Human readable detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Headers added to the rendered response.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Extra structured data.
    #[must_use]
    pub fn extra(&self) -> Option<&Value> {
        self.extra.as_ref()
    }
}

impl From<RouteError> for HttpError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::MethodNotAllowed { allowed } => {
                Self::new(405).with_header("allow", allowed.header_value())
            }
            RouteError::NotFound | RouteError::InvalidParameter { .. } => Self::not_found(),
        }
    }
}

/// An error that closes a WebSocket with a specific close code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("websocket error {code}: {reason}")]
pub struct WebSocketError {
    /// Close code sent to the client.
    pub code: u16,
    /// Close reason.
    pub reason: String,
}

impl WebSocketError {
    /// Create a WebSocket error.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Any failure raised while serving a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An HTTP error with status, detail and headers.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A WebSocket error with a close code.
    #[error(transparent)]
    WebSocket(#[from] WebSocketError),

    /// The path did not resolve.
    #[error(transparent)]
    Routing(#[from] RouteError),

    /// The client went away.
    #[error("client disconnected")]
    Disconnected,

    /// The connection context was cancelled.
    #[error(transparent)]
    Cancelled(#[from] CancelledError),

    /// Anything else; rendered as 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error from any displayable value.
    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(message.to_string())
    }

    /// Returns `true` when the client is gone and nothing can be sent.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Cancelled(_))
    }

    /// The HTTP view of this error.
    #[must_use]
    pub fn to_http(&self) -> HttpError {
        match self {
            Self::Http(err) => err.clone(),
            Self::Routing(err) => err.clone().into(),
            Self::WebSocket(_) | Self::Disconnected | Self::Cancelled(_) | Self::Internal(_) => {
                HttpError::internal()
            }
        }
    }

    /// The close code used when this error ends a WebSocket connection.
    ///
    /// WebSocket errors carry their own code; everything else maps to
    /// `4000 + status`.
    #[must_use]
    pub fn websocket_close_code(&self) -> u16 {
        match self {
            Self::WebSocket(err) => err.code,
            other => 4000u16.saturating_add(other.to_http().status()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(HttpError::bad_request().with_detail(err.to_string()))
    }
}
