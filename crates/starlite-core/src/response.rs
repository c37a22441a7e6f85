//! HTTP responses and the ASGI send loop.

use std::fmt;

use futures::StreamExt;
use futures::future::{self, Either, FutureExt};
use futures::stream::BoxStream;
use serde::Serialize;
use starlite_types::Method;

use crate::asgi::{ReceiveEvent, SendEvent, SharedReceiver, SharedSender};
use crate::context::RequestContext;
use crate::error::{Error, HttpError};
use crate::headers::Headers;

/// Response body.
pub enum ResponseBody {
    /// Empty body.
    Empty,
    /// A body known up front.
    Bytes(Vec<u8>),
    /// A body produced chunk by chunk.
    Stream(BoxStream<'static, Vec<u8>>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// An HTTP response.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: ResponseBody,
}

impl Default for Response {
    fn default() -> Self {
        Self::with_status(200)
    }
}

impl Response {
    /// Create an empty response with the given status.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: ResponseBody::Empty,
        }
    }

    /// A 200 `text/plain` response.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_status(200)
            .header("content-type", "text/plain; charset=utf-8")
            .body(body.into().into_bytes())
    }

    /// A 200 `text/html` response.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(body.into().into_bytes())
    }

    /// A 200 `application/json` response.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value).map_err(Error::internal)?;
        Ok(Self::with_status(200)
            .header("content-type", "application/json")
            .body(body))
    }

    /// A 200 streaming response.
    #[must_use]
    pub fn stream(chunks: BoxStream<'static, Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: ResponseBody::Stream(chunks),
        }
    }

    /// Set the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set a header, replacing existing values.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the body with fixed bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = ResponseBody::Bytes(body.into());
        self
    }

    /// Status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Response body.
    #[must_use]
    pub fn body_ref(&self) -> &ResponseBody {
        &self.body
    }

    /// Render an [`HttpError`] as the default JSON error body.
    #[must_use]
    pub fn from_http_error(err: &HttpError) -> Self {
        let mut content = serde_json::Map::new();
        content.insert("status_code".into(), err.status().into());
        content.insert("detail".into(), err.detail().into());
        if let Some(extra) = err.extra() {
            content.insert("extra".into(), extra.clone());
        }
        let body = serde_json::Value::Object(content).to_string();

        let mut response = Self::with_status(err.status())
            .header("content-type", "application/json")
            .body(body);
        response
            .headers
            .extend(err.headers().iter().map(|(n, v)| (n.to_string(), v.to_string())));
        response
    }

    /// Write this response through `send`.
    ///
    /// `HEAD` requests get the start event, including `content-length` for
    /// fixed bodies, followed by an empty body. Streaming bodies are raced
    /// against a disconnect listener on `receive`; a disconnect stops the
    /// stream and cancels `ctx`.
    pub async fn send(
        self,
        ctx: &RequestContext,
        method: Option<Method>,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> Result<(), Error> {
        let Self {
            status,
            mut headers,
            body,
        } = self;
        let head = method == Some(Method::Head);

        let bytes = match body {
            ResponseBody::Empty => Vec::new(),
            ResponseBody::Bytes(bytes) => bytes,
            ResponseBody::Stream(stream) => {
                send.send(SendEvent::HttpResponseStart { status, headers })
                    .await?;
                if head {
                    return send
                        .send(SendEvent::HttpResponseBody {
                            body: Vec::new(),
                            more_body: false,
                        })
                        .await;
                }
                return stream_body(ctx, stream, receive, send).await;
            }
        };

        if !headers.contains("content-length") {
            headers.insert("content-length", bytes.len().to_string());
        }
        send.send(SendEvent::HttpResponseStart { status, headers })
            .await?;
        send.send(SendEvent::HttpResponseBody {
            body: if head { Vec::new() } else { bytes },
            more_body: false,
        })
        .await
    }
}

async fn stream_body(
    ctx: &RequestContext,
    mut stream: BoxStream<'static, Vec<u8>>,
    receive: SharedReceiver,
    send: SharedSender,
) -> Result<(), Error> {
    let send_loop = async {
        while let Some(chunk) = stream.next().await {
            ctx.checkpoint()?;
            send.send(SendEvent::HttpResponseBody {
                body: chunk,
                more_body: true,
            })
            .await?;
        }
        send.send(SendEvent::HttpResponseBody {
            body: Vec::new(),
            more_body: false,
        })
        .await?;
        Ok::<(), Error>(())
    };

    let disconnect = async {
        loop {
            match receive.receive().await {
                Ok(ReceiveEvent::HttpDisconnect) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    match future::select(send_loop.boxed(), disconnect.boxed()).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => {
            tracing::debug!(
                request_id = ctx.request_id(),
                "client disconnected during streaming response"
            );
            ctx.cancel();
            Ok(())
        }
    }
}

/// Conversion into a [`Response`].
pub trait IntoResponse {
    /// Convert into a response.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::with_status(204)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        Response::from_http_error(&self)
    }
}

impl<T: IntoResponse> IntoResponse for (u16, T) {
    fn into_response(self) -> Response {
        self.1.into_response().status(self.0)
    }
}

/// JSON response wrapper.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match Response::json(&self.0) {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize JSON response");
                Response::from_http_error(&HttpError::internal())
            }
        }
    }
}

/// Canonical reason phrase for a status code.
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}

/// Content type for a file extension.
#[must_use]
pub fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
