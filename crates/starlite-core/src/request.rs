//! HTTP request view over an ASGI scope and its `receive` channel.

use serde::de::DeserializeOwned;
use starlite_router::PathParams;
use starlite_types::Method;

use crate::asgi::{ReceiveEvent, RouteInfo, Scope, SharedReceiver};
use crate::error::{Error, HttpError};
use crate::headers::Headers;

/// Default maximum body size: 1MB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// An HTTP request.
///
/// The body is read lazily from `receive` on the first call to
/// [`Request::body`] and cached afterwards.
pub struct Request {
    scope: Scope,
    receive: SharedReceiver,
    max_body_size: usize,
    body: Option<Vec<u8>>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.scope.method)
            .field("path", &self.scope.path)
            .field("body_read", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Create a request over `scope` and `receive`.
    #[must_use]
    pub fn new(scope: Scope, receive: SharedReceiver, max_body_size: usize) -> Self {
        Self {
            scope,
            receive,
            max_body_size,
            body: None,
        }
    }

    /// The underlying scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.scope.method.unwrap_or(Method::Get)
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.scope.path
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.scope.headers
    }

    /// First value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.scope.headers.get(name)
    }

    /// Raw query string.
    #[must_use]
    pub fn query_string(&self) -> &str {
        &self.scope.query_string
    }

    /// First value of a query parameter. Values are not percent-decoded.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.scope
            .query_string
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Converted path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.scope.path_params
    }

    /// The matched route.
    #[must_use]
    pub fn route(&self) -> Option<&RouteInfo> {
        self.scope.route.as_deref()
    }

    /// The body, if it has already been read.
    #[must_use]
    pub fn cached_body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Read the full body.
    ///
    /// # Errors
    ///
    /// - 413 when the body exceeds the configured limit
    /// - [`Error::Disconnected`] when the client goes away mid-body
    pub async fn body(&mut self) -> Result<&[u8], Error> {
        if self.body.is_none() {
            let body = self.read_body().await?;
            self.body = Some(body);
        }
        Ok(self.body.as_deref().unwrap_or_default())
    }

    /// Read the body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String, Error> {
        let body = self.body().await?;
        String::from_utf8(body.to_vec())
            .map_err(|_| HttpError::bad_request().with_detail("request body is not valid UTF-8").into())
    }

    /// Read and deserialize a JSON body.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let body = self.body().await?;
        Ok(serde_json::from_slice(body)?)
    }

    async fn read_body(&self) -> Result<Vec<u8>, Error> {
        let too_large = || {
            HttpError::payload_too_large().with_detail(format!(
                "request body exceeds the limit of {} bytes",
                self.max_body_size
            ))
        };

        if let Some(length) = self
            .header("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if length > self.max_body_size {
                return Err(too_large().into());
            }
        }

        let mut body = Vec::new();
        loop {
            match self.receive.receive().await? {
                ReceiveEvent::HttpRequest {
                    body: chunk,
                    more_body,
                } => {
                    if body.len() + chunk.len() > self.max_body_size {
                        return Err(too_large().into());
                    }
                    body.extend_from_slice(&chunk);
                    if !more_body {
                        return Ok(body);
                    }
                }
                ReceiveEvent::HttpDisconnect => return Err(Error::Disconnected),
                other => {
                    tracing::debug!(event = other.event_type(), "ignoring event while reading body");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::MemoryReceiver;

    fn request(events: Vec<ReceiveEvent>, limit: usize) -> Request {
        let scope = Scope::http(Method::Post, "/upload?name=a.txt&flag");
        Request::new(scope, Arc::new(MemoryReceiver::new(events)), limit)
    }

    fn chunk(body: &[u8], more_body: bool) -> ReceiveEvent {
        ReceiveEvent::HttpRequest {
            body: body.to_vec(),
            more_body,
        }
    }

    #[test]
    fn body_is_assembled_from_chunks_and_cached() {
        let mut req = request(vec![chunk(b"hello ", true), chunk(b"world", false)], 1024);
        let body = futures_executor::block_on(req.body()).unwrap().to_vec();
        assert_eq!(body, b"hello world");
        assert_eq!(req.cached_body(), Some(&b"hello world"[..]));
        // Second read does not touch `receive`.
        let again = futures_executor::block_on(req.text()).unwrap();
        assert_eq!(again, "hello world");
    }

    #[test]
    fn oversized_body_is_rejected() {
        let mut req = request(vec![chunk(b"0123456789", false)], 4);
        let err = futures_executor::block_on(req.body()).unwrap_err();
        assert_eq!(err.to_http().status(), 413);
    }

    #[test]
    fn disconnect_mid_body() {
        let mut req = request(vec![chunk(b"part", true), ReceiveEvent::HttpDisconnect], 1024);
        let err = futures_executor::block_on(req.body()).unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn json_body() {
        let mut req = request(vec![chunk(br#"{"id": 3}"#, false)], 1024);
        let value: serde_json::Value = futures_executor::block_on(req.json()).unwrap();
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn query_params() {
        let req = request(Vec::new(), 1024);
        assert_eq!(req.query_param("name"), Some("a.txt"));
        assert_eq!(req.query_param("flag"), Some(""));
        assert_eq!(req.query_param("missing"), None);
        assert_eq!(req.method(), Method::Post);
    }
}
