//! Shared types for the starlite_rust framework.
//!
//! This crate provides the vocabulary shared by the router and the dispatch
//! layer, enabling clean dependency ordering without cycles:
//!
//! - [`Method`]: HTTP request methods
//! - [`ScopeType`]: the kind of connection described by an ASGI scope
//! - [`HandlerKind`]: the key under which a handler is stored on a trie node

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET method.
    Get,
    /// HEAD method.
    Head,
    /// POST method.
    Post,
    /// PUT method.
    Put,
    /// PATCH method.
    Patch,
    /// DELETE method.
    Delete,
    /// OPTIONS method.
    Options,
    /// TRACE method.
    Trace,
}

impl Method {
    /// All methods in canonical order.
    pub const ALL: [Method; 8] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
        Self::Trace,
    ];

    /// Parse method from bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Self::Get),
            b"HEAD" => Some(Self::Head),
            b"POST" => Some(Self::Post),
            b"PUT" => Some(Self::Put),
            b"PATCH" => Some(Self::Patch),
            b"DELETE" => Some(Self::Delete),
            b"OPTIONS" => Some(Self::Options),
            b"TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Return the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown HTTP method: {}", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.to_ascii_uppercase().as_bytes()).ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// The connection type described by an ASGI scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// A single HTTP request/response exchange.
    Http,
    /// A WebSocket session.
    #[serde(rename = "websocket")]
    WebSocket,
    /// Application startup/shutdown events.
    Lifespan,
}

impl ScopeType {
    /// Return the ASGI name of the scope type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
            Self::Lifespan => "lifespan",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key under which a handler is registered on a route.
///
/// HTTP handlers are keyed by method, WebSocket handlers share one key, and
/// `Asgi` marks a catch-all ASGI application that owns its path exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    /// An HTTP handler for one method.
    Http(Method),
    /// A WebSocket handler.
    WebSocket,
    /// A raw ASGI application (including mounts).
    Asgi,
}

impl HandlerKind {
    /// Returns the HTTP method, if this is an HTTP handler key.
    #[must_use]
    pub fn method(self) -> Option<Method> {
        match self {
            Self::Http(method) => Some(method),
            _ => None,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(method) => f.write_str(method.as_str()),
            Self::WebSocket => f.write_str("websocket"),
            Self::Asgi => f.write_str("asgi"),
        }
    }
}
