//! Routing error types.
//!
//! Configuration errors surface while routes are registered and the trie is
//! validated; they are fatal and never caught by the framework. Routing
//! errors are produced per request and map onto 404/405 responses.

use starlite_types::HandlerKind;

use crate::r#match::AllowedMethods;

/// An invalid route table, detected before the application serves traffic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A `{...}` segment without exactly one `:` separator.
    #[error(
        "path parameters should be declared with a type using the pattern '{{parameter_name:type}}', \
         e.g. '/my-path/{{my_param:int}}' (got '{segment}' in '{path}')"
    )]
    MalformedParameter { path: String, segment: String },

    /// A parameter declared with an empty name.
    #[error("path parameter names should be of length greater than zero (in '{path}')")]
    EmptyParameterName { path: String },

    /// A parameter type keyword that is not supported.
    #[error(
        "path parameter '{name}' in '{path}' has unsupported type '{type_name}'; \
         allowed types are 'str', 'int', 'float', 'uuid' and 'path'"
    )]
    UnknownParameterType {
        path: String,
        name: String,
        type_name: String,
    },

    /// The same parameter name used twice in one path.
    #[error("duplicate parameter '{name}' detected in '{path}'")]
    DuplicateParameter { path: String, name: String },

    /// A `path` parameter followed by more segments.
    #[error("path parameter '{name}' of type 'path' must be the last segment of '{path}'")]
    PathParameterNotLast { path: String, name: String },

    /// Two routes declare different parameters at the same trie position.
    #[error("routes with conflicting path parameters at '{node}': '{{{existing}}}' and '{{{incoming}}}'")]
    ConflictingParameters {
        node: String,
        existing: String,
        incoming: String,
    },

    /// A handler of the same kind is already registered at the path.
    #[error("a {kind} handler is already registered for '{path}'")]
    DuplicateHandler { path: String, kind: HandlerKind },

    /// A registration without any handler.
    #[error("route '{path}' does not declare any handler")]
    EmptyRoute { path: String },

    /// A route handler name used by more than one handler.
    #[error("route handler names must be unique - '{name}' is not unique")]
    DuplicateHandlerName { name: String },

    /// An ASGI handler sharing its path with other handlers.
    #[error("ASGI handlers must have a unique path not shared by other route handlers (at '{path}')")]
    AsgiPathConflict { path: String },

    /// A path parameter registered beneath a mount.
    #[error("path parameters not allowed under a static/mount route (mount '{mount}', route '{path}')")]
    ParameterUnderMount { mount: String, path: String },

    /// A middleware exclusion pattern that does not compile.
    #[error("invalid middleware exclusion pattern '{pattern}': {message}")]
    InvalidExcludePattern { pattern: String, message: String },

    /// An unreadable or malformed configuration source.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A per-request routing failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// No route matches the path.
    #[error("not found")]
    NotFound,

    /// The path matched, but not for the requested method or scope type.
    #[error("method not allowed")]
    MethodNotAllowed { allowed: AllowedMethods },

    /// A path segment could not be converted to its declared type.
    #[error("unable to parse path parameter '{name}' from '{value}'")]
    InvalidParameter { name: String, value: String },
}

impl RouteError {
    /// HTTP status code used when converting this error into a response.
    ///
    /// An unconvertible segment is reported as 404: the request does not
    /// address any registered resource.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound | Self::InvalidParameter { .. } => 404,
            Self::MethodNotAllowed { .. } => 405,
        }
    }
}

/// Failure to build a URL from a route name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReverseError {
    /// No handler registered under the name.
    #[error("no route handler named '{0}'")]
    UnknownRoute(String),

    /// A parameter of the route was not supplied.
    #[error("missing value for path parameter '{name}' of route '{route}'")]
    MissingParameter { route: String, name: String },

    /// A supplied value does not fit the parameter type.
    #[error("value '{value}' is not valid for path parameter '{name}'")]
    InvalidParameter { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlite_types::Method;

    #[test]
    fn malformed_parameter_message_shows_pattern() {
        let err = ConfigError::MalformedParameter {
            path: "/a/{id}".into(),
            segment: "{id}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("{parameter_name:type}"));
        assert!(msg.contains("/a/{id}"));
    }

    #[test]
    fn route_error_status_codes() {
        assert_eq!(RouteError::NotFound.status_code(), 404);
        let err = RouteError::MethodNotAllowed {
            allowed: AllowedMethods::new(vec![Method::Get]),
        };
        assert_eq!(err.status_code(), 405);
        let err = RouteError::InvalidParameter {
            name: "id".into(),
            value: "abc".into(),
        };
        assert_eq!(err.status_code(), 404);
    }
}
