//! Route registrations and the handler name index.

use std::collections::HashMap;

use starlite_types::HandlerKind;

use crate::error::{ConfigError, ReverseError};
use crate::path::{Converter, ParsedPath, PathSegment};

/// How a route owns the path below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountKind {
    /// An ordinary route: the full path must match.
    #[default]
    None,
    /// A generic ASGI mount: the remaining path is forwarded as-is.
    Asgi,
    /// A static-files mount: like [`MountKind::Asgi`], but literal routes
    /// registered below it still take priority.
    Static,
}

impl MountKind {
    /// Returns `true` for either mount flavour.
    #[must_use]
    pub fn is_mount(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A route ready for insertion into the trie.
#[derive(Debug, Clone)]
pub struct RouteRegistration<H> {
    /// The parsed route path.
    pub path: ParsedPath,
    /// Handlers keyed by kind.
    pub handlers: Vec<(HandlerKind, H)>,
    /// Mount behaviour.
    pub mount: MountKind,
}

impl<H> RouteRegistration<H> {
    /// Parse `path` and create a registration without handlers.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_parsed(ParsedPath::parse(path)?))
    }

    /// Create a registration from an already parsed path.
    #[must_use]
    pub fn from_parsed(path: ParsedPath) -> Self {
        Self {
            path,
            handlers: Vec::new(),
            mount: MountKind::None,
        }
    }

    /// Add a handler.
    #[must_use]
    pub fn handler(mut self, kind: HandlerKind, handler: H) -> Self {
        self.handlers.push((kind, handler));
        self
    }

    /// Register `handler` as a mount of the given kind.
    #[must_use]
    pub fn mount(mut self, kind: MountKind, handler: H) -> Self {
        self.mount = kind;
        self.handlers.push((HandlerKind::Asgi, handler));
        self
    }
}

/// Index of route handler names, used for reverse URL lookups.
#[derive(Debug, Clone, Default)]
pub struct RouteIndex {
    routes: HashMap<String, ParsedPath>,
}

impl RouteIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the path of a named handler. Names must be unique.
    pub fn insert(&mut self, name: impl Into<String>, path: ParsedPath) -> Result<(), ConfigError> {
        let name = name.into();
        if self.routes.contains_key(&name) {
            return Err(ConfigError::DuplicateHandlerName { name });
        }
        self.routes.insert(name, path);
        Ok(())
    }

    /// Look up the parsed path of a named handler.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParsedPath> {
        self.routes.get(name)
    }

    /// Build the URL path of a named handler from parameter values.
    ///
    /// Values are checked against the declared converters; only `path`
    /// parameters may contain slashes.
    pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError> {
        let parsed = self
            .routes
            .get(name)
            .ok_or_else(|| ReverseError::UnknownRoute(name.to_string()))?;

        let mut out = String::new();
        for segment in &parsed.segments {
            out.push('/');
            match segment {
                PathSegment::Literal(lit) => out.push_str(lit),
                PathSegment::Param(def) => {
                    let value = params
                        .iter()
                        .find(|(n, _)| *n == def.name)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| ReverseError::MissingParameter {
                            route: name.to_string(),
                            name: def.name.clone(),
                        })?;
                    let slash_ok = def.converter == Converter::Path;
                    if value.is_empty() || (!slash_ok && value.contains('/')) || !def.converter.matches(value) {
                        return Err(ReverseError::InvalidParameter {
                            name: def.name.clone(),
                            value: value.to_string(),
                        });
                    }
                    out.push_str(value.trim_matches('/'));
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }

    /// Number of named handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no handler is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
