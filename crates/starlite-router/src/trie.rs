//! Route trie and route insertion.

use std::collections::{BTreeMap, HashMap};

use starlite_types::{HandlerKind, Method};

use crate::error::{ConfigError, RouteError};
use crate::r#match::{RouteMatch, Target};
use crate::path::{Converter, ParamDef, PathSegment};
use crate::registry::{MountKind, RouteRegistration};

/// Key of a trie child: a literal segment or the shared parameter sentinel.
///
/// All parameters at one position share the sentinel, so a position cannot
/// branch into two differently named parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChildKey {
    /// A literal path segment.
    Literal(String),
    /// Any parameter segment.
    Parameter,
}

/// Trie node.
#[derive(Debug)]
pub struct TrieNode<H> {
    path: String,
    children: HashMap<ChildKey, TrieNode<H>>,
    param: Option<ParamDef>,
    handlers: BTreeMap<HandlerKind, H>,
    implied_head: bool,
    path_parameters: Vec<ParamDef>,
    is_mount: bool,
    is_static: bool,
    is_asgi: bool,
}

impl<H> TrieNode<H> {
    fn new(path: String, param: Option<ParamDef>, path_parameters: Vec<ParamDef>) -> Self {
        Self {
            path,
            children: HashMap::new(),
            param,
            handlers: BTreeMap::new(),
            implied_head: false,
            path_parameters,
            is_mount: false,
            is_static: false,
            is_asgi: false,
        }
    }

    /// Display path of the node (`/items/{item_id:int}`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child nodes keyed by literal segment or parameter sentinel.
    #[must_use]
    pub fn children(&self) -> &HashMap<ChildKey, TrieNode<H>> {
        &self.children
    }

    /// The child for an exact literal segment.
    #[must_use]
    pub fn literal_child(&self, segment: &str) -> Option<&TrieNode<H>> {
        self.children.get(&ChildKey::Literal(segment.to_string()))
    }

    /// The parameter child, if any.
    #[must_use]
    pub fn param_child(&self) -> Option<&TrieNode<H>> {
        self.children.get(&ChildKey::Parameter)
    }

    /// The parameter this node binds, when reached through the sentinel.
    #[must_use]
    pub fn param(&self) -> Option<&ParamDef> {
        self.param.as_ref()
    }

    /// Registered handlers keyed by kind.
    #[must_use]
    pub fn handlers(&self) -> &BTreeMap<HandlerKind, H> {
        &self.handlers
    }

    /// Look up a handler by kind.
    #[must_use]
    pub fn handler(&self, kind: HandlerKind) -> Option<&H> {
        self.handlers.get(&kind)
    }

    /// Parameter definitions from the root down to this node.
    #[must_use]
    pub fn path_parameters(&self) -> &[ParamDef] {
        &self.path_parameters
    }

    /// Returns `true` if this node is a mount point.
    #[must_use]
    pub fn is_mount(&self) -> bool {
        self.is_mount
    }

    /// Returns `true` if this node is a static-files mount point.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns `true` if an ASGI handler is registered here.
    #[must_use]
    pub fn is_asgi(&self) -> bool {
        self.is_asgi
    }

    /// Returns `true` if this node binds a `path` parameter.
    #[must_use]
    pub fn is_path_type(&self) -> bool {
        self.param
            .as_ref()
            .is_some_and(|p| p.converter == Converter::Path)
    }

    /// HTTP methods registered on this node.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        self.handlers.keys().filter_map(|k| k.method()).collect()
    }

    fn child_path(&self, segment: &str) -> String {
        if self.path == "/" {
            format!("/{segment}")
        } else {
            format!("{}/{segment}", self.path)
        }
    }
}

/// Route trie.
///
/// Built at startup with [`RouteTrie::insert`], checked with
/// [`RouteTrie::validate`], then only read.
#[derive(Debug)]
pub struct RouteTrie<H> {
    root: TrieNode<H>,
    route_count: usize,
}

impl<H> Default for RouteTrie<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteTrie<H> {
    /// Create an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::new("/".to_string(), None, Vec::new()),
            route_count: 0,
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &TrieNode<H> {
        &self.root
    }

    /// Number of registrations inserted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns `true` if nothing was inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Check the trie invariants. See [`crate::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::validate::validate(&self.root)
    }

    /// Resolve a normalized request path to a handler.
    ///
    /// Literal children win over the parameter child. Mount nodes stop the
    /// walk, except that a static mount yields to a matching literal child.
    /// A `path` parameter consumes every remaining segment.
    pub fn resolve(&self, path: &str, target: Target) -> Result<RouteMatch<'_, H>, RouteError> {
        crate::resolve::resolve(&self.root, path, target)
    }
}

impl<H: Clone> RouteTrie<H> {
    /// Insert a route, creating intermediate nodes as needed.
    ///
    /// `GET` handlers are also registered for `HEAD` unless a `HEAD` handler
    /// is registered explicitly for the same path.
    pub fn insert(&mut self, registration: RouteRegistration<H>) -> Result<(), ConfigError> {
        let RouteRegistration {
            path,
            handlers,
            mount,
        } = registration;

        if handlers.is_empty() {
            return Err(ConfigError::EmptyRoute { path: path.path });
        }

        let mut node = &mut self.root;
        let mut params = Vec::new();

        for segment in &path.segments {
            match segment {
                PathSegment::Literal(lit) => {
                    let child_path = node.child_path(lit);
                    let inherited = params.clone();
                    node = node
                        .children
                        .entry(ChildKey::Literal(lit.clone()))
                        .or_insert_with(|| TrieNode::new(child_path, None, inherited));
                }
                PathSegment::Param(def) => {
                    params.push(def.clone());
                    let child_path = node.child_path(&format!("{{{}}}", def.full()));
                    let inherited = params.clone();
                    let child = node
                        .children
                        .entry(ChildKey::Parameter)
                        .or_insert_with(|| TrieNode::new(child_path, Some(def.clone()), inherited));
                    if let Some(existing) = child.param.as_ref().filter(|existing| *existing != def) {
                        return Err(ConfigError::ConflictingParameters {
                            node: child.path.clone(),
                            existing: existing.full(),
                            incoming: def.full(),
                        });
                    }
                    node = child;
                }
            }
        }

        match mount {
            MountKind::None => {}
            MountKind::Asgi => node.is_mount = true,
            MountKind::Static => {
                node.is_mount = true;
                node.is_static = true;
            }
        }

        let explicit_head = handlers
            .iter()
            .any(|(kind, _)| *kind == HandlerKind::Http(Method::Head));
        let mut get_handler = None;

        for (kind, handler) in handlers {
            if kind == HandlerKind::Http(Method::Head) && node.implied_head {
                node.handlers.remove(&kind);
                node.implied_head = false;
            }
            if node.handlers.contains_key(&kind) {
                return Err(ConfigError::DuplicateHandler {
                    path: path.path.clone(),
                    kind,
                });
            }
            if kind == HandlerKind::Asgi {
                node.is_asgi = true;
            }
            if kind == HandlerKind::Http(Method::Get) {
                get_handler = Some(handler.clone());
            }
            node.handlers.insert(kind, handler);
        }

        let head = HandlerKind::Http(Method::Head);
        if let Some(handler) = get_handler {
            if !explicit_head && !node.handlers.contains_key(&head) {
                node.handlers.insert(head, handler);
                node.implied_head = true;
            }
        }

        tracing::debug!(
            path = %path.path,
            kinds = ?node.handlers.keys().collect::<Vec<_>>(),
            mount = ?mount,
            "registered route"
        );
        self.route_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(path: &str) -> RouteRegistration<&'static str> {
        RouteRegistration::new(path).unwrap()
    }

    fn get() -> HandlerKind {
        HandlerKind::Http(Method::Get)
    }

    #[test]
    fn literal_segments_become_children() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/users/me").handler(get(), "me")).unwrap();

        let users = trie.root().literal_child("users").unwrap();
        assert_eq!(users.path(), "/users");
        assert!(users.handlers().is_empty());
        let me = users.literal_child("me").unwrap();
        assert_eq!(me.handler(get()), Some(&"me"));
    }

    #[test]
    fn parameters_share_one_sentinel() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/users/{id:int}").handler(get(), "get_user"))
            .unwrap();
        trie.insert(
            reg("/users/{id:int}/posts").handler(get(), "get_posts"),
        )
        .unwrap();

        let users = trie.root().literal_child("users").unwrap();
        assert_eq!(users.children().len(), 1);
        let param = users.param_child().unwrap();
        assert_eq!(param.path(), "/users/{id:int}");
        assert_eq!(param.param(), Some(&ParamDef::new("id", Converter::Int)));
        assert_eq!(param.path_parameters().len(), 1);
    }

    #[test]
    fn conflicting_parameter_names_are_rejected() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/a/{x:int}/b").handler(get(), "b")).unwrap();
        let err = trie
            .insert(reg("/a/{y:int}/c").handler(get(), "c"))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ConflictingParameters {
                node: "/a/{x:int}".into(),
                existing: "x:int".into(),
                incoming: "y:int".into(),
            }
        );
    }

    #[test]
    fn conflicting_parameter_types_are_rejected() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/a/{x:int}").handler(get(), "int")).unwrap();
        let err = trie.insert(reg("/a/{x:str}").handler(get(), "str")).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingParameters { .. }));
    }

    #[test]
    fn get_implies_head() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/items").handler(get(), "list")).unwrap();
        let node = trie.root().literal_child("items").unwrap();
        assert_eq!(node.handler(HandlerKind::Http(Method::Head)), Some(&"list"));
    }

    #[test]
    fn explicit_head_replaces_implied_head() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/items").handler(get(), "list")).unwrap();
        trie.insert(reg("/items").handler(HandlerKind::Http(Method::Head), "head"))
            .unwrap();
        let node = trie.root().literal_child("items").unwrap();
        assert_eq!(node.handler(HandlerKind::Http(Method::Head)), Some(&"head"));
        assert_eq!(node.handler(get()), Some(&"list"));
    }

    #[test]
    fn duplicate_handler_is_rejected() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/items").handler(get(), "a")).unwrap();
        let err = trie.insert(reg("/items/").handler(get(), "b")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateHandler {
                path: "/items".into(),
                kind: get(),
            }
        );
    }

    #[test]
    fn methods_accumulate_across_registrations() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/items").handler(get(), "list")).unwrap();
        trie.insert(reg("/items").handler(HandlerKind::Http(Method::Post), "create"))
            .unwrap();
        let node = trie.root().literal_child("items").unwrap();
        assert_eq!(node.methods(), vec![Method::Get, Method::Head, Method::Post]);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn mounts_mark_the_terminal_node() {
        let mut trie = RouteTrie::new();
        trie.insert(reg("/static").mount(MountKind::Static, "files"))
            .unwrap();
        let node = trie.root().literal_child("static").unwrap();
        assert!(node.is_mount());
        assert!(node.is_static());
        assert!(node.is_asgi());
        assert_eq!(node.handler(HandlerKind::Asgi), Some(&"files"));
    }

    #[test]
    fn empty_registration_is_rejected() {
        let mut trie: RouteTrie<&str> = RouteTrie::new();
        assert!(matches!(
            trie.insert(reg("/x")),
            Err(ConfigError::EmptyRoute { .. })
        ));
    }
}
