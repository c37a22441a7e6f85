//! Route matching result.

use starlite_types::{HandlerKind, Method};

use crate::params::PathParams;
use crate::trie::TrieNode;

/// What the incoming connection asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// An HTTP request with its method.
    Http(Method),
    /// A WebSocket connection.
    WebSocket,
}

/// Path split performed when a request is routed into a mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPath {
    /// The mount's own path (`/static`).
    pub prefix: String,
    /// The normalized remainder handed to the mounted application (`/css/site.css`).
    pub remaining: String,
}

/// A matched route with extracted parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// The trie node the path resolved to.
    pub node: &'a TrieNode<H>,
    /// The key of the selected handler.
    pub kind: HandlerKind,
    /// The selected handler payload.
    pub handler: &'a H,
    /// Extracted and converted path parameters.
    pub params: PathParams,
    /// Present when the route is a mount.
    pub mount: Option<MountPath>,
}

impl<H> RouteMatch<'_, H> {
    /// Get a parameter value rendered as a string.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).map(ToString::to_string)
    }
}

/// Allowed methods for a matched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<Method>,
}

impl AllowedMethods {
    /// Create a normalized allow list.
    ///
    /// - Adds `HEAD` if `GET` is present.
    /// - Sorts and de-duplicates for stable output.
    #[must_use]
    pub fn new(mut methods: Vec<Method>) -> Self {
        if methods.contains(&Method::Get) && !methods.contains(&Method::Head) {
            methods.push(Method::Head);
        }
        methods.sort_by_key(method_order);
        methods.dedup();
        Self { methods }
    }

    /// Access the normalized methods.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Check whether a method is allowed.
    #[must_use]
    pub fn contains(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Format as an HTTP Allow header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn method_order(method: &Method) -> u8 {
    match *method {
        Method::Get => 0,
        Method::Head => 1,
        Method::Post => 2,
        Method::Put => 3,
        Method::Patch => 4,
        Method::Delete => 5,
        Method::Options => 6,
        Method::Trace => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_implies_head_in_allow_list() {
        let allowed = AllowedMethods::new(vec![Method::Post, Method::Get]);
        assert_eq!(allowed.methods(), &[Method::Get, Method::Head, Method::Post]);
        assert_eq!(allowed.header_value(), "GET, HEAD, POST");
        assert!(allowed.contains(Method::Head));
    }

    #[test]
    fn allow_list_is_deduplicated() {
        let allowed = AllowedMethods::new(vec![Method::Delete, Method::Delete, Method::Put]);
        assert_eq!(allowed.header_value(), "PUT, DELETE");
    }
}
