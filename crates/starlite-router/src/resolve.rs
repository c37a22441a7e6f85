//! Request path resolution.

use starlite_types::HandlerKind;

use crate::error::RouteError;
use crate::r#match::{AllowedMethods, MountPath, RouteMatch, Target};
use crate::params::PathParams;
use crate::path::{Converter, join_paths};
use crate::trie::TrieNode;

/// Walk the trie from `root` along `path` and select a handler for `target`.
pub fn resolve<'a, H>(
    root: &'a TrieNode<H>,
    path: &str,
    target: Target,
) -> Result<RouteMatch<'a, H>, RouteError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut node = root;
    let mut params = PathParams::new();
    let mut mount = None;
    let mut idx = 0;

    loop {
        if node.is_mount() {
            let yields_to_literal = node.is_static()
                && segments
                    .get(idx)
                    .is_some_and(|segment| node.literal_child(segment).is_some());
            if !yields_to_literal {
                mount = Some(MountPath {
                    prefix: join_paths(&segments[..idx]),
                    remaining: join_paths(&segments[idx..]),
                });
                break;
            }
        }

        let Some(segment) = segments.get(idx) else {
            break;
        };

        if let Some(child) = node.literal_child(segment) {
            node = child;
            idx += 1;
            continue;
        }

        let Some(child) = node.param_child() else {
            return Err(RouteError::NotFound);
        };
        let Some(def) = child.param() else {
            return Err(RouteError::NotFound);
        };

        let raw = if def.converter == Converter::Path {
            let rest = segments[idx..].join("/");
            idx = segments.len();
            rest
        } else {
            idx += 1;
            (*segment).to_string()
        };

        let value = def
            .converter
            .convert(&raw)
            .ok_or_else(|| RouteError::InvalidParameter {
                name: def.name.clone(),
                value: raw.clone(),
            })?;
        params.push(def.name.clone(), value);
        node = child;
    }

    let (kind, handler) = select_handler(node, target)?;
    tracing::trace!(path, node = node.path(), kind = %kind, "resolved route");

    Ok(RouteMatch {
        node,
        kind,
        handler,
        params,
        mount,
    })
}

fn select_handler<H>(node: &TrieNode<H>, target: Target) -> Result<(HandlerKind, &H), RouteError> {
    if node.handlers().is_empty() {
        return Err(RouteError::NotFound);
    }

    if node.is_asgi() {
        if let Some(handler) = node.handler(HandlerKind::Asgi) {
            return Ok((HandlerKind::Asgi, handler));
        }
    }

    let kind = match target {
        Target::Http(method) => HandlerKind::Http(method),
        Target::WebSocket => HandlerKind::WebSocket,
    };

    node.handler(kind)
        .map(|handler| (kind, handler))
        .ok_or_else(|| RouteError::MethodNotAllowed {
            allowed: AllowedMethods::new(node.methods()),
        })
}

#[cfg(test)]
mod tests {
    use starlite_types::Method;

    use super::*;
    use crate::params::ParamValue;
    use crate::registry::{MountKind, RouteRegistration};
    use crate::trie::RouteTrie;

    const GET: Target = Target::Http(Method::Get);

    fn trie(routes: &[(&str, HandlerKind, &'static str)]) -> RouteTrie<&'static str> {
        let mut trie = RouteTrie::new();
        for (path, kind, name) in routes {
            trie.insert(RouteRegistration::new(path).unwrap().handler(*kind, *name))
                .unwrap();
        }
        trie.validate().unwrap();
        trie
    }

    fn http(method: Method) -> HandlerKind {
        HandlerKind::Http(method)
    }

    #[test]
    fn root_path_resolves() {
        let trie = trie(&[("/", http(Method::Get), "index")]);
        let matched = trie.resolve("/", GET).unwrap();
        assert_eq!(*matched.handler, "index");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn literal_beats_parameter() {
        let trie = trie(&[
            ("/users/{id:int}", http(Method::Get), "by_id"),
            ("/users/me", http(Method::Get), "me"),
        ]);
        assert_eq!(*trie.resolve("/users/me", GET).unwrap().handler, "me");
        let matched = trie.resolve("/users/7", GET).unwrap();
        assert_eq!(*matched.handler, "by_id");
        assert_eq!(matched.params.get_int("id"), Some(7));
    }

    #[test]
    fn typed_conversion_failure_is_not_found_class() {
        let trie = trie(&[("/items/{item_id:int}", http(Method::Get), "item")]);
        let err = trie.resolve("/items/abc", GET).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(matches!(err, RouteError::InvalidParameter { name, .. } if name == "item_id"));
    }

    #[test]
    fn unknown_segment_is_not_found() {
        let trie = trie(&[("/items", http(Method::Get), "items")]);
        assert_eq!(trie.resolve("/other", GET).unwrap_err(), RouteError::NotFound);
        assert_eq!(trie.resolve("/items/1", GET).unwrap_err(), RouteError::NotFound);
    }

    #[test]
    fn intermediate_node_without_handlers_is_not_found() {
        let trie = trie(&[("/a/b", http(Method::Get), "ab")]);
        assert_eq!(trie.resolve("/a", GET).unwrap_err(), RouteError::NotFound);
    }

    #[test]
    fn wrong_method_lists_allowed_methods() {
        let trie = trie(&[
            ("/items", http(Method::Get), "list"),
            ("/items", http(Method::Post), "create"),
        ]);
        let err = trie.resolve("/items", Target::Http(Method::Delete)).unwrap_err();
        let RouteError::MethodNotAllowed { allowed } = err else {
            panic!("expected 405, got {err:?}");
        };
        assert_eq!(allowed.header_value(), "GET, HEAD, POST");
    }

    #[test]
    fn head_is_served_by_get_handler() {
        let trie = trie(&[("/items", http(Method::Get), "list")]);
        let matched = trie.resolve("/items", Target::Http(Method::Head)).unwrap();
        assert_eq!(*matched.handler, "list");
        assert_eq!(matched.kind, http(Method::Head));
    }

    #[test]
    fn websocket_requires_websocket_handler() {
        let trie = trie(&[
            ("/ws", HandlerKind::WebSocket, "socket"),
            ("/http", http(Method::Get), "page"),
        ]);
        assert_eq!(*trie.resolve("/ws", Target::WebSocket).unwrap().handler, "socket");
        assert!(matches!(
            trie.resolve("/http", Target::WebSocket),
            Err(RouteError::MethodNotAllowed { .. })
        ));
    }

    #[test]
    fn asgi_handler_serves_every_target() {
        let trie = trie(&[("/raw", HandlerKind::Asgi, "raw")]);
        assert_eq!(*trie.resolve("/raw", GET).unwrap().handler, "raw");
        assert_eq!(*trie.resolve("/raw", Target::WebSocket).unwrap().handler, "raw");
    }

    #[test]
    fn path_parameter_consumes_the_rest() {
        let trie = trie(&[("/files/{file:path}", http(Method::Get), "file")]);
        let matched = trie.resolve("/files/docs/guide/intro.md", GET).unwrap();
        assert_eq!(
            matched.params.get("file"),
            Some(&ParamValue::Path("docs/guide/intro.md".into()))
        );
        assert_eq!(trie.resolve("/files", GET).unwrap_err(), RouteError::NotFound);
    }

    #[test]
    fn mount_forwards_remaining_path() {
        let mut trie = RouteTrie::new();
        trie.insert(
            RouteRegistration::new("/static")
                .unwrap()
                .mount(MountKind::Asgi, "app"),
        )
        .unwrap();

        let matched = trie.resolve("/static/anything/nested/path", GET).unwrap();
        assert_eq!(*matched.handler, "app");
        assert_eq!(
            matched.mount,
            Some(MountPath {
                prefix: "/static".into(),
                remaining: "/anything/nested/path".into(),
            })
        );

        let bare = trie.resolve("/static", GET).unwrap();
        assert_eq!(bare.mount.map(|m| m.remaining), Some("/".into()));
    }

    #[test]
    fn mount_prefix_uses_request_segments() {
        let mut trie = RouteTrie::new();
        trie.insert(
            RouteRegistration::new("/tenants/{tenant:str}/files")
                .unwrap()
                .mount(MountKind::Asgi, "files"),
        )
        .unwrap();
        trie.validate().unwrap();

        let matched = trie.resolve("/tenants/acme/files/a.css", GET).unwrap();
        assert_eq!(matched.params.get_str("tenant"), Some("acme"));
        assert_eq!(
            matched.mount,
            Some(MountPath {
                prefix: "/tenants/acme/files".into(),
                remaining: "/a.css".into(),
            })
        );
    }

    #[test]
    fn static_mount_yields_to_literal_child() {
        let mut trie = RouteTrie::new();
        trie.insert(
            RouteRegistration::new("/assets")
                .unwrap()
                .mount(MountKind::Static, "files"),
        )
        .unwrap();
        trie.insert(
            RouteRegistration::new("/assets/manifest")
                .unwrap()
                .handler(http(Method::Get), "manifest"),
        )
        .unwrap();

        assert_eq!(*trie.resolve("/assets/manifest", GET).unwrap().handler, "manifest");
        let matched = trie.resolve("/assets/app.js", GET).unwrap();
        assert_eq!(*matched.handler, "files");
        assert_eq!(matched.mount.unwrap().remaining, "/app.js");
    }

    #[test]
    fn generic_mount_does_not_yield() {
        let mut trie = RouteTrie::new();
        trie.insert(
            RouteRegistration::new("/sub")
                .unwrap()
                .mount(MountKind::Asgi, "sub"),
        )
        .unwrap();
        trie.insert(
            RouteRegistration::new("/sub/inner")
                .unwrap()
                .handler(http(Method::Get), "inner"),
        )
        .unwrap();

        assert_eq!(*trie.resolve("/sub/inner", GET).unwrap().handler, "sub");
    }

    #[test]
    fn parameters_are_extracted_in_order() {
        let trie = trie(&[(
            "/person/{person_id:uuid}/score/{value:float}",
            http(Method::Put),
            "score",
        )]);
        let matched = trie
            .resolve(
                "/person/550e8400-e29b-41d4-a716-446655440000/score/2.5",
                Target::Http(Method::Put),
            )
            .unwrap();
        let names: Vec<_> = matched.params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["person_id", "value"]);
        assert_eq!(matched.params.get_float("value"), Some(2.5));
        assert_eq!(
            matched.get_param("person_id").as_deref(),
            Some("550e8400-e29b-41d4-a716-446655440000")
        );
    }
}
