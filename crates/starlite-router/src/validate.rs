//! Trie invariant checks, run once after every route is registered.

use starlite_types::HandlerKind;

use crate::error::ConfigError;
use crate::trie::TrieNode;

/// Recursively check the subtree rooted at `node`.
///
/// - A node with an ASGI handler must not hold handlers of any other kind.
/// - No node below a mount may bind a path parameter.
pub fn validate<H>(node: &TrieNode<H>) -> Result<(), ConfigError> {
    if node.is_asgi() && node.handlers().keys().any(|kind| *kind != HandlerKind::Asgi) {
        return Err(ConfigError::AsgiPathConflict {
            path: node.path().to_string(),
        });
    }

    if node.is_mount() {
        if let Some(offender) = find_parameter(node) {
            return Err(ConfigError::ParameterUnderMount {
                mount: node.path().to_string(),
                path: offender.to_string(),
            });
        }
    }

    for child in node.children().values() {
        validate(child)?;
    }

    tracing::trace!(path = node.path(), "validated trie node");
    Ok(())
}

fn find_parameter<H>(node: &TrieNode<H>) -> Option<&str> {
    node.children().values().find_map(|child| {
        if child.param().is_some() {
            Some(child.path())
        } else {
            find_parameter(child)
        }
    })
}
