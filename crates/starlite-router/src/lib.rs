//! Prefix-trie router.
//!
//! This crate provides the routing core of the starlite_rust framework:
//!
//! - Path parsing with typed parameters (`/items/{item_id:int}`)
//! - A trie keyed by literal segments and a shared parameter sentinel
//! - Build-time validation of ASGI and mount invariants
//! - Request resolution with literal-over-parameter precedence
//! - A name index for reverse URL construction
//!
//! The trie is generic over the handler payload `H`, so the dispatch layer
//! decides what a "handler" is. Once built and validated it is immutable and
//! can be shared across threads without locking.
//!
//! # Example
//!
//! ```
//! use starlite_router::{RouteRegistration, RouteTrie, Target};
//! use starlite_types::{HandlerKind, Method};
//!
//! let mut trie = RouteTrie::new();
//! trie.insert(
//!     RouteRegistration::new("/items/{item_id:int}")
//!         .unwrap()
//!         .handler(HandlerKind::Http(Method::Get), "get_item"),
//! )
//! .unwrap();
//! trie.validate().unwrap();
//!
//! let matched = trie.resolve("/items/42", Target::Http(Method::Get)).unwrap();
//! assert_eq!(*matched.handler, "get_item");
//! assert_eq!(matched.params.get_int("item_id"), Some(42));
//! ```

#![forbid(unsafe_code)]

mod error;
mod r#match;
mod params;
mod path;
mod registry;
mod resolve;
mod trie;
mod validate;

pub use error::{ConfigError, ReverseError, RouteError};
pub use r#match::{AllowedMethods, MountPath, RouteMatch, Target};
pub use params::{ParamValue, PathParams};
pub use path::{Converter, ParamDef, ParsedPath, PathSegment, join_paths, normalize_path};
pub use registry::{MountKind, RouteIndex, RouteRegistration};
pub use trie::{ChildKey, RouteTrie, TrieNode};
pub use validate::validate;
