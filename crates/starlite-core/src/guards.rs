//! Route guards.
//!
//! A guard is a synchronous check run before the endpoint of a route
//! handler. It sees the connection scope and the matched route and either
//! lets the connection through or rejects it with an error, which the
//! exception boundary renders like any other endpoint error (an HTTP
//! response, or a `websocket.close` with `4000 + status`).
//!
//! Guards are declared on the application, routers, controllers and route
//! handlers. All of them run, outermost layer first.
//!
//! ```ignore
//! fn admin_only(scope: &Scope, _route: &RouteInfo) -> Result<(), Error> {
//!     match scope.headers.get("x-role") {
//!         Some("admin") => Ok(()),
//!         _ => Err(HttpError::forbidden().into()),
//!     }
//! }
//!
//! let admin = Router::new("/admin").guard(admin_only);
//! ```

use std::sync::Arc;

use crate::asgi::{RouteInfo, Scope};
use crate::error::Error;

/// A guard function.
pub type Guard = Arc<dyn Fn(&Scope, &RouteInfo) -> Result<(), Error> + Send + Sync>;

/// An ordered list of guards.
#[derive(Clone, Default)]
pub struct Guards {
    guards: Vec<Guard>,
}

impl std::fmt::Debug for Guards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guards").field("len", &self.guards.len()).finish()
    }
}

impl Guards {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guard after the existing ones.
    pub fn push<G>(&mut self, guard: G)
    where
        G: Fn(&Scope, &RouteInfo) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.guards.push(Arc::new(guard));
    }

    /// Append every guard of `other`.
    pub fn extend(&mut self, other: &Guards) {
        self.guards.extend(other.guards.iter().cloned());
    }

    /// Returns the number of guards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if there are no guards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Run every guard in order, stopping at the first rejection.
    pub fn check(&self, scope: &Scope) -> Result<(), Error> {
        if self.guards.is_empty() {
            return Ok(());
        }
        let unrouted = RouteInfo::default();
        let route = scope.route.as_deref().unwrap_or(&unrouted);
        for guard in &self.guards {
            if let Err(err) = guard(scope, route) {
                tracing::debug!(path = %scope.path, route = %route.path_format, error = %err, "guard rejected connection");
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use starlite_types::Method;

    use super::*;
    use crate::error::HttpError;

    #[test]
    fn empty_list_passes() {
        assert!(Guards::new().check(&Scope::http(Method::Get, "/")).is_ok());
    }

    #[test]
    fn first_rejection_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut guards = Guards::new();
        let counter = Arc::clone(&calls);
        guards.push(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        guards.push(|_, _| Err(HttpError::forbidden().into()));
        let counter = Arc::clone(&calls);
        guards.push(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = guards.check(&Scope::http(Method::Get, "/")).unwrap_err();
        assert_eq!(err.to_http().status(), 403);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guards_see_the_matched_route() {
        let mut guards = Guards::new();
        guards.push(|_, route| {
            if route.opt.get("admin").is_some() {
                Ok(())
            } else {
                Err(HttpError::unauthorized().into())
            }
        });

        let mut opt = crate::asgi::Opt::new();
        opt.insert("admin".into(), true.into());
        let mut scope = Scope::http(Method::Get, "/admin");
        scope.route = Some(Arc::new(RouteInfo {
            opt: Arc::new(opt),
            ..RouteInfo::default()
        }));

        assert!(guards.check(&scope).is_ok());
        let unrouted = guards.check(&Scope::http(Method::Get, "/admin")).unwrap_err();
        assert_eq!(unrouted.to_http().status(), 401);
    }
}
