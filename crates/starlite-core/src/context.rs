//! Request context with asupersync integration.
//!
//! [`RequestContext`] wraps asupersync's [`Cx`] to provide connection-scoped
//! identity and cancellation to handlers and middleware.

use asupersync::Cx;

/// Connection-scoped context passed down the ASGI call chain.
///
/// Cancellation is cooperative: the streaming response machinery marks the
/// context cancelled when the client disconnects, and long-running handlers
/// should call [`RequestContext::checkpoint`] at natural suspension points.
///
/// # Example
///
/// ```ignore
/// async fn export(ctx: RequestContext, req: Request) -> Result<Response, Error> {
///     for chunk in rows() {
///         ctx.checkpoint()?;
///         // ...
///     }
///     Ok(Response::text("done"))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    cx: Cx,
    request_id: u64,
}

impl RequestContext {
    /// Creates a new context from an asupersync Cx.
    #[must_use]
    pub fn new(cx: Cx, request_id: u64) -> Self {
        Self { cx, request_id }
    }

    /// Returns the connection identifier, used as a tracing field.
    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Checks if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cx.is_cancel_requested()
    }

    /// Request cancellation of the work bound to this context.
    pub fn cancel(&self) {
        self.cx.set_cancel_requested(true);
    }

    /// Cooperative cancellation checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection has been cancelled and cancellation
    /// is not currently masked.
    pub fn checkpoint(&self) -> Result<(), CancelledError> {
        self.cx.checkpoint().map_err(|_| CancelledError)
    }

    /// Executes a closure with cancellation masked.
    pub fn masked<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.cx.masked(f)
    }

    /// Returns a reference to the underlying asupersync Cx.
    #[must_use]
    pub fn cx(&self) -> &Cx {
        &self.cx
    }
}

/// Error returned when a connection has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request cancelled")]
pub struct CancelledError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_error_display() {
        assert_eq!(CancelledError.to_string(), "request cancelled");
    }

    #[test]
    fn checkpoint_fails_after_cancel() {
        let ctx = RequestContext::new(Cx::for_testing(), 7);
        assert!(ctx.checkpoint().is_ok());
        assert!(!ctx.is_cancelled());

        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.checkpoint(), Err(CancelledError));
        assert_eq!(ctx.request_id(), 7);
    }

    #[test]
    fn masked_defers_cancellation_at_checkpoint() {
        let ctx = RequestContext::new(Cx::for_testing(), 1);
        ctx.cancel();

        let result = ctx.masked(|| ctx.checkpoint());
        assert!(result.is_ok());
        assert!(ctx.checkpoint().is_err());
    }
}
