//! Static file serving.
//!
//! [`StaticFiles`] is an ASGI application meant to be mounted with
//! `RouteHandler::static_files`. The mount hands it the remaining path,
//! which is resolved against each configured directory in order.
//!
//! - Only `GET` and `HEAD` are served; other methods get 405.
//! - Paths containing `..` components or NUL bytes are rejected with 404,
//!   and resolved files must stay inside their directory.
//! - In HTML mode a directory serves its `index.html`, and a missing file
//!   serves the top-level `404.html` with status 404 when one exists.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use starlite_types::{Method, ScopeType};

use crate::asgi::{AsgiApp, BoxFuture, Scope, SharedReceiver, SharedSender};
use crate::context::RequestContext;
use crate::error::{Error, HttpError};
use crate::response::{Response, mime_type_for_extension};

/// Serves files from one or more directories.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    directories: Vec<PathBuf>,
    html_mode: bool,
}

impl StaticFiles {
    /// Serve files from `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directories: vec![directory.into()],
            html_mode: false,
        }
    }

    /// Add a fallback directory searched after the previous ones.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directories.push(directory.into());
        self
    }

    /// Enable `index.html` and `404.html` handling.
    #[must_use]
    pub fn html_mode(mut self, enabled: bool) -> Self {
        self.html_mode = enabled;
        self
    }

    /// Find `relative` in the configured directories.
    fn lookup(&self, relative: &str) -> Result<Option<PathBuf>, Error> {
        for directory in &self.directories {
            let candidate = directory.join(relative);
            match candidate.canonicalize() {
                Ok(resolved) => {
                    let root = directory.canonicalize().map_err(io_error)?;
                    if resolved.starts_with(&root) {
                        return Ok(Some(resolved));
                    }
                    tracing::warn!(path = %candidate.display(), "static file escapes its directory");
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(io_error(err)),
            }
        }
        Ok(None)
    }

    /// Resolve a request path to a file, applying the index rule.
    fn resolve(&self, path: &str) -> Result<Option<PathBuf>, Error> {
        let relative = path.trim_start_matches('/');
        let Some(found) = self.lookup(relative)? else {
            return Ok(None);
        };
        if found.is_file() {
            return Ok(Some(found));
        }
        if found.is_dir() && self.html_mode {
            let index = found.join("index.html");
            if index.is_file() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

fn io_error(err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::PermissionDenied {
        return HttpError::new(401)
            .with_detail("failed to load file due to missing permissions")
            .into();
    }
    Error::internal(err)
}

fn is_safe_path(path: &str) -> bool {
    !path.contains('\0') && !path.split('/').any(|c| c == "..")
}

fn file_response(path: &Path, status: u16) -> Result<Response, Error> {
    let contents = std::fs::read(path).map_err(io_error)?;
    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or("application/octet-stream", mime_type_for_extension);
    Ok(Response::with_status(status)
        .header("content-type", content_type)
        .body(contents))
}

impl AsgiApp for StaticFiles {
    fn call<'a>(
        &'a self,
        ctx: &'a RequestContext,
        scope: Scope,
        receive: SharedReceiver,
        send: SharedSender,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            if scope.scope_type != ScopeType::Http || !matches!(scope.method, Some(Method::Get | Method::Head)) {
                return Err(HttpError::new(405).with_header("allow", "GET, HEAD").into());
            }
            if !is_safe_path(&scope.path) {
                return Err(HttpError::not_found().into());
            }

            let response = match self.resolve(&scope.path)? {
                Some(file) => file_response(&file, 200)?,
                None => {
                    let fallback = if self.html_mode { self.lookup("404.html")? } else { None };
                    match fallback.filter(|p| p.is_file()) {
                        Some(page) => file_response(&page, 404)?,
                        None => {
                            return Err(HttpError::not_found()
                                .with_detail(format!("no file or directory matches the path {}", scope.path))
                                .into());
                        }
                    }
                }
            };
            tracing::trace!(path = %scope.path, status = response.status_code(), "serving static file");
            response.send(ctx, scope.method, receive, send).await
        })
    }
}
