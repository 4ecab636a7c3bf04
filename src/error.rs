//! Unified error type.
//!
//! Everything that can go wrong during a request cycle funnels through
//! [`Error`] so the exception decorator has a single type to translate into
//! a response. Infrastructure failures (bind, accept) use the same type via
//! the `Io` variant.

use std::backtrace::Backtrace;

use http::{Method, StatusCode};
use thiserror::Error;

/// The error type for muon's fallible operations.
///
/// Routing misses, handler and listener failures, and container lookups all
/// produce an `Error`. Each variant maps to an HTTP status via
/// [`status_code`](Error::status_code), which is what the default exception
/// decorator uses to build the error response.
#[derive(Debug, Error)]
pub enum Error {
    /// No route matches the request path under its method.
    #[error("no route matches {method} {path}")]
    NotFound { method: Method, path: String },

    /// The path is routable, but not under this method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: Method, path: String },

    /// Raised inside a route handler or an event listener.
    #[error("{message}")]
    Handler {
        message: String,
        status: Option<StatusCode>,
        trace: Option<String>,
    },

    /// The container has no binding under this key.
    #[error("binding `{0}` is not registered in the container")]
    BindingNotFound(String),

    /// The binding exists but holds a different type.
    #[error("binding `{key}` is not a `{expected}`")]
    BindingType { key: String, expected: &'static str },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// An application-level failure with a message.
    ///
    /// Captures a backtrace at the raise site so the decorator can embed it
    /// in debug mode. Defaults to 500; chain [`with_status`](Error::with_status)
    /// to declare a different status.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            status: None,
            trace: Some(Backtrace::force_capture().to_string()),
        }
    }

    /// Declare the HTTP status this error should surface as.
    ///
    /// Only meaningful on [`Error::Handler`]; other variants already carry
    /// a fixed status and are returned unchanged.
    pub fn with_status(mut self, code: StatusCode) -> Self {
        if let Self::Handler { status, .. } = &mut self {
            *status = Some(code);
        }
        self
    }

    /// The HTTP status this error surfaces as: the declared status when the
    /// error carries one, otherwise 500 (routing misses map to 404/405).
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Handler { status, .. } => status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::BindingNotFound(_) | Self::BindingType { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Backtrace text captured when the error was raised, if any.
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::Handler { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_defaults_to_500() {
        let err = Error::handler("boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "boom");
        assert!(err.trace().is_some());
    }

    #[test]
    fn declared_status_wins() {
        let err = Error::handler("nope").with_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(err.status_code(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn routing_errors_map_to_4xx() {
        let not_found = Error::NotFound { method: Method::GET, path: "/x".into() };
        let not_allowed = Error::MethodNotAllowed { method: Method::POST, path: "/x".into() };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_allowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
