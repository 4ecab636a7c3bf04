//! Exception-to-response translation.
//!
//! Exactly one [`ExceptionDecorator`] is active on an application at a time;
//! it is the sole place a raised [`Error`] becomes a user-facing response.
//! The trait returns a [`Response`] by type, so a misbehaving decorator is a
//! compile error rather than a runtime contract check.

use std::backtrace::Backtrace;

use serde_json::json;

use crate::config::Config;
use crate::error::Error;
use crate::response::Response;

/// Converts a raised error into the response the client sees.
///
/// Closures work too — any `Fn(&Error) -> Response` is a decorator:
///
/// ```rust
/// use muon::{App, Response};
/// use http::StatusCode;
///
/// let app = App::new(false);
/// app.set_exception_decorator(|_err: &muon::Error| {
///     Response::builder().status(StatusCode::BAD_GATEWAY).text("upstream says no")
/// });
/// ```
pub trait ExceptionDecorator: Send + Sync + 'static {
    fn decorate(&self, error: &Error) -> Response;
}

impl<F> ExceptionDecorator for F
where
    F: Fn(&Error) -> Response + Send + Sync + 'static,
{
    fn decorate(&self, error: &Error) -> Response {
        self(error)
    }
}

/// The default decorator: a JSON error body.
///
/// Status comes from [`Error::status_code`] (the error's declared status,
/// else 500). Body is `{"error":{"message": …}}`; when the shared config's
/// debug flag is set, a `"trace"` array of backtrace lines is embedded —
/// the error's captured trace when it has one, otherwise one captured here.
pub struct JsonErrorDecorator {
    config: Config,
}

impl JsonErrorDecorator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ExceptionDecorator for JsonErrorDecorator {
    fn decorate(&self, error: &Error) -> Response {
        let mut body = json!({
            "error": {
                "message": error.to_string(),
            }
        });

        if self.config.debug() {
            let trace = match error.trace() {
                Some(trace) => trace.to_owned(),
                None => Backtrace::force_capture().to_string(),
            };
            let lines: Vec<&str> = trace.lines().collect();
            body["error"]["trace"] = json!(lines);
        }

        Response::builder()
            .status(error.status_code())
            .json(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::Value;

    fn decorated(debug: bool, error: &Error) -> (StatusCode, Value) {
        let config = Config::new();
        config.set("debug", debug);
        let response = JsonErrorDecorator::new(config).decorate(error);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        (response.status_code(), body)
    }

    #[test]
    fn builds_a_json_error_body() {
        let (status, body) = decorated(false, &Error::handler("kaput"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "kaput");
        assert!(body["error"].get("trace").is_none());
    }

    #[test]
    fn debug_mode_embeds_a_trace() {
        let (_, body) = decorated(true, &Error::handler("kaput"));
        let trace = body["error"]["trace"].as_array().unwrap();
        assert!(!trace.is_empty());
    }

    #[test]
    fn uses_the_declared_status() {
        let err = Error::handler("gone").with_status(StatusCode::GONE);
        let (status, _) = decorated(false, &err);
        assert_eq!(status, StatusCode::GONE);
    }
}
