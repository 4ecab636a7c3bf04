//! Handler trait and type erasure.
//!
//! The router holds handlers of *different* concrete types in one table, so
//! every handler is erased behind `dyn ErasedHandler` at registration time:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }    ← user writes this
//!        ↓ app.get("/", hello)
//! hello.into_boxed_handler()                        ← Handler blanket impl
//!        ↓ stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at dispatch time               ← one vtable call
//! ```
//!
//! Handler futures resolve to `Result<Response, Error>` so the kernel can
//! catch and decorate failures uniformly. Infallible handlers return any
//! [`IntoResponse`] value; fallible ones return `Result<_, Error>` — both
//! are covered by [`IntoEndpointResult`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Erasure types ─────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future resolving to a handler outcome.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Handler outcome conversion ────────────────────────────────────────────────

/// What a route handler may resolve to.
///
/// Covers every [`IntoResponse`] value and `Result<impl IntoResponse, Error>`,
/// so handlers opt into fallibility without a separate registration API.
pub trait IntoEndpointResult {
    fn into_endpoint_result(self) -> Result<Response, Error>;
}

impl IntoEndpointResult for Response {
    fn into_endpoint_result(self) -> Result<Response, Error> {
        Ok(self)
    }
}

impl IntoEndpointResult for &'static str {
    fn into_endpoint_result(self) -> Result<Response, Error> {
        Ok(self.into_response())
    }
}

impl IntoEndpointResult for String {
    fn into_endpoint_result(self) -> Result<Response, Error> {
        Ok(self.into_response())
    }
}

impl IntoEndpointResult for StatusCode {
    fn into_endpoint_result(self) -> Result<Response, Error> {
        Ok(self.into_response())
    }
}

impl<R: IntoResponse> IntoEndpointResult for Result<R, Error> {
    fn into_endpoint_result(self) -> Result<Response, Error> {
        self.map(IntoResponse::into_response)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoEndpointResult
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEndpointResult + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEndpointResult + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype bridging a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEndpointResult + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_endpoint_result() })
    }
}

// ── Container-resolvable endpoints ────────────────────────────────────────────

/// A route endpoint resolved from the container at dispatch time.
///
/// Register an implementation under a key with
/// [`App::bind_service`](crate::App::bind_service), then route to it with
/// [`App::service`](crate::App::service). The router looks the key up per
/// dispatch, so rebinding the key swaps the endpoint without touching the
/// route table.
pub trait RouteService: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}
