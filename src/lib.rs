//! # muon
//!
//! A minimal HTTP application kernel. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! muon is the glue around one request/response cycle: a facade wiring a
//! dependency-injection container, a route table, an event emitter, and
//! exception-to-response translation. The hard algorithms are collaborators
//! with fixed contracts — [`matchit`] matches paths, hyper moves bytes,
//! `tracing` carries logs. muon decides the order things happen in:
//!
//! 1. the inbound request is registered into the container
//! 2. `request.received` fires with the request
//! 3. the router dispatches on (method, path)
//! 4. `response.created` fires with (request, response) — after a
//!    successful dispatch *or* after the exception decorator built an error
//!    response, never both
//! 5. `response.sent` fires once the response reached the transport
//!
//! Any error raised in steps 2–4 — by a listener, a handler, or the router —
//! is translated by the active [`ExceptionDecorator`] into a JSON error
//! response ([`App::try_handle`] opts out and propagates instead). No
//! retries, ever: one request in, at most one response out.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use muon::{App, Request, Response};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::new(true);
//!
//!     app.get("/", |_req: Request| async {
//!         Response::html("<h1>It works!</h1>")
//!     });
//!
//!     app.subscribe(muon::events::REQUEST_RECEIVED, |event: &muon::Event<'_>| {
//!         let path = event.request().map(|r| r.path().to_owned()).unwrap_or_default();
//!         tracing::info!(%path, "request received");
//!         Ok(())
//!     });
//!
//!     app.run("0.0.0.0:3000").await.expect("server error");
//! }
//! ```

mod app;
mod config;
mod container;
mod decorator;
mod error;
mod handler;
mod logger;
mod request;
mod response;
mod router;
mod server;

pub mod events;

pub use app::{App, APP_BINDING, REQUEST_BINDING};
pub use config::Config;
pub use container::Container;
pub use decorator::{ExceptionDecorator, JsonErrorDecorator};
pub use error::Error;
pub use events::{Emitter, Event, Listener};
pub use handler::{BoxFuture, Handler, IntoEndpointResult, RouteService};
pub use logger::Logger;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

pub use http::{Method, StatusCode};
