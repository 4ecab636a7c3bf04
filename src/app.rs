//! The application facade.
//!
//! [`App`] wires the container, route table, event emitter, and exception
//! decorator together and owns the request-handling control flow: register
//! the request, emit `request.received`, dispatch, emit `response.created`,
//! and on failure translate the error through the active decorator. That
//! sequence — and its ordering — is the whole job of this module; the
//! collaborators it delegates to live in their own modules.

use std::sync::{Arc, RwLock};

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::Config;
use crate::container::Container;
use crate::decorator::{ExceptionDecorator, JsonErrorDecorator};
use crate::error::Error;
use crate::events::{Emitter, Event, RESPONSE_CREATED, RESPONSE_SENT, REQUEST_RECEIVED};
use crate::handler::{Handler, RouteService};
use crate::logger::{Logger, LoggerRegistry};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::server::Server;

/// Container key the application registers itself under.
pub const APP_BINDING: &str = "app";
/// Container key the current request is registered under during handling.
pub const REQUEST_BINDING: &str = "request";

/// The application kernel.
///
/// Construct once at startup, wire routes and listeners, then hand the
/// `Arc<App>` to the transport (or call [`handle`](App::handle) directly).
/// All wiring state is interior-mutable; the intended model is build-time
/// wiring followed by read-mostly serving — no locking discipline is asked
/// of callers.
///
/// ```rust
/// use muon::{App, Request, Response};
///
/// # async fn demo() {
/// let app = App::new(false);
/// app.get("/", |_req: Request| async { Response::html("<h1>It works!</h1>") });
///
/// let response = app.handle(&Request::new(http::Method::GET, "/")).await;
/// assert_eq!(response.body(), b"<h1>It works!</h1>");
/// # }
/// ```
pub struct App {
    config: Config,
    loggers: LoggerRegistry,
    emitter: Emitter,
    container: RwLock<Option<Arc<Container>>>,
    router: RwLock<Option<Arc<Router>>>,
    decorator: RwLock<Arc<dyn ExceptionDecorator>>,
}

impl App {
    /// A new application. `debug` lands in the config store under `"debug"`
    /// and controls whether the default decorator embeds backtraces.
    pub fn new(debug: bool) -> Arc<Self> {
        let config = Config::new();
        config.set("debug", debug);

        let decorator: Arc<dyn ExceptionDecorator> =
            Arc::new(JsonErrorDecorator::new(config.clone()));

        Arc::new(Self {
            config,
            loggers: LoggerRegistry::new(),
            emitter: Emitter::new(),
            container: RwLock::new(None),
            router: RwLock::new(None),
            decorator: RwLock::new(decorator),
        })
    }

    // ── Container ────────────────────────────────────────────────────────────

    /// The application container, created on first access with the
    /// application registered under [`APP_BINDING`].
    pub fn container(self: &Arc<Self>) -> Arc<Container> {
        if let Some(container) = self.container.read().unwrap().as_ref() {
            return Arc::clone(container);
        }

        let container = Arc::new(Container::new());
        container.insert_arc(APP_BINDING, Arc::clone(self));

        let mut slot = self.container.write().unwrap();
        // another caller may have installed one between the two locks
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }
        debug!("container created");
        *slot = Some(Arc::clone(&container));
        container
    }

    /// Replace the container wholesale.
    ///
    /// Re-registers the application under [`APP_BINDING`] and drops the
    /// cached router so the next [`router`](App::router) access rebinds to
    /// the new container.
    pub fn set_container(self: &Arc<Self>, container: Arc<Container>) {
        container.insert_arc(APP_BINDING, Arc::clone(self));
        *self.container.write().unwrap() = Some(container);
        *self.router.write().unwrap() = None;
        debug!("container replaced, router invalidated");
    }

    // ── Router and route registration ────────────────────────────────────────

    /// The route table, lazily constructed bound to
    /// [`container`](App::container).
    pub fn router(self: &Arc<Self>) -> Arc<Router> {
        if let Some(router) = self.router.read().unwrap().as_ref() {
            return Arc::clone(router);
        }

        let router = Arc::new(Router::new(self.container()));

        let mut slot = self.router.write().unwrap();
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }
        debug!("router created");
        *slot = Some(Arc::clone(&router));
        router
    }

    /// Register a handler under an explicit method.
    pub fn route(self: &Arc<Self>, method: Method, path: &str, handler: impl Handler) {
        self.router().route(method, path, handler);
    }

    /// Add a GET route.
    pub fn get(self: &Arc<Self>, path: &str, handler: impl Handler) {
        self.route(Method::GET, path, handler);
    }

    /// Add a POST route.
    pub fn post(self: &Arc<Self>, path: &str, handler: impl Handler) {
        self.route(Method::POST, path, handler);
    }

    /// Add a PUT route.
    pub fn put(self: &Arc<Self>, path: &str, handler: impl Handler) {
        self.route(Method::PUT, path, handler);
    }

    /// Add a DELETE route.
    pub fn delete(self: &Arc<Self>, path: &str, handler: impl Handler) {
        self.route(Method::DELETE, path, handler);
    }

    /// Add a PATCH route.
    pub fn patch(self: &Arc<Self>, path: &str, handler: impl Handler) {
        self.route(Method::PATCH, path, handler);
    }

    /// Route to a container-resolvable endpoint registered with
    /// [`bind_service`](App::bind_service).
    pub fn service(self: &Arc<Self>, method: Method, path: &str, key: impl Into<String>) {
        self.router().service(method, path, key);
    }

    /// Bind a [`RouteService`] into the container under `key`.
    pub fn bind_service(self: &Arc<Self>, key: impl Into<String>, service: impl RouteService) {
        let service: Arc<dyn RouteService> = Arc::new(service);
        self.container().insert(key, service);
    }

    // ── Events ───────────────────────────────────────────────────────────────

    /// The owned event emitter, for custom application-defined events.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Subscribe a listener at normal priority.
    pub fn subscribe<F>(&self, name: impl Into<String>, listener: F)
    where
        F: Fn(&Event<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.emitter.subscribe(name, listener);
    }

    /// Subscribe a listener at an explicit priority
    /// (see [`events::priority`](crate::events::priority)).
    pub fn subscribe_with_priority<F>(&self, name: impl Into<String>, priority: i32, listener: F)
    where
        F: Fn(&Event<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.emitter.subscribe_with_priority(name, priority, listener);
    }

    // ── Decorator, config, loggers ───────────────────────────────────────────

    /// Replace the active exception decorator. Exactly one is active at a
    /// time; replacement is wholesale, there is no chaining.
    pub fn set_exception_decorator(&self, decorator: impl ExceptionDecorator) {
        *self.decorator.write().unwrap() = Arc::new(decorator);
        debug!("exception decorator replaced");
    }

    /// The shared config store.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.config.set(key, value);
    }

    pub fn get_config<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key)
    }

    pub fn get_config_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.config.get_or(key, default)
    }

    /// A named logger; the same name always returns the identical handle.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        self.loggers.get(name)
    }

    /// The `"default"` logger.
    pub fn logger(&self) -> Arc<Logger> {
        self.get_logger("default")
    }

    // ── Named binding sugar ──────────────────────────────────────────────────

    /// Register `value` as a singleton under `key` in the container.
    pub fn set_binding<T: Send + Sync + 'static>(self: &Arc<Self>, key: impl Into<String>, value: T) {
        self.container().insert(key, value);
    }

    /// Resolve `key` from the container.
    pub fn get_binding<T: Send + Sync + 'static>(self: &Arc<Self>, key: &str) -> Result<Arc<T>, Error> {
        self.container().get(key)
    }

    /// True when `key` is bound in any resolvable form, singleton or factory.
    pub fn has_binding(self: &Arc<Self>, key: &str) -> bool {
        self.container().contains(key)
    }

    pub fn remove_binding(self: &Arc<Self>, key: &str) {
        self.container().remove(key);
    }

    // ── Request cycle ────────────────────────────────────────────────────────

    /// Handle a request without catching errors.
    ///
    /// Registers the request in the container under [`REQUEST_BINDING`]
    /// (overwriting any prior registration), emits
    /// [`REQUEST_RECEIVED`], dispatches through the router, emits
    /// [`RESPONSE_CREATED`] with the response, and returns it. Any error
    /// raised after the request is registered — by a listener or by
    /// dispatch — propagates to the caller undecorated, with no further
    /// event emission.
    pub async fn try_handle(self: &Arc<Self>, request: &Request) -> Result<Response, Error> {
        self.container().insert(REQUEST_BINDING, request.clone());

        self.emitter
            .emit(&Event::new(REQUEST_RECEIVED).with_request(request))?;

        let response = self.router().dispatch(request).await?;

        self.emitter.emit(
            &Event::new(RESPONSE_CREATED)
                .with_request(request)
                .with_response(&response),
        )?;

        Ok(response)
    }

    /// Handle a request, translating any failure through the active
    /// exception decorator.
    ///
    /// The happy path is [`try_handle`](App::try_handle). On error the
    /// decorator builds the response, [`RESPONSE_CREATED`] fires for the
    /// decorated response instead, and that response is returned — every
    /// request produces exactly one response. A listener failing during the
    /// decorated-path emission is logged; the decorated response is still
    /// returned.
    pub async fn handle(self: &Arc<Self>, request: &Request) -> Response {
        match self.try_handle(request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%err, "decorating request error");
                let decorator = Arc::clone(&self.decorator.read().unwrap());
                let response = decorator.decorate(&err);

                if let Err(emit_err) = self.emitter.emit(
                    &Event::new(RESPONSE_CREATED)
                        .with_request(request)
                        .with_response(&response),
                ) {
                    error!(%emit_err, "response.created listener failed after decoration");
                }

                response
            }
        }
    }

    /// Finish a request/response cycle by emitting [`RESPONSE_SENT`].
    ///
    /// Call strictly after the response has been handed to the transport.
    /// Listener failures are logged, not propagated — the response is
    /// already on the wire.
    pub fn terminate(&self, request: &Request, response: &Response) {
        if let Err(err) = self.emitter.emit(
            &Event::new(RESPONSE_SENT)
                .with_request(request)
                .with_response(response),
        ) {
            error!(%err, "response.sent listener failed");
        }
    }

    /// Serve the application over HTTP on `addr`.
    ///
    /// The transport builds a [`Request`] per inbound connection request,
    /// runs [`handle`](App::handle), writes the response, and calls
    /// [`terminate`](App::terminate). Returns after graceful shutdown.
    pub async fn run(self: Arc<Self>, addr: &str) -> Result<(), Error> {
        Server::bind(addr).serve(self).await
    }
}
