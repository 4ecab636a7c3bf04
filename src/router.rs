//! Radix-tree route table.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. The
//! router is bound to the application container at construction so route
//! actions can be container-resolvable references as well as plain
//! callables. Route-pattern syntax belongs to matchit — the kernel does not
//! validate paths itself.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use http::Method;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::container::Container;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler, RouteService};
use crate::request::Request;
use crate::response::Response;

#[derive(Clone)]
enum Endpoint {
    Handler(BoxedHandler),
    /// Looked up in the container at dispatch time.
    Service(String),
}

/// The route table.
///
/// Interior-mutable so registration works through the shared
/// `Arc<Router>` the application hands out. Built lazily by
/// [`App::router`](crate::App::router), bound to the application container.
pub struct Router {
    container: Arc<Container>,
    routes: RwLock<HashMap<Method, MatchitRouter<Endpoint>>>,
}

impl Router {
    pub fn new(container: Arc<Container>) -> Self {
        Self { container, routes: RwLock::new(HashMap::new()) }
    }

    /// The container this router resolves service endpoints from.
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves
    /// them.
    ///
    /// # Panics
    ///
    /// Panics on an invalid route pattern. Registration happens at wiring
    /// time; a bad pattern is a programming error.
    pub fn route(&self, method: Method, path: &str, handler: impl Handler) {
        self.insert(method, path, Endpoint::Handler(handler.into_boxed_handler()));
    }

    /// Register a container-resolvable endpoint: at dispatch time the
    /// [`RouteService`] bound under `key` handles the request.
    pub fn service(&self, method: Method, path: &str, key: impl Into<String>) {
        self.insert(method, path, Endpoint::Service(key.into()));
    }

    fn insert(&self, method: Method, path: &str, endpoint: Endpoint) {
        debug!(%method, path, "route registered");
        self.routes
            .write()
            .unwrap()
            .entry(method)
            .or_default()
            .insert(path, endpoint)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    /// Resolve `req` to an endpoint and run it.
    ///
    /// A lookup miss distinguishes [`Error::MethodNotAllowed`] (the path
    /// matches under some other method) from [`Error::NotFound`]. A hit
    /// clones the request, injects the matched path parameters, and awaits
    /// the endpoint.
    pub async fn dispatch(&self, req: &Request) -> Result<Response, Error> {
        let (endpoint, params) = self.lookup(req.method(), req.path())?;

        let mut request = req.clone();
        request.set_params(params);

        match endpoint {
            Endpoint::Handler(handler) => handler.call(request).await,
            Endpoint::Service(key) => {
                let service = self.container.get::<Arc<dyn RouteService>>(&key)?;
                service.call(request).await
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(Endpoint, HashMap<String, String>), Error> {
        let routes = self.routes.read().unwrap();

        if let Some(tree) = routes.get(method) {
            if let Ok(matched) = tree.at(path) {
                let params = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                return Ok((matched.value.clone(), params));
            }
        }

        let allowed_elsewhere = routes
            .iter()
            .any(|(m, tree)| m != method && tree.at(path).is_ok());

        if allowed_elsewhere {
            Err(Error::MethodNotAllowed { method: method.clone(), path: path.to_owned() })
        } else {
            Err(Error::NotFound { method: method.clone(), path: path.to_owned() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(Arc::new(Container::new()))
    }

    async fn hello(_req: Request) -> Response {
        Response::text("hello")
    }

    #[tokio::test]
    async fn dispatch_hits_the_registered_handler() {
        let router = router();
        router.route(Method::GET, "/hello", hello);

        let res = router
            .dispatch(&Request::new(Method::GET, "/hello"))
            .await
            .unwrap();
        assert_eq!(res.body(), b"hello");
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let router = router();
        router.route(Method::GET, "/users/{id}", |req: Request| async move {
            Response::text(req.param("id").unwrap_or("missing").to_owned())
        });

        let res = router
            .dispatch(&Request::new(Method::GET, "/users/42"))
            .await
            .unwrap();
        assert_eq!(res.body(), b"42");
    }

    #[tokio::test]
    async fn miss_distinguishes_404_from_405() {
        let router = router();
        router.route(Method::GET, "/only-get", hello);

        let err = router
            .dispatch(&Request::new(Method::POST, "/only-get"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotAllowed { .. }));

        let err = router
            .dispatch(&Request::new(Method::GET, "/nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn service_routes_resolve_through_the_container() {
        struct Fixed;
        impl RouteService for Fixed {
            fn call(&self, _req: Request) -> crate::handler::BoxFuture {
                Box::pin(async { Ok(Response::text("from service")) })
            }
        }

        let container = Arc::new(Container::new());
        container.insert::<Arc<dyn RouteService>>("fixed", Arc::new(Fixed));

        let router = Router::new(Arc::clone(&container));
        router.service(Method::GET, "/svc", "fixed");

        let res = router
            .dispatch(&Request::new(Method::GET, "/svc"))
            .await
            .unwrap();
        assert_eq!(res.body(), b"from service");
    }

    #[tokio::test]
    async fn unbound_service_key_fails_dispatch() {
        let router = router();
        router.service(Method::GET, "/svc", "missing");

        let err = router
            .dispatch(&Request::new(Method::GET, "/svc"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BindingNotFound(_)));
    }
}
