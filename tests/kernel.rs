//! Request-cycle tests for the application kernel: wiring accessors, the
//! handle/decorate control flow, lifecycle event ordering, and the container
//! sugar.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use muon::events::{REQUEST_RECEIVED, RESPONSE_CREATED, RESPONSE_SENT};
use muon::{App, Error, Event, Method, Request, Response, StatusCode};
use serde_json::Value;

fn get_root() -> Request {
    Request::new(Method::GET, "/")
}

async fn it_works(_req: Request) -> Response {
    Response::html("<h1>It works!</h1>")
}

#[tokio::test]
async fn wiring_accessors() {
    let app = App::new(false);

    // container and router exist after first access; the app registers
    // itself under its well-known key
    let container = app.container();
    assert!(container.contains(muon::APP_BINDING));
    let registered = app.get_binding::<App>(muon::APP_BINDING).unwrap();
    assert!(Arc::ptr_eq(&app, &registered));

    let router = app.router();
    assert!(Arc::ptr_eq(router.container(), &app.container()));

    // logger registry: singleton-per-name
    let default = app.logger();
    assert!(Arc::ptr_eq(&default, &app.get_logger("default")));
    assert!(!Arc::ptr_eq(&default, &app.get_logger("audit")));

    // debug flag landed in config
    assert_eq!(app.get_config::<bool>("debug"), Some(false));
}

#[tokio::test]
async fn binding_sugar_round_trip() {
    let app = App::new(false);

    app.set_binding("foo", String::from("bar"));
    assert_eq!(*app.get_binding::<String>("foo").unwrap(), "bar");
    assert!(app.has_binding("foo"));

    app.remove_binding("foo");
    assert!(!app.has_binding("foo"));

    // factory bindings count as resolvable too
    app.container().insert_factory("fresh", Vec::<u8>::new);
    assert!(app.has_binding("fresh"));
}

#[tokio::test]
async fn handle_serves_every_registered_verb() {
    let app = App::new(false);
    app.get("/", it_works);
    app.post("/", it_works);
    app.put("/", it_works);
    app.delete("/", it_works);
    app.patch("/", it_works);

    for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        let response = app.handle(&Request::new(method, "/")).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.body(), b"<h1>It works!</h1>");
    }
}

#[tokio::test]
async fn unmatched_route_is_decorated_as_json_404() {
    let app = App::new(false);

    let response = app.handle(&get_root()).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert!(body["error"]["message"].as_str().unwrap().contains("no route matches"));
    assert!(body["error"].get("trace").is_none());
}

#[tokio::test]
async fn wrong_method_is_decorated_as_405() {
    let app = App::new(false);
    app.get("/", it_works);

    let response = app.handle(&Request::new(Method::POST, "/")).await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn try_handle_propagates_undecorated() {
    let app = App::new(false);

    let created = Arc::new(AtomicU32::new(0));
    let created_in = Arc::clone(&created);
    app.subscribe(RESPONSE_CREATED, move |_: &Event<'_>| {
        created_in.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let err = app.try_handle(&get_root()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    // no response was created, so the event never fired
    assert_eq!(created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lifecycle_events_fire_in_order_once_per_cycle() {
    let app = App::new(false);
    app.get("/", it_works);

    let log = Arc::new(Mutex::new(Vec::new()));
    for (name, tag) in [(REQUEST_RECEIVED, "received"), (RESPONSE_CREATED, "created")] {
        let log = Arc::clone(&log);
        app.subscribe(name, move |event: &Event<'_>| {
            assert!(event.request().is_some());
            log.lock().unwrap().push(tag);
            Ok(())
        });
    }

    let response = app.handle(&get_root()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), ["received", "created"]);

    app.handle(&get_root()).await;
    assert_eq!(*log.lock().unwrap(), ["received", "created", "received", "created"]);
}

#[tokio::test]
async fn response_created_carries_the_response() {
    let app = App::new(false);

    let status = Arc::new(Mutex::new(None));
    let status_in = Arc::clone(&status);
    app.subscribe(RESPONSE_CREATED, move |event: &Event<'_>| {
        *status_in.lock().unwrap() = event.response().map(|r| r.status_code());
        Ok(())
    });

    // no routes: the decorated 404 is what listeners observe
    app.handle(&get_root()).await;
    assert_eq!(*status.lock().unwrap(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn terminate_emits_response_sent() {
    let app = App::new(false);

    let seen = Arc::new(AtomicU32::new(0));
    let seen_in = Arc::clone(&seen);
    app.subscribe(RESPONSE_SENT, move |event: &Event<'_>| {
        assert!(event.request().is_some());
        assert!(event.response().is_some());
        seen_in.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let request = get_root();
    let response = app.handle(&request).await;
    app.terminate(&request, &response);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listener_failure_is_decorated_with_trace_in_debug() {
    let app = App::new(true);

    app.subscribe(REQUEST_RECEIVED, |_: &Event<'_>| {
        Err(Error::handler("A test exception"))
    });

    let response = app.handle(&get_root()).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["error"]["message"], "A test exception");
    assert!(!body["error"]["trace"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn replacement_decorator_takes_over() {
    let app = App::new(true);

    app.subscribe(REQUEST_RECEIVED, |_: &Event<'_>| {
        Err(Error::handler("A test exception"))
    });
    app.set_exception_decorator(|_err: &Error| {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .text("Fail")
    });

    let response = app.handle(&get_root()).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body(), b"Fail");
}

#[tokio::test]
async fn fixed_decorator_ignores_the_error_content() {
    let app = App::new(false);
    app.set_exception_decorator(|_err: &Error| Response::text("always this"));

    // two very different failures, one fixed response
    let not_found = app.handle(&get_root()).await;
    assert_eq!(not_found.body(), b"always this");

    app.get("/boom", |_req: Request| async {
        Err::<Response, _>(Error::handler("boom").with_status(StatusCode::BAD_GATEWAY))
    });
    let handler_error = app.handle(&Request::new(Method::GET, "/boom")).await;
    assert_eq!(handler_error.body(), b"always this");
}

#[tokio::test]
async fn current_request_is_resolvable_during_handling() {
    let app = App::new(false);

    let kernel = Arc::clone(&app);
    app.get("/echo-path", move |_req: Request| {
        let kernel = Arc::clone(&kernel);
        async move {
            let current = kernel.get_binding::<Request>(muon::REQUEST_BINDING)?;
            Ok::<_, Error>(Response::text(current.path().to_owned()))
        }
    });

    let response = app.handle(&Request::new(Method::GET, "/echo-path")).await;
    assert_eq!(response.body(), b"/echo-path");
}

#[tokio::test]
async fn set_container_rebinds_the_router() {
    let app = App::new(false);
    app.get("/", it_works);
    assert_eq!(app.handle(&get_root()).await.status_code(), StatusCode::OK);

    // wholesale replacement drops the cached router and its routes
    app.set_container(Arc::new(muon::Container::new()));
    assert!(app.has_binding(muon::APP_BINDING));
    assert_eq!(app.handle(&get_root()).await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_events_flow_through_the_emitter() {
    let app = App::new(false);

    let seen = Arc::new(Mutex::new(None));
    let seen_in = Arc::clone(&seen);
    app.subscribe("cache.warmed", move |event: &Event<'_>| {
        *seen_in.lock().unwrap() = event.payload::<usize>().copied();
        Ok(())
    });

    let entries: usize = 128;
    app.emitter()
        .emit(&Event::new("cache.warmed").with_payload(&entries))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(128));
}
