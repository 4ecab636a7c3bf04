//! Minimal muon example — routes, lifecycle listeners, and a custom binding.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/nowhere          # decorated 404 JSON
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'

use muon::{App, Request, Response, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = App::new(true);

    // a shared value any part of the app can resolve by key
    app.set_binding("motd", String::from("welcome to muon"));

    app.get("/", home);
    app.get("/users/{id}", get_user);
    app.post("/users", create_user);

    // lifecycle listeners: fired by the kernel around every request
    app.subscribe(muon::events::REQUEST_RECEIVED, |event: &muon::Event<'_>| {
        if let Some(req) = event.request() {
            tracing::info!(method = %req.method(), path = req.path(), "request received");
        }
        Ok(())
    });
    app.subscribe(muon::events::RESPONSE_SENT, |event: &muon::Event<'_>| {
        if let Some(res) = event.response() {
            tracing::info!(status = %res.status_code(), "response sent");
        }
        Ok(())
    });

    app.run("0.0.0.0:3000").await.expect("server error");
}

async fn home(_req: Request) -> Response {
    Response::html("<h1>It works!</h1>")
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}
