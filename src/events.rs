//! Publish/subscribe event emitter.
//!
//! Named events with priority-ordered, synchronous delivery. The kernel
//! emits three lifecycle events per request cycle — [`REQUEST_RECEIVED`],
//! [`RESPONSE_CREATED`], [`RESPONSE_SENT`] — and the emitter is equally
//! usable for application-defined events through
//! [`App::emitter`](crate::App::emitter).
//!
//! Delivery runs on the calling thread, highest priority first. Listeners
//! registered at the same priority fire in subscription order (FIFO) — that
//! tie-break is part of this emitter's contract and covered by tests. The
//! first listener error aborts delivery of the remaining listeners and is
//! returned to the emitting caller.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// Emitted with the inbound request, before routing dispatch.
pub const REQUEST_RECEIVED: &str = "request.received";
/// Emitted with (request, response) once per cycle — after a successful
/// dispatch or after exception decoration, never both.
pub const RESPONSE_CREATED: &str = "response.created";
/// Emitted with (request, response) after the response reached the transport.
pub const RESPONSE_SENT: &str = "response.sent";

/// Listener priorities. Higher fires earlier.
pub mod priority {
    pub const HIGH: i32 = 100;
    pub const NORMAL: i32 = 0;
    pub const LOW: i32 = -100;
}

/// The descriptor passed to every listener.
///
/// Carries the event name plus whatever the emit site attached: the request
/// and/or response for lifecycle events, or an opaque payload for custom
/// events.
pub struct Event<'a> {
    name: &'a str,
    request: Option<&'a Request>,
    response: Option<&'a Response>,
    payload: Option<&'a dyn Any>,
}

impl<'a> Event<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name, request: None, response: None, payload: None }
    }

    pub fn with_request(mut self, request: &'a Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_response(mut self, response: &'a Response) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_payload(mut self, payload: &'a dyn Any) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn request(&self) -> Option<&Request> {
        self.request
    }

    pub fn response(&self) -> Option<&Response> {
        self.response
    }

    /// Typed view of the attached payload, if any.
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.payload.and_then(|p| p.downcast_ref())
    }
}

/// A subscribed event listener.
pub type Listener = Arc<dyn Fn(&Event<'_>) -> Result<(), Error> + Send + Sync>;

struct Registration {
    priority: i32,
    seq: u64,
    listener: Listener,
}

/// The event emitter.
///
/// Interior-mutable, so subscription works through a shared application
/// handle. Emission snapshots the listener list — a listener subscribing
/// more listeners takes effect from the next emission.
#[derive(Default)]
pub struct Emitter {
    listeners: RwLock<HashMap<String, Vec<Registration>>>,
    seq: AtomicU64,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe at [`priority::NORMAL`].
    pub fn subscribe<F>(&self, name: impl Into<String>, listener: F)
    where
        F: Fn(&Event<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.subscribe_with_priority(name, priority::NORMAL, listener);
    }

    pub fn subscribe_with_priority<F>(&self, name: impl Into<String>, priority: i32, listener: F)
    where
        F: Fn(&Event<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.write().unwrap();
        let registrations = listeners.entry(name.into()).or_default();
        registrations.push(Registration { priority, seq, listener: Arc::new(listener) });
        // priority descending, subscription order within a priority
        registrations.sort_by_key(|r| (Reverse(r.priority), r.seq));
    }

    /// Deliver `event` to its listeners, in order. The first listener error
    /// stops delivery and is returned.
    pub fn emit(&self, event: &Event<'_>) -> Result<(), Error> {
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.read().unwrap();
            match listeners.get(event.name()) {
                Some(registrations) => {
                    registrations.iter().map(|r| Arc::clone(&r.listener)).collect()
                }
                None => Vec::new(),
            }
        };

        trace!(event = event.name(), listeners = snapshot.len(), "emitting");
        for listener in snapshot {
            listener(event)?;
        }
        Ok(())
    }

    pub fn has_listeners(&self, name: &str) -> bool {
        self.listener_count(name) > 0
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .read()
            .unwrap()
            .get(name)
            .map(|registrations| registrations.len())
            .unwrap_or(0)
    }
}
