//! Named logger handles over `tracing`.
//!
//! The kernel does not own a logging backend. A [`Logger`] is a named handle
//! that forwards to the ambient `tracing` subscriber with the logger name as
//! a structured field — install `tracing-subscriber` (or anything else) in
//! your binary and every logger lights up.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A named logger.
///
/// Obtained from [`App::get_logger`](crate::App::get_logger). The same name
/// always yields the identical handle; distinct names yield distinct handles.
pub struct Logger {
    name: String,
}

impl Logger {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(logger = %self.name, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(logger = %self.name, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(logger = %self.name, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(logger = %self.name, "{message}");
    }
}

/// Lazily creates and caches one [`Logger`] per distinct name.
#[derive(Default)]
pub(crate) struct LoggerRegistry {
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl LoggerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, name: &str) -> Arc<Logger> {
        if let Some(logger) = self.loggers.read().unwrap().get(name) {
            return Arc::clone(logger);
        }
        let mut loggers = self.loggers.write().unwrap();
        // a second lookup: another caller may have inserted between the locks
        Arc::clone(
            loggers
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Logger::new(name))),
        )
    }
}
