//! In-memory configuration store.
//!
//! A string-keyed map of JSON values behind a shared handle. Last write wins,
//! reads are typed through serde. The application stores its debug flag here
//! under `"debug"`; the default exception decorator reads it back at
//! decoration time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Shared configuration handle.
///
/// Cloning is cheap and every clone sees the same entries. No file or
/// environment parsing happens here — wiring values in is the caller's job.
#[derive(Clone, Default)]
pub struct Config {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a config entry, replacing any previous value under the key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.write().unwrap().insert(key.into(), value.into());
    }

    /// Typed read. Returns `None` when the key is absent or the stored value
    /// does not deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().unwrap();
        entries.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Typed read with a fallback.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }

    pub fn remove(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }

    /// The application debug flag (`"debug"` key, defaults to `false`).
    pub fn debug(&self) -> bool {
        self.get_or("debug", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let config = Config::new();
        config.set("name", "first");
        config.set("name", "second");
        assert_eq!(config.get::<String>("name").as_deref(), Some("second"));
    }

    #[test]
    fn get_or_falls_back() {
        let config = Config::new();
        assert_eq!(config.get_or("port", 3000), 3000);
        config.set("port", 8080);
        assert_eq!(config.get_or("port", 3000), 8080);
    }

    #[test]
    fn clones_share_entries() {
        let config = Config::new();
        let view = config.clone();
        config.set("debug", true);
        assert!(view.debug());
        view.remove("debug");
        assert!(!config.debug());
    }
}
