//! String-keyed dependency-injection container.
//!
//! A registry resolving keys to `Arc` instances. Two binding styles:
//!
//! - **singleton** — one shared instance, every [`get`](Container::get)
//!   returns the same `Arc`
//! - **factory** — a closure producing a fresh instance per resolution
//!
//! Values are stored type-erased (`dyn Any`) and downcast on the way out, so
//! a lookup names both the key and the expected type. The container performs
//! no automatic wiring — it is a registry, not a resolution algorithm.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::Error;

type Shared = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn() -> Shared + Send + Sync>;

enum Binding {
    Singleton(Shared),
    Factory(Factory),
}

/// The dependency-injection container.
///
/// Interior-mutable: registration and resolution both work through a shared
/// `Arc<Container>` with no external locking.
#[derive(Default)]
pub struct Container {
    bindings: RwLock<HashMap<String, Binding>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` as a singleton under `key`, replacing any prior
    /// binding.
    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.insert_arc(key, Arc::new(value));
    }

    /// Register an already-shared instance as a singleton under `key`.
    pub fn insert_arc<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: Arc<T>) {
        let key = key.into();
        debug!(binding = %key, "singleton registered");
        self.bindings.write().unwrap().insert(key, Binding::Singleton(value));
    }

    /// Register a factory under `key`: every [`get`](Container::get) invokes
    /// it and yields a fresh instance.
    pub fn insert_factory<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let key = key.into();
        debug!(binding = %key, "factory registered");
        let factory: Factory = Arc::new(move || Arc::new(factory()) as Shared);
        self.bindings.write().unwrap().insert(key, Binding::Factory(factory));
    }

    /// Resolve `key` as a `T`.
    ///
    /// Singleton bindings return the shared instance; factory bindings
    /// produce a fresh one. Fails with [`Error::BindingNotFound`] when the
    /// key is absent and [`Error::BindingType`] when the stored value is not
    /// a `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>, Error> {
        let shared = {
            let bindings = self.bindings.read().unwrap();
            match bindings.get(key) {
                Some(Binding::Singleton(value)) => Arc::clone(value),
                Some(Binding::Factory(factory)) => factory(),
                None => return Err(Error::BindingNotFound(key.to_owned())),
            }
        };
        shared.downcast::<T>().map_err(|_| Error::BindingType {
            key: key.to_owned(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// True when `key` is bound in any resolvable form.
    pub fn contains(&self, key: &str) -> bool {
        self.bindings.read().unwrap().contains_key(key)
    }

    /// True when `key` is bound as a singleton.
    pub fn is_singleton(&self, key: &str) -> bool {
        matches!(
            self.bindings.read().unwrap().get(key),
            Some(Binding::Singleton(_))
        )
    }

    /// Remove the binding under `key`, if any.
    pub fn remove(&self, key: &str) {
        self.bindings.write().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_round_trip() {
        let container = Container::new();
        container.insert("greeting", String::from("hello"));

        let value = container.get::<String>("greeting").unwrap();
        assert_eq!(*value, "hello");
        assert!(container.contains("greeting"));
        assert!(container.is_singleton("greeting"));

        container.remove("greeting");
        assert!(!container.contains("greeting"));
    }

    #[test]
    fn singleton_is_shared() {
        let container = Container::new();
        container.insert("n", 7_u32);
        let a = container.get::<u32>("n").unwrap();
        let b = container.get::<u32>("n").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn factory_yields_fresh_instances() {
        let container = Container::new();
        container.insert_factory("buf", Vec::<u8>::new);
        assert!(container.contains("buf"));
        assert!(!container.is_singleton("buf"));

        let a = container.get::<Vec<u8>>("buf").unwrap();
        let b = container.get::<Vec<u8>>("buf").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn missing_and_mistyped_lookups_fail() {
        let container = Container::new();
        assert!(matches!(
            container.get::<String>("nope"),
            Err(Error::BindingNotFound(_))
        ));

        container.insert("n", 7_u32);
        assert!(matches!(
            container.get::<String>("n"),
            Err(Error::BindingType { .. })
        ));
    }

    #[test]
    fn rebinding_replaces() {
        let container = Container::new();
        container.insert("k", 1_u32);
        container.insert("k", 2_u32);
        assert_eq!(*container.get::<u32>("k").unwrap(), 2);
    }
}
