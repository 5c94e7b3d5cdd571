//! Provider resolution — lookup keys, factory registries, release handles.
//!
//! Each provider family (app, infrastructure, foundation) is a trait; a
//! registry maps an exact lookup key to a factory closure that builds a new
//! boxed instance on every resolution.

use crate::error::{Error, ProviderResult, Result};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{info, warn};

/// Lookup key for app and foundation implementations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tuple {
    /// App type or foundation name
    pub component: String,
    /// Infrastructure type
    pub infra: String,
    /// Infrastructure flavor
    pub infra_flavor: String,
}

impl Tuple {
    pub fn new(
        component: impl Into<String>,
        infra: impl Into<String>,
        infra_flavor: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            infra: infra.into(),
            infra_flavor: infra_flavor.into(),
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {:?}, {:?})",
            self.component, self.infra, self.infra_flavor
        )
    }
}

/// Behavior shared by every provider family.
pub trait Provider: Send + Sync {
    /// Release resources held by the provider. Called exactly once, after
    /// the provider's last use.
    fn close(&self) -> ProviderResult<()> {
        Ok(())
    }
}

/// An owned provider instance that is closed when dropped.
pub struct Handle<P: Provider + ?Sized> {
    inner: Box<P>,
    key: String,
}

impl<P: Provider + ?Sized> Handle<P> {
    fn new(inner: Box<P>, key: String) -> Self {
        Self { inner, key }
    }
}

impl<P: Provider + ?Sized> Deref for Handle<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.inner
    }
}

impl<P: Provider + ?Sized> Drop for Handle<P> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            warn!("error closing provider {}: {}", self.key, e);
        }
    }
}

/// Factory building a provider instance.
pub type Factory<P> = Arc<dyn Fn() -> ProviderResult<Box<P>> + Send + Sync>;

/// Registry of provider factories keyed by exact lookup key.
pub struct Registry<K, P: ?Sized> {
    kind: &'static str,
    factories: HashMap<K, Factory<P>>,
}

impl<K, P: ?Sized> Clone for Registry<K, P>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            factories: self.factories.clone(),
        }
    }
}

impl<K, P> Registry<K, P>
where
    K: Eq + Hash + fmt::Display,
    P: Provider + ?Sized,
{
    /// Create an empty registry for a provider family ("app", ...).
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: HashMap::new(),
        }
    }

    /// Register a factory, replacing any previous one for the same key.
    pub fn register<F>(&mut self, key: K, factory: F) -> &mut Self
    where
        F: Fn() -> ProviderResult<Box<P>> + Send + Sync + 'static,
    {
        self.factories.insert(key, Arc::new(factory));
        self
    }

    /// The factory registered for `key`.
    pub fn lookup(&self, key: &K) -> Option<&Factory<P>> {
        self.factories.get(key)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a new provider for `key`.
    pub fn resolve(&self, key: &K) -> Result<Handle<P>> {
        info!("Loading {} implementation for: {}", self.kind, key);

        let factory = self.lookup(key).ok_or_else(|| Error::NoImplementation {
            kind: self.kind,
            key: key.to_string(),
        })?;

        let provider = factory().map_err(|source| Error::ProviderStart {
            kind: self.kind,
            key: key.to_string(),
            source,
        })?;

        Ok(Handle::new(provider, key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Provider {
        fn greet(&self) -> String;
    }

    struct Hello {
        closed: Arc<AtomicUsize>,
    }

    impl Provider for Hello {
        fn close(&self) -> ProviderResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Greeter for Hello {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    fn registry(built: Arc<AtomicUsize>, closed: Arc<AtomicUsize>) -> Registry<Tuple, dyn Greeter> {
        let mut reg: Registry<Tuple, dyn Greeter> = Registry::new("app");
        reg.register(Tuple::new("go", "aws", "simple"), move || {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Hello {
                closed: closed.clone(),
            }))
        });
        reg
    }

    #[test]
    fn test_plugin_tuple_display() {
        let t = Tuple::new("go", "aws", "simple");
        assert_eq!(t.to_string(), "(\"go\", \"aws\", \"simple\")");
    }

    #[test]
    fn test_plugin_resolve_builds_new_instance_each_time() {
        let built = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let reg = registry(built.clone(), closed.clone());
        let key = Tuple::new("go", "aws", "simple");

        {
            let a = reg.resolve(&key).unwrap();
            let b = reg.resolve(&key).unwrap();
            assert_eq!(a.greet(), "hello");
            assert_eq!(b.greet(), "hello");
        }

        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_plugin_resolve_exact_match_only() {
        let reg = registry(Arc::default(), Arc::default());
        let err = reg
            .resolve(&Tuple::new("go", "aws", "vpc"))
            .err()
            .unwrap();
        match err {
            Error::NoImplementation { kind, key } => {
                assert_eq!(kind, "app");
                assert!(key.contains("\"go\""));
                assert!(key.contains("\"aws\""));
                assert!(key.contains("\"vpc\""));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_plugin_factory_failure() {
        let mut reg: Registry<String, dyn Greeter> = Registry::new("infrastructure");
        reg.register("aws".to_string(), || Err("no credentials helper".into()));
        let err = reg.resolve(&"aws".to_string()).err().unwrap();
        assert!(matches!(err, Error::ProviderStart { .. }));
        assert!(err.to_string().contains("failed to start"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_plugin_close_error_is_swallowed() {
        struct Sticky;
        impl Provider for Sticky {
            fn close(&self) -> ProviderResult<()> {
                Err("still busy".into())
            }
        }
        impl Greeter for Sticky {
            fn greet(&self) -> String {
                "sticky".to_string()
            }
        }

        let mut reg: Registry<String, dyn Greeter> = Registry::new("app");
        reg.register("sticky".to_string(), || Ok(Box::new(Sticky)));
        let handle = reg.resolve(&"sticky".to_string()).unwrap();
        assert_eq!(handle.greet(), "sticky");
        drop(handle);
    }
}
