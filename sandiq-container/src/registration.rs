//! Registration handles.
//!
//! A [`Registration`] binds a key, a default factory and a lifetime to one
//! container. Registrations are usually declared as methods on an extension
//! trait for [`Container`], so every call site that needs a dependency goes
//! through the same declaration:
//!
//! ```rust
//! use sandiq_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct SystemClock;
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 1_700_000_000 }
//! }
//!
//! struct FixedClock(u64);
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { self.0 }
//! }
//!
//! trait AppDependencies {
//!     fn clock(&self) -> Registration<'_, Arc<dyn Clock>>;
//! }
//!
//! impl AppDependencies for Container {
//!     fn clock(&self) -> Registration<'_, Arc<dyn Clock>> {
//!         Registration::new(self, key!(), |_| Arc::new(SystemClock) as Arc<dyn Clock>)
//!     }
//! }
//!
//! Container::scoped(|c| {
//!     c.clock().use_factory(|_| Arc::new(FixedClock(42)) as Arc<dyn Clock>);
//!     assert_eq!(Container::current().clock().resolve().now(), 42);
//! });
//! assert_eq!(Container::current().clock().resolve().now(), 1_700_000_000);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registry::Factory;

/// A callable handle for one registration slot in one container.
///
/// Creating a handle has no effect on the container. Only
/// [`use_factory`](Self::use_factory) writes the factory into the registry;
/// otherwise the default factory given here is used on each resolve.
pub struct Registration<'c, T> {
    container: &'c Container,
    key: Key,
    factory: Factory<T>,
    lifetime: Lifetime,
}

impl<'c, T> Registration<'c, T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Declares a singleton registration for `key` in `container`.
    pub fn new(
        container: &'c Container,
        key: impl Into<Key>,
        factory: impl Fn(&Container) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            container,
            key: key.into(),
            factory: Arc::new(factory),
            lifetime: Lifetime::default(),
        }
    }

    /// Returns the current instance.
    ///
    /// For [`Lifetime::Singleton`] the first call builds and caches the
    /// value, later calls return clones of the cached one. For
    /// [`Lifetime::Unique`] every call builds a new value.
    ///
    /// # Panics
    /// If resolving this registration requires resolving it again (a
    /// dependency cycle), or if the key was used for a different type.
    pub fn resolve(&self) -> T {
        self.container.resolve(self.key, &self.factory, self.lifetime)
    }

    /// Installs `factory` in place of the current one.
    ///
    /// The cached value, and every cached value that was built from it, is
    /// dropped; the next resolve uses `factory`.
    pub fn use_factory(&self, factory: impl Fn(&Container) -> T + Send + Sync + 'static) {
        self.container.use_factory::<T>(self.key, Arc::new(factory));
    }

    /// Drops the cached value and its dependents. The factory stays.
    pub fn clear(&self) {
        self.container.clear_key(self.key);
    }

    /// Drops the cached value, its dependents, and any installed factory.
    /// The next resolve uses the default factory.
    pub fn reset(&self) {
        self.container.reset_key(self.key);
    }

    /// Returns this registration with [`Lifetime::Unique`].
    pub fn unique(self) -> Self {
        self.with_lifetime(Lifetime::Unique)
    }

    /// Returns this registration with [`Lifetime::Singleton`].
    pub fn singleton(self) -> Self {
        self.with_lifetime(Lifetime::Singleton)
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }
}

impl<'c, T> Registration<'c, T> {
    pub fn key(&self) -> Key {
        self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The container this handle resolves in.
    pub fn container(&self) -> &'c Container {
        self.container
    }
}

impl<T> Clone for Registration<'_, T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container,
            key: self.key,
            factory: Arc::clone(&self.factory),
            lifetime: self.lifetime,
        }
    }
}

impl<T> fmt::Debug for Registration<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
