//! # The Container, heart of Sandiq
//!
//! A container owns the registry of one scope: overriding factories, cached
//! values, and the dependency graph discovered while resolving. All of it
//! sits behind one re-entrant lock, so a factory may resolve further
//! registrations on the same thread while the outer resolution is running.
//!
//! # Architecture
//! ```text
//!   Container::global()  ──scoped()──>  fork  ──scoped()──>  fork ...
//!          │                             │
//!     Registration ── resolve() ──> resolution engine (this module)
//! ```
//!
//! # Examples
//! ```rust
//! use sandiq_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Database { url: String }
//! struct UserService { db: Arc<Database> }
//!
//! fn database(c: &Container) -> Registration<'_, Arc<Database>> {
//!     Registration::new(c, "database", |_| {
//!         Arc::new(Database { url: "postgres://localhost".into() })
//!     })
//! }
//!
//! fn users(c: &Container) -> Registration<'_, Arc<UserService>> {
//!     Registration::new(c, "users", |c| Arc::new(UserService { db: database(c).resolve() }))
//! }
//!
//! let container = Container::new();
//!
//! let service = users(&container).resolve();
//! assert_eq!(service.db.url, "postgres://localhost");
//! assert!(Arc::ptr_eq(&service, &users(&container).resolve()));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, info, trace, warn};

use crate::error::{CircularDependencyError, SandiqError};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registry::{Factory, Registry};

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a standalone [`Container`] with factories installed up front.
///
/// The result is not ambient; install it with [`Container::enter`] or use
/// it directly. Handy for fixtures that need a known starting state.
///
/// # Examples
/// ```rust
/// use sandiq_container::prelude::*;
///
/// let container = Container::builder()
///     .value("database_url", String::from("postgres://localhost"))
///     .factory("pool_size", |_| 8usize)
///     .build();
///
/// let url = Registration::new(&container, "database_url", |_| String::new()).resolve();
/// assert_eq!(url, "postgres://localhost");
/// ```
pub struct ContainerBuilder {
    registry: Registry,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Install a factory for `key`, as if `use_factory` had been called.
    pub fn factory<T: Send + Sync + 'static>(
        mut self,
        key: impl Into<Key>,
        factory: impl Fn(&Container) -> T + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        debug!(key = %key, "Seeded factory");
        self.registry.set_factory::<T>(key, Arc::new(factory));
        self
    }

    /// Install a pre-built value for `key`.
    ///
    /// Cloned on every resolve (use `Arc<T>` for cheap sharing).
    pub fn value<T: Clone + Send + Sync + 'static>(self, key: impl Into<Key>, value: T) -> Self {
        self.factory(key, move |_| value.clone())
    }

    pub fn build(self) -> Arc<Container> {
        info!(factories = self.registry.factory_count(), "Built container");
        Arc::new(Container::from_registry(self.registry))
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Thread-safe registry of factories and cached dependencies.
///
/// Containers are used through [`Registration`](crate::registration::Registration)
/// handles. The process-wide default lives behind [`Container::global`];
/// [`Container::scoped`] forks the ambient one.
pub struct Container {
    state: ReentrantMutex<RefCell<Registry>>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_registry(registry: Registry) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(registry)),
        }
    }

    /// Copy this container's factories, cache and dependency graph into a
    /// new, independent container.
    ///
    /// Nothing done to the fork is visible here and vice versa.
    pub fn fork(&self) -> Container {
        let state = self.state.lock();
        let snapshot = state.borrow().snapshot();
        trace!(?snapshot, "Forked container");
        Container::from_registry(snapshot)
    }

    // ── Resolution engine ──

    /// Resolve `key`, falling back to `default` when no factory override is
    /// installed.
    ///
    /// # Panics
    /// If `key` is already being resolved on this call path, or if the
    /// factory or cached value under `key` belongs to another type.
    pub(crate) fn resolve<T>(&self, key: Key, default: &Factory<T>, lifetime: Lifetime) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        let state = self.state.lock();

        let entered = {
            let mut registry = state.borrow_mut();
            if registry.is_resolving(&key) {
                Err(SandiqError::CircularDependency(
                    CircularDependencyError::from_stack(registry.resolving(), key),
                ))
            } else {
                if let Some(consumer) = registry.current_consumer() {
                    registry.add_reverse_edge(key, consumer);
                }
                registry.push_resolving(key);
                Ok(())
            }
        };
        if let Err(error) = entered {
            fatal(error);
        }
        let _frame = ResolutionFrame { state: &state };

        if lifetime.is_cached() {
            let cached = state.borrow().cached::<T>(&key);
            if let Some(value) = cached.unwrap_or_else(|error| fatal(error)) {
                trace!(key = %key, "Served from cache");
                return value;
            }
        }

        let stored = state.borrow().factory::<T>(&key);
        let factory = match stored.unwrap_or_else(|error| fatal(error)) {
            Some(factory) => factory,
            None => Arc::clone(default),
        };

        trace!(key = %key, %lifetime, "Invoking factory");
        let value = factory(self);

        if lifetime.is_cached() {
            state.borrow_mut().set_cached(key, value.clone());
        }

        value
    }

    /// Replace the factory for `key` and drop everything cached from the
    /// old one.
    pub(crate) fn use_factory<T: Send + Sync + 'static>(&self, key: Key, factory: Factory<T>) {
        let state = self.state.lock();
        let mut registry = state.borrow_mut();
        registry.remove_cached(&key);
        registry.set_factory(key, factory);
        registry.invalidate_transitively(&key);
        debug!(key = %key, "Installed factory override");
    }

    /// Drop the cached value for `key` and everything built from it.
    pub(crate) fn clear_key(&self, key: Key) {
        let state = self.state.lock();
        let mut registry = state.borrow_mut();
        registry.remove_cached(&key);
        registry.invalidate_transitively(&key);
        debug!(key = %key, "Cleared registration");
    }

    /// Like [`clear_key`](Self::clear_key), and also forget the factory
    /// override.
    pub(crate) fn reset_key(&self, key: Key) {
        let state = self.state.lock();
        let mut registry = state.borrow_mut();
        registry.remove_cached(&key);
        let had_override = registry.remove_factory(&key);
        registry.invalidate_transitively(&key);
        debug!(key = %key, had_override, "Reset registration");
    }

    // ── Container-wide invalidation ──

    /// Drop every cached value and recorded dependency edge.
    ///
    /// Factory overrides stay installed.
    pub fn clear(&self) {
        let state = self.state.lock();
        state.borrow_mut().clear_all();
        debug!("Cleared container");
    }

    /// Drop every cached value, dependency edge and factory override.
    ///
    /// Every registration falls back to its call-site default afterwards.
    pub fn reset(&self) {
        let state = self.state.lock();
        state.borrow_mut().reset_all();
        debug!("Reset container");
    }

    // ── Introspection ──

    /// Returns `true` if a value is cached under `key`.
    pub fn is_cached(&self, key: &Key) -> bool {
        self.state.lock().borrow().is_cached(key)
    }

    /// Returns `true` if a factory override is installed for `key`.
    pub fn has_factory(&self, key: &Key) -> bool {
        self.state.lock().borrow().has_factory(key)
    }

    /// Keys recorded as direct consumers of `key`, sorted by name.
    pub fn dependents(&self, key: &Key) -> Vec<Key> {
        self.state.lock().borrow().dependents(key)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let mut out = f.debug_struct("Container");
        match state.try_borrow() {
            Ok(registry) => out
                .field("factories", &registry.factory_count())
                .field("cached", &registry.cached_count()),
            Err(_) => out.field("registry", &"<resolving>"),
        };
        out.finish()
    }
}

/// Pops the resolution stack when a resolution ends, including by panic.
struct ResolutionFrame<'a> {
    state: &'a RefCell<Registry>,
}

impl Drop for ResolutionFrame<'_> {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.state.try_borrow_mut() {
            registry.pop_resolving();
        }
    }
}

/// Logs and raises an unrecoverable container error.
#[cold]
fn fatal(error: SandiqError) -> ! {
    warn!(%error, "Fatal container error");
    panic!("{error}")
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::accessor::{Dynamic, Inject, LazyInject, WeakInject};
    pub use crate::ambient::{ContainerFutureExt, WithContainer};
    pub use crate::error::{Result, SandiqError};
    pub use crate::key;
    pub use crate::key::Key;
    pub use crate::lifetime::Lifetime;
    pub use crate::registration::Registration;

    #[cfg(feature = "async")]
    pub use crate::ambient::{spawn, spawn_detached};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::Registration;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Variant: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct VariantOne;
    struct VariantTwo;

    impl Variant for VariantOne {
        fn name(&self) -> &'static str {
            "one"
        }
    }

    impl Variant for VariantTwo {
        fn name(&self) -> &'static str {
            "two"
        }
    }

    struct Composite {
        first: Arc<dyn Variant>,
        second: Arc<dyn Variant>,
    }

    fn first(c: &Container) -> Registration<'_, Arc<dyn Variant>> {
        Registration::new(c, "first", |_| Arc::new(VariantOne) as Arc<dyn Variant>)
    }

    fn second(c: &Container) -> Registration<'_, Arc<dyn Variant>> {
        Registration::new(c, "second", |_| Arc::new(VariantOne) as Arc<dyn Variant>)
    }

    fn composite(c: &Container) -> Registration<'_, Arc<Composite>> {
        Registration::new(c, "composite", |c| {
            Arc::new(Composite {
                first: first(c).resolve(),
                second: second(c).resolve(),
            })
        })
    }

    fn cycle_a(c: &Container) -> Registration<'_, u8> {
        Registration::new(c, "cycle_a", |c| cycle_b(c).resolve())
    }

    fn cycle_b(c: &Container) -> Registration<'_, u8> {
        Registration::new(c, "cycle_b", |c| cycle_a(c).resolve())
    }

    fn counting(c: &Container, counter: Arc<AtomicUsize>) -> Registration<'_, Arc<usize>> {
        Registration::new(c, "counted", move |_| {
            Arc::new(counter.fetch_add(1, Ordering::SeqCst))
        })
    }

    #[test]
    fn unique_creates_new_each_time() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let registration = counting(&container, counter.clone()).unique();

        let a = registration.resolve();
        let b = registration.resolve();
        let c = registration.resolve();

        assert_eq!((*a, *b, *c), (0, 1, 2));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!container.is_cached(&Key::new("counted")));
    }

    #[test]
    fn singleton_factory_called_once() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let registration = counting(&container, counter.clone());

        let a = registration.resolve();
        let b = registration.resolve();
        let c = registration.resolve();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn use_factory_replaces_and_clears_cache() {
        let container = Container::new();
        assert_eq!(first(&container).resolve().name(), "one");

        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);

        assert_eq!(first(&container).resolve().name(), "two");
        assert!(container.has_factory(&Key::new("first")));
    }

    #[test]
    fn override_invalidates_consumers() {
        let container = Container::new();

        let before = composite(&container).resolve();
        assert_eq!(before.first.name(), "one");
        assert_eq!(container.dependents(&Key::new("first")), vec![Key::new("composite")]);

        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);
        assert!(!container.is_cached(&Key::new("composite")));
        assert!(container.is_cached(&Key::new("second")));

        let after = composite(&container).resolve();
        assert_eq!(after.first.name(), "two");
        assert_eq!(after.second.name(), "one");
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&before.second, &after.second));
    }

    #[test]
    fn clear_key_keeps_override() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);

        let a = counting(&container, counter.clone()).resolve();
        counting(&container, counter.clone()).clear();
        let b = counting(&container, counter.clone()).resolve();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        first(&container).clear();
        assert_eq!(first(&container).resolve().name(), "two");
    }

    #[test]
    fn clear_key_rebuilds_consumers() {
        let container = Container::new();
        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);

        let before = composite(&container).resolve();
        first(&container).clear();

        assert!(!container.is_cached(&Key::new("first")));
        assert!(!container.is_cached(&Key::new("composite")));
        assert!(container.is_cached(&Key::new("second")));
        assert!(container.has_factory(&Key::new("first")));

        let after = composite(&container).resolve();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!Arc::ptr_eq(&before.first, &after.first));
        assert!(Arc::ptr_eq(&before.second, &after.second));
        assert_eq!(after.first.name(), "two");
    }

    #[test]
    fn reset_key_restores_default() {
        let container = Container::new();
        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);
        let composite_before = composite(&container).resolve();
        assert_eq!(composite_before.first.name(), "two");

        first(&container).reset();

        assert!(!container.has_factory(&Key::new("first")));
        assert!(!container.is_cached(&Key::new("composite")));
        assert_eq!(composite(&container).resolve().first.name(), "one");
    }

    #[test]
    fn container_clear_and_reset() {
        let container = Container::new();
        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);
        let _ = composite(&container).resolve();

        container.clear();
        assert!(!container.is_cached(&Key::new("composite")));
        assert!(!container.is_cached(&Key::new("first")));
        assert!(container.dependents(&Key::new("first")).is_empty());
        assert_eq!(composite(&container).resolve().first.name(), "two");

        container.reset();
        assert!(!container.has_factory(&Key::new("first")));
        assert_eq!(composite(&container).resolve().first.name(), "one");
    }

    #[test]
    #[should_panic(expected = "Circular dependency detected for cycle_a")]
    fn circular_dependency_panics() {
        let container = Container::new();
        cycle_a(&container).resolve();
    }

    #[test]
    fn container_usable_after_cycle_panic() {
        let container = Container::new();

        let result = catch_unwind(AssertUnwindSafe(|| cycle_a(&container).resolve()));
        assert!(result.is_err());

        // The resolution stack unwound with the panic.
        assert_eq!(first(&container).resolve().name(), "one");
        assert!(container.dependents(&Key::new("first")).is_empty());
    }

    #[test]
    #[should_panic(expected = "Type mismatch for first")]
    fn type_mismatch_panics() {
        let container = Container::new();
        first(&container).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);

        Registration::new(&container, "first", |_| 0u8).resolve();
    }

    #[test]
    fn builder_seeds_factories() {
        let container = Container::builder()
            .value("first", Arc::new(VariantTwo) as Arc<dyn Variant>)
            .factory("number", |_| 7u32)
            .build();

        assert_eq!(composite(&container).resolve().first.name(), "two");
        assert_eq!(Registration::new(&container, "number", |_| 0u32).resolve(), 7);
    }

    #[test]
    fn fork_is_independent() {
        let container = Container::new();
        let original = first(&container).resolve();

        let fork = container.fork();
        assert!(Arc::ptr_eq(&original, &first(&fork).resolve()));

        first(&fork).use_factory(|_| Arc::new(VariantTwo) as Arc<dyn Variant>);
        assert_eq!(first(&fork).resolve().name(), "two");
        assert!(Arc::ptr_eq(&original, &first(&container).resolve()));
    }

    #[test]
    fn concurrent_singleton_resolution_builds_once() {
        let container = Arc::new(Container::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                let counter = counter.clone();
                std::thread::spawn(move || counting(&container, counter).resolve())
            })
            .collect();

        let values: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn debug_display() {
        let container = Container::builder().value("a", 1u8).value("b", 2u8).build();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("factories: 2"));
    }
}
