//! The registry store: mutable state behind one container.
//!
//! The registry maps [`Key`] to overriding factories and cached values,
//! keeps the reverse dependency graph, and tracks the keys currently being
//! resolved. Every method here runs while the owning container's lock is
//! held; the registry itself does no locking.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use sandiq_support::rendering::render_set;
use tracing::{debug, trace};

use crate::container::Container;
use crate::error::{Result, SandiqError, Slot, TypeMismatchError};
use crate::graph::DependencyGraph;
use crate::key::Key;

/// Type alias for factory functions.
///
/// A factory receives the container it is resolving in, so it can resolve
/// its own dependencies through other registrations.
///
/// # Why `Arc` and not `Box`?
/// Factories are copied into every forked container and cloned out of the
/// registry before they are invoked. `Arc` makes both cheap.
pub type Factory<T> = Arc<dyn Fn(&Container) -> T + Send + Sync>;

/// A factory or value with its type erased.
type Erased = Arc<dyn Any + Send + Sync>;

/// Factories, cache, dependency graph and resolution stack of one container.
#[derive(Default)]
pub(crate) struct Registry {
    factories: HashMap<Key, Erased>,
    cache: HashMap<Key, Erased>,
    graph: DependencyGraph,
    resolving: Vec<Key>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Factories ──

    /// Returns the overriding factory for `key`, if one was installed.
    ///
    /// # Errors
    /// Returns [`SandiqError::TypeMismatch`] if the factory stored under
    /// `key` produces something other than `T`.
    pub fn factory<T: 'static>(&self, key: &Key) -> Result<Option<Factory<T>>> {
        match self.factories.get(key) {
            None => Ok(None),
            Some(erased) => erased
                .downcast_ref::<Factory<T>>()
                .cloned()
                .map(Some)
                .ok_or_else(|| mismatch::<T>(*key, Slot::Factory)),
        }
    }

    pub fn set_factory<T: 'static>(&mut self, key: Key, factory: Factory<T>) {
        self.factories.insert(key, Arc::new(factory));
    }

    pub fn remove_factory(&mut self, key: &Key) -> bool {
        self.factories.remove(key).is_some()
    }

    pub fn has_factory(&self, key: &Key) -> bool {
        self.factories.contains_key(key)
    }

    // ── Cache ──

    /// Returns a clone of the cached value for `key`.
    ///
    /// # Errors
    /// Returns [`SandiqError::TypeMismatch`] if the cached value is not a `T`.
    pub fn cached<T: Clone + 'static>(&self, key: &Key) -> Result<Option<T>> {
        match self.cache.get(key) {
            None => Ok(None),
            Some(erased) => erased
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| mismatch::<T>(*key, Slot::CachedValue)),
        }
    }

    pub fn set_cached<T: Send + Sync + 'static>(&mut self, key: Key, value: T) {
        self.cache.insert(key, Arc::new(value));
    }

    pub fn remove_cached(&mut self, key: &Key) -> bool {
        self.cache.remove(key).is_some()
    }

    pub fn is_cached(&self, key: &Key) -> bool {
        self.cache.contains_key(key)
    }

    // ── Dependency graph ──

    /// Records that `dependent` was mid-resolution when `dependency` was
    /// resolved.
    pub fn add_reverse_edge(&mut self, dependency: Key, dependent: Key) {
        self.graph.record(dependency, dependent);
    }

    pub fn dependents(&self, key: &Key) -> Vec<Key> {
        let mut keys: Vec<Key> = self.graph.dependents(key).copied().collect();
        keys.sort();
        keys
    }

    /// Drops the cached value of `key` and of everything built from it.
    pub fn invalidate_transitively(&mut self, key: &Key) {
        let keys = self.graph.invalidation_set(key);
        let mut dropped = 0usize;
        for key in &keys {
            if self.cache.remove(key).is_some() {
                dropped += 1;
            }
        }
        debug!(
            key = %key,
            walked = %render_set(&keys),
            dropped,
            "Invalidated cached dependents"
        );
    }

    // ── Resolution stack ──

    pub fn is_resolving(&self, key: &Key) -> bool {
        self.resolving.contains(key)
    }

    pub fn resolving(&self) -> &[Key] {
        &self.resolving
    }

    /// The key whose factory is currently running, if any.
    pub fn current_consumer(&self) -> Option<Key> {
        self.resolving.last().copied()
    }

    pub fn push_resolving(&mut self, key: Key) {
        self.resolving.push(key);
        trace!(key = %key, depth = self.resolving.len(), "Entered resolution");
    }

    pub fn pop_resolving(&mut self) -> Option<Key> {
        self.resolving.pop()
    }

    // ── Whole-registry operations ──

    /// Copies factories, cache and graph into a new registry.
    ///
    /// The copy shares no mutable state with `self`: values and factories
    /// are reference-counted and immutable, the maps are new. The resolution
    /// stack is not copied.
    pub fn snapshot(&self) -> Self {
        Self {
            factories: self.factories.clone(),
            cache: self.cache.clone(),
            graph: self.graph.clone(),
            resolving: Vec::new(),
        }
    }

    /// Drops every cached value and recorded edge.
    pub fn clear_all(&mut self) {
        self.cache.clear();
        self.graph.clear();
    }

    /// Drops every cached value, recorded edge and overriding factory.
    pub fn reset_all(&mut self) {
        self.clear_all();
        self.factories.clear();
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

fn mismatch<T>(key: Key, slot: Slot) -> SandiqError {
    SandiqError::TypeMismatch(TypeMismatchError {
        key,
        expected: type_name::<T>(),
        slot,
    })
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("factories", &self.factories.len())
            .field("cached", &self.cache.len())
            .field("edges", &self.graph.len())
            .field("resolving", &self.resolving)
            .finish()
    }
}
