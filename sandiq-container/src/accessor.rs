//! Field accessors for dependencies.
//!
//! Each accessor wraps a registration *declaration*, a function from a
//! container to a [`Registration`], usually a method of an extension trait:
//!
//! ```rust
//! use sandiq_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Mailer;
//!
//! trait Services {
//!     fn mailer(&self) -> Registration<'_, Arc<Mailer>>;
//! }
//!
//! impl Services for Container {
//!     fn mailer(&self) -> Registration<'_, Arc<Mailer>> {
//!         Registration::new(self, key!(), |_| Arc::new(Mailer))
//!     }
//! }
//!
//! struct SignupModel {
//!     mailer: Inject<Arc<Mailer>>,
//! }
//!
//! let model = SignupModel { mailer: Inject::new(Container::mailer) };
//! let _mailer: &Arc<Mailer> = &model.mailer;
//! ```
//!
//! | accessor        | resolves                                   |
//! |-----------------|--------------------------------------------|
//! | [`Inject`]      | once, when constructed                     |
//! | [`Dynamic`]     | on every access                            |
//! | [`LazyInject`]  | once, on first access                      |
//! | [`WeakInject`]  | when the last strong reference is gone     |
//!
//! All of them resolve in [`Container::current`] at the moment they resolve.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::trace;

use crate::container::Container;
use crate::registration::Registration;

/// A registration declaration: where to find the registration for `T` in a
/// given container.
pub type Declaration<T> = for<'c> fn(&'c Container) -> Registration<'c, T>;

fn resolve_current<T>(declaration: Declaration<T>) -> T
where
    T: Clone + Send + Sync + 'static,
{
    let container = Container::current();
    let registration = declaration(&container);
    trace!(key = %registration.key(), "Accessor resolving");
    registration.resolve()
}

// ── Eager ──

/// Resolves once, when constructed, and keeps the value.
pub struct Inject<T> {
    value: T,
}

impl<T> Inject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(declaration: Declaration<T>) -> Self {
        Self {
            value: resolve_current(declaration),
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.value).finish()
    }
}

// ── Dynamic ──

/// Resolves on every [`get`](Self::get).
///
/// Whether that builds a new value depends on the registration's lifetime.
pub struct Dynamic<T> {
    declaration: Declaration<T>,
}

impl<T> Dynamic<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(declaration: Declaration<T>) -> Self {
        Self { declaration }
    }

    pub fn get(&self) -> T {
        resolve_current(self.declaration)
    }
}

impl<T> fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

// ── Lazy ──

/// Resolves on first [`get`](Self::get) and keeps the value.
pub struct LazyInject<T> {
    declaration: Declaration<T>,
    value: OnceCell<T>,
}

impl<T> LazyInject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(declaration: Declaration<T>) -> Self {
        Self {
            declaration,
            value: OnceCell::new(),
        }
    }

    pub fn get(&self) -> &T {
        self.value.get_or_init(|| resolve_current(self.declaration))
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyInject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInject")
            .field("value", &self.value.get())
            .finish()
    }
}

// ── Weak ──

/// Holds a resolved `Arc<U>` weakly.
///
/// [`get`](Self::get) hands out the held value while something else keeps
/// it alive, and resolves again once it has been dropped.
pub struct WeakInject<U: ?Sized> {
    declaration: Declaration<Arc<U>>,
    held: Mutex<Option<Weak<U>>>,
}

impl<U> WeakInject<U>
where
    U: ?Sized + Send + Sync + 'static,
{
    pub fn new(declaration: Declaration<Arc<U>>) -> Self {
        Self {
            declaration,
            held: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Arc<U> {
        let alive = self.held.lock().as_ref().and_then(Weak::upgrade);
        if let Some(value) = alive {
            return value;
        }

        // Resolved without holding `held`: the factory may use other accessors.
        let value = resolve_current(self.declaration);
        *self.held.lock() = Some(Arc::downgrade(&value));
        value
    }

    /// Returns `true` while the held value has strong references elsewhere.
    pub fn is_alive(&self) -> bool {
        self.held
            .lock()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }
}

impl<U: ?Sized> fmt::Debug for WeakInject<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alive = self
            .held
            .lock()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0);
        f.debug_struct("WeakInject").field("alive", &alive).finish()
    }
}
