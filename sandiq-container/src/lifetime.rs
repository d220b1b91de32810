//! Registration lifetimes.
//!
//! A lifetime decides whether a resolved value is kept in the container:
//! - [`Lifetime::Singleton`]: built once per container, then served from cache
//! - [`Lifetime::Unique`]: built on every resolve, never cached
use std::fmt;

/// Caching policy of a registration.
///
/// # Examples
/// ```
/// use sandiq_container::lifetime::Lifetime;
///
/// assert_eq!(Lifetime::default(), Lifetime::Singleton);
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Unique.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance on every resolve call.
    ///
    /// # When to use
    /// - Objects with mutable state that shouldn't be shared
    /// - Cheap value types
    Unique,

    /// One instance per container.
    ///
    /// Built on first resolve and cached until the registration is
    /// overridden, cleared or reset, or until one of the registrations it
    /// was built from is. A forked container starts with a copy of the
    /// parent's cache.
    ///
    /// # When to use
    /// - Services, clients, connection pools
    /// - Configuration objects
    #[default]
    Singleton,
}

impl Lifetime {
    /// Returns `true` if resolved values are stored in the cache.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Unique => write!(f, "Unique"),
            Lifetime::Singleton => write!(f, "Singleton"),
        }
    }
}
