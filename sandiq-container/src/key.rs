//! Registration keys.
//!
//! A [`Key`] addresses one registration slot in a container. It is derived
//! from the name of the declaration that owns the registration, so every
//! resolution through that declaration, in any container or fork, lands on
//! the same factory, cache entry and graph node.

use std::fmt;

/// Identifies a registration slot.
///
/// Two keys are equal iff their names are equal.
///
/// # Examples
/// ```
/// use sandiq_container::key::Key;
///
/// let key = Key::new("app::database");
/// assert_eq!(key.name(), "app::database");
/// assert_eq!(key, Key::new("app::database"));
/// assert_ne!(key, Key::new("app::cache"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    name: &'static str,
}

impl Key {
    /// Creates a key from a declaration name.
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Returns the declaration name this key was built from.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.name
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Builds a [`Key`] for the enclosing declaration.
///
/// Without arguments the key is the path of the surrounding function, so a
/// registration method gets a key unique to its declaration site:
///
/// ```
/// use sandiq_container::key;
///
/// fn database() -> sandiq_container::Key {
///     key!()
/// }
///
/// assert!(database().name().ends_with("::database"));
/// assert_eq!(database(), database());
/// ```
///
/// With a string literal the key uses that name verbatim: `key!("database")`.
#[macro_export]
macro_rules! key {
    () => {{
        fn __here() {}
        fn __name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __name_of(__here);
        $crate::key::Key::new(match name.strip_suffix("::__here") {
            Some(stripped) => stripped,
            None => name,
        })
    }};
    ($name:expr) => {
        $crate::key::Key::new($name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn equal_names_equal_keys() {
        assert_eq!(Key::new("one"), Key::new("one"));
    }

    #[test]
    fn different_names_different_keys() {
        assert_ne!(Key::new("one"), Key::new("two"));
    }

    #[test]
    fn equality_is_by_content_not_pointer() {
        let owned: &'static str = Box::leak(String::from("shared").into_boxed_str());
        assert_eq!(Key::new(owned), Key::new("shared"));
    }

    #[test]
    fn key_in_hashmap() {
        let mut map = HashMap::new();
        map.insert(Key::new("string"), "string");
        map.insert(Key::new("number"), "number");
        assert_eq!(map.get(&Key::new("string")), Some(&"string"));
        assert_eq!(map.get(&Key::new("flag")), None);
    }

    #[test]
    fn macro_key_is_stable_per_call_site() {
        fn first() -> Key {
            key!()
        }
        fn second() -> Key {
            key!()
        }

        assert_eq!(first(), first());
        assert_ne!(first(), second());
        assert!(first().name().ends_with("::first"));
        assert!(!first().name().contains("__here"));
    }

    #[test]
    fn macro_key_from_literal() {
        assert_eq!(key!("database"), Key::new("database"));
    }

    #[test]
    fn display_and_debug() {
        let key = Key::new("app::logger");
        assert_eq!(format!("{key}"), "app::logger");
        assert_eq!(format!("{key:?}"), "Key(\"app::logger\")");
    }

    #[test]
    fn keys_collect_into_set() {
        let set: HashSet<Key> = ["a", "b", "a"].into_iter().map(Key::from).collect();
        assert_eq!(set.len(), 2);
    }
}
