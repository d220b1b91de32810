//! Dependency graph discovered during resolution.
//!
//! Edges are recorded in reverse: for every key the graph keeps the set of
//! keys that were being built when it was resolved. That is exactly what
//! invalidation needs. When a factory is replaced or a cached value is
//! dropped, everything that was built *from* it has to go too.
//!
//! ```text
//!   one ──┐
//!         ├──> three        dependents(one) = {three}
//!   two ──┘                 dependents(two) = {three}
//! ```

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::key::Key;

/// Reverse dependency edges: key → keys that consumed it.
#[derive(Debug, Clone, Default)]
pub(crate) struct DependencyGraph {
    dependents: HashMap<Key, HashSet<Key>>,
}

impl DependencyGraph {
    /// Records that `dependent` was mid-resolution when `dependency` was
    /// resolved.
    pub fn record(&mut self, dependency: Key, dependent: Key) {
        let inserted = self.dependents.entry(dependency).or_default().insert(dependent);
        if inserted {
            trace!(dependency = %dependency, dependent = %dependent, "Recorded dependency edge");
        }
    }

    /// Direct consumers of `key`.
    pub fn dependents(&self, key: &Key) -> impl Iterator<Item = &Key> {
        self.dependents.get(key).into_iter().flatten()
    }

    /// `key` followed by every key that transitively depends on it.
    ///
    /// Each key appears once, even when the recorded edges form a cycle.
    ///
    /// # Algorithm
    /// Iterative depth-first walk over the reverse edges with a visited set.
    pub fn invalidation_set(&self, key: &Key) -> Vec<Key> {
        let mut visited: HashSet<Key> = HashSet::new();
        let mut order = Vec::new();
        let mut pending = vec![*key];

        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            pending.extend(self.dependents(&current).copied());
        }

        order
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
    }

    /// Number of keys with at least one recorded consumer.
    pub fn len(&self) -> usize {
        self.dependents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(name: &'static str) -> Key {
        Key::new(name)
    }

    #[test]
    fn record_accumulates_consumers() {
        let mut graph = DependencyGraph::default();
        graph.record(k("one"), k("three"));
        graph.record(k("one"), k("four"));
        graph.record(k("one"), k("three"));

        let mut consumers: Vec<_> = graph.dependents(&k("one")).copied().collect();
        consumers.sort();
        assert_eq!(consumers, vec![k("four"), k("three")]);
    }

    #[test]
    fn unknown_key_has_no_dependents() {
        let graph = DependencyGraph::default();
        assert_eq!(graph.dependents(&k("missing")).count(), 0);
        assert_eq!(graph.invalidation_set(&k("missing")), vec![k("missing")]);
    }

    #[test]
    fn invalidation_set_is_transitive() {
        // one -> three -> model
        let mut graph = DependencyGraph::default();
        graph.record(k("one"), k("three"));
        graph.record(k("three"), k("model"));
        graph.record(k("two"), k("three"));

        let set = graph.invalidation_set(&k("one"));
        assert_eq!(set[0], k("one"));
        assert!(set.contains(&k("three")));
        assert!(set.contains(&k("model")));
        assert!(!set.contains(&k("two")));
    }

    #[test]
    fn diamond_visits_each_key_once() {
        //     d
        //    / \
        //   b   c
        //    \ /
        //     a
        let mut graph = DependencyGraph::default();
        graph.record(k("d"), k("b"));
        graph.record(k("d"), k("c"));
        graph.record(k("b"), k("a"));
        graph.record(k("c"), k("a"));

        let set = graph.invalidation_set(&k("d"));
        assert_eq!(set.len(), 4);
        assert_eq!(set.iter().filter(|key| **key == k("a")).count(), 1);
    }

    #[test]
    fn cyclic_edges_terminate() {
        let mut graph = DependencyGraph::default();
        graph.record(k("four"), k("five"));
        graph.record(k("five"), k("four"));
        graph.record(k("self"), k("self"));

        let mut set = graph.invalidation_set(&k("four"));
        set.sort();
        assert_eq!(set, vec![k("five"), k("four")]);
        assert_eq!(graph.invalidation_set(&k("self")), vec![k("self")]);
    }

    #[test]
    fn clear_drops_all_edges() {
        let mut graph = DependencyGraph::default();
        graph.record(k("one"), k("three"));
        assert_eq!(graph.len(), 1);

        graph.clear();
        assert_eq!(graph.len(), 0);
    }
}
