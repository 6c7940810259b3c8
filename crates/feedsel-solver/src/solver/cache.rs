//! Keyed candidate caches.
//!
//! Both caches are populated lazily while the problem builder walks the
//! requirement graph, then frozen into an immutable [`Snapshot`] before
//! solving.
//!
//! Population follows a strict discipline to survive dependency cycles: the
//! entry for a key is inserted *before* the walk that may recurse back into
//! the cache, so a cycle finds the half-initialised entry instead of
//! re-entering construction. Entry construction itself must not recurse.

use std::hash::Hash;

use indexmap::IndexMap;

/// Mutable cache used during problem construction.
#[derive(Debug)]
pub struct CandidateCache<K, V> {
    map: IndexMap<K, V>,
}

impl<K: Hash + Eq + Ord + Clone, V: Clone> CandidateCache<K, V> {
    pub fn new() -> Self {
        CandidateCache {
            map: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).cloned()
    }

    /// Store a freshly constructed entry. Each key is inserted at most once.
    pub fn insert(&mut self, key: K, value: V) {
        let previous = self.map.insert(key, value);
        assert!(previous.is_none(), "cache entry inserted twice");
    }

    /// Freeze into an immutable snapshot.
    pub fn snapshot(self) -> Snapshot<K, V> {
        Snapshot { map: self.map }
    }
}

impl<K: Hash + Eq + Ord + Clone, V: Clone> Default for CandidateCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of a cache after problem construction.
#[derive(Debug)]
pub struct Snapshot<K, V> {
    map: IndexMap<K, V>,
}

impl<K: Hash + Eq + Ord, V> Snapshot<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Entry that the problem builder is known to have created.
    pub fn get_exn(&self, key: &K) -> &V {
        self.map
            .get(key)
            .expect("candidate cache entry missing after problem construction")
    }

    /// All entries in ascending key order.
    pub fn bindings(&self) -> Vec<(&K, &V)> {
        let mut entries: Vec<(&K, &V)> = self.map.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
