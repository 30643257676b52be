//! Fixed-capacity LRU cache.
//!
//! Recency is insertion order: `set` and a successful `get` both move the
//! key to the newest position. Inserting a new key into a full cache
//! evicts exactly one entry, the oldest.

use std::hash::Hash;
use std::num::NonZeroUsize;

/// Thin wrapper over [`lru::LruCache`] that also accepts capacity 0.
pub struct LruCache<K, V> {
    /// `None` when the capacity is 0.
    inner: Option<lru::LruCache<K, V>>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// A cache of capacity 0 stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(lru::LruCache::new),
        }
    }

    /// Value for `key`, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.as_mut()?.get(key)
    }

    /// Value for `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.as_ref()?.peek(key)
    }

    /// Insert or replace; returns the evicted entry, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        let Some(cache) = self.inner.as_mut() else {
            return Some((key, value));
        };
        if cache.contains(&key) {
            cache.put(key, value);
            return None;
        }
        cache.push(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.as_mut()?.pop(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.as_ref().is_some_and(|cache| cache.contains(key))
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        match &self.inner {
            Some(cache) => cache.iter().rev().map(|(k, _)| k.clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| cache.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| cache.cap().get())
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.inner.as_mut() {
            cache.clear();
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity())
            .field("keys", &self.keys())
            .finish()
    }
}
