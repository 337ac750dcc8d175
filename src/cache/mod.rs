
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub mod cache_info;
use cache_info::CacheInfo;

//..................................................................

/// Interface for memory caches that hold immutable values.
pub trait Cache<K, V>
where K: Eq + Hash + Debug + Clone,
      V: Clone
{
    /// Get the value from the cache corresponding to the given key,
    /// returning None if it is not cached. This increments the misses count
    /// on failure and the hits count on success.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Add a value to the cache if it is not already present, or replace the
    /// value currently there if it is. In either case the value is cloned
    /// before being stored. Returns true if the value was added, false if
    /// replaced.
    fn add_or_replace(&mut self, key: &K, value: &V) -> bool;

    /// Remove the key and its associated value from the cache, if present.
    /// Returns true if the value was present and removed.
    fn remove(&mut self, key: &K) -> bool;

    /// Empty the cache and reset the statistics.
    fn clear(&mut self);

    /// Get a structure holding several statistics about the cache.
    fn info(&self) -> CacheInfo;

    /// The current number of items stored in the cache.
    fn size(&self) -> usize {
        self.info().size
    }

    /// The number of gets that found the requested key already present.
    fn hits(&self) -> usize {
        self.info().hits
    }

    /// The number of gets that did not find the requested key.
    fn misses(&self) -> usize {
        self.info().misses
    }
}

//..................................................................

/// A Cache implementation over a plain map with no eviction policy: entries
/// stay until they are removed or the cache is cleared, and growth is
/// bounded only by the caller's discipline in removing stale keys.
pub struct UnboundedCache<K, V>
where K: Eq + Hash + Debug + Clone,
      V: Clone
{
    entries: HashMap<K, V>,

    info: CacheInfo,
}

impl<K, V> UnboundedCache<K, V>
where K: Eq + Hash + Debug + Clone,
      V: Clone
{
    pub fn new() -> Self {
        UnboundedCache {
            entries: HashMap::new(),
            info: CacheInfo::new(),
        }
    }
}

impl<K, V> Default for UnboundedCache<K, V>
where K: Eq + Hash + Debug + Clone,
      V: Clone
{
    fn default() -> Self {
        UnboundedCache::new()
    }
}

impl<K, V> Cache<K, V> for UnboundedCache<K, V>
where K: Eq + Hash + Debug + Clone,
      V: Clone
{
    fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.info.access(true);
                Some(value.clone())
            }
            None => {
                self.info.access(false);
                None
            }
        }
    }

    fn add_or_replace(&mut self, key: &K, value: &V) -> bool {
        let added = self.entries.insert(key.clone(), value.clone()).is_none();
        self.info.size = self.entries.len();
        added
    }

    fn remove(&mut self, key: &K) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.info.size = self.entries.len();
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.info = CacheInfo::new();
    }

    fn info(&self) -> CacheInfo {
        self.info
    }
}

//..................................................................
