//! In-memory LRU cache.

use super::{Cache, DEFAULT_CAPACITY, DEFAULT_MAXIMUM_ENTRY_SIZE};
use crate::resource::Resource;
use crate::response::{Response, Timestamp};
use lru::LruCache;
use parking_lot::Mutex;
use std::time::SystemTime;
use tracing::{debug, trace};

/// A stored response.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub resource: Resource,
    pub response: Response,
    pub inserted_at: Timestamp,
}

struct Inner {
    capacity: usize,
    max_entry_size: u64,
    /// Bounded by `capacity` by hand, so that zero stays a valid capacity.
    entries: LruCache<String, CacheEntry>,
}

impl Inner {
    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            match self.entries.pop_lru() {
                Some((key, _)) => debug!(url = %key, "Evicted from memory cache"),
                None => break,
            }
        }
    }
}

/// Bounded in-memory response cache with LRU eviction and take semantics.
///
/// Every operation runs under one mutex and none performs I/O.
///
/// ```rust
/// use tile_loader::cache::{Cache, ResourceCache};
/// use tile_loader::{Resource, Response};
///
/// let cache = ResourceCache::new(2);
/// let tile = Resource::tile("tile://1/2/3");
/// cache.put(&tile, Response::with_data("abc"));
///
/// assert!(cache.has(&tile));
/// assert!(cache.get(&tile).is_some());
/// assert!(cache.get(&tile).is_none());
/// ```
pub struct ResourceCache {
    inner: Mutex<Inner>,
}

impl ResourceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                max_entry_size: DEFAULT_MAXIMUM_ENTRY_SIZE,
                entries: LruCache::unbounded(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Cached URLs from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .rev()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Cache for ResourceCache {
    fn get(&self, resource: &Resource) -> Option<Response> {
        let key = resource.cache_key();
        let entry = self.inner.lock().entries.pop(&key)?;
        trace!(url = %key, "Memory cache hit");
        Some(entry.response)
    }

    fn put(&self, resource: &Resource, response: Response) {
        if !response.is_renderable() {
            return;
        }
        let key = resource.cache_key();
        let mut inner = self.inner.lock();
        if inner.capacity == 0 {
            return;
        }
        if response.size() > inner.max_entry_size {
            debug!(url = %key, size = response.size(), "Response too large to cache");
            return;
        }

        let entry = CacheEntry {
            resource: resource.clone(),
            response,
            inserted_at: SystemTime::now(),
        };
        // Replacing an entry also makes it the most recently used.
        inner.entries.put(key, entry);
        let capacity = inner.capacity;
        inner.evict_to(capacity);
    }

    fn has(&self, resource: &Resource) -> bool {
        self.inner.lock().entries.contains(&resource.cache_key())
    }

    fn remove(&self, resource: &Resource) -> bool {
        self.inner.lock().entries.pop(&resource.cache_key()).is_some()
    }

    fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = capacity;
        inner.evict_to(capacity);
    }

    fn set_maximum_entry_size(&self, size: u64) {
        self.inner.lock().max_entry_size = size;
    }

    fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Reason;

    fn tile(n: usize) -> Resource {
        Resource::tile(format!("tile://0/0/{n}"))
    }

    fn fill(cache: &ResourceCache, range: std::ops::Range<usize>) {
        for n in range {
            cache.put(&tile(n), Response::with_data(format!("data {n}")));
        }
    }

    #[test]
    fn test_put_evicts_single_oldest_entry() {
        let cache = ResourceCache::new(3);
        fill(&cache, 0..5);

        assert_eq!(cache.size(), 3);
        assert!(!cache.has(&tile(0)));
        assert!(!cache.has(&tile(1)));
        assert_eq!(cache.keys(), vec!["tile://0/0/2", "tile://0/0/3", "tile://0/0/4"]);
    }

    #[test]
    fn test_duplicate_put_refreshes_recency_and_payload() {
        let cache = ResourceCache::new(3);
        fill(&cache, 0..3);

        cache.put(&tile(0), Response::with_data("fresh"));
        assert_eq!(cache.size(), 3);

        fill(&cache, 3..4);
        assert!(cache.has(&tile(0)));
        assert!(!cache.has(&tile(1)));
        assert_eq!(cache.get(&tile(0)).unwrap().data.unwrap(), "fresh");
    }

    #[test]
    fn test_get_takes_entry() {
        let cache = ResourceCache::new(3);
        fill(&cache, 0..1);

        assert!(cache.get(&tile(0)).is_some());
        assert!(cache.get(&tile(0)).is_none());
        assert!(!cache.has(&tile(0)));
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_only_renderable_responses_are_stored() {
        let cache = ResourceCache::new(3);
        cache.put(&tile(0), Response::error(Reason::NotFound, "missing"));
        cache.put(&tile(1), Response::not_modified());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ResourceCache::new(0);
        fill(&cache, 0..2);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_set_capacity_shrinks_immediately() {
        let cache = ResourceCache::new(5);
        fill(&cache, 0..5);

        cache.set_capacity(2);
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.keys(), vec!["tile://0/0/3", "tile://0/0/4"]);
    }

    #[test]
    fn test_entry_size_limit() {
        let cache = ResourceCache::new(5);
        cache.set_maximum_entry_size(4);
        cache.put(&tile(0), Response::with_data("abcd"));
        cache.put(&tile(1), Response::with_data("abcde"));
        assert!(cache.has(&tile(0)));
        assert!(!cache.has(&tile(1)));
    }

    #[test]
    fn test_access_token_does_not_split_entries() {
        let cache = ResourceCache::new(5);
        let with_token = Resource::tile("https://example.com/1/2/3.pbf?access_token=a");
        let other_token = Resource::tile("https://example.com/1/2/3.pbf?access_token=b");
        cache.put(&with_token, Response::with_data("abc"));
        assert!(cache.has(&other_token));
    }

    #[test]
    fn test_take_and_remove_leave_recency_of_others_intact() {
        let cache = ResourceCache::new(3);
        fill(&cache, 0..4);
        assert_eq!(cache.keys(), vec!["tile://0/0/1", "tile://0/0/2", "tile://0/0/3"]);

        assert!(cache.remove(&tile(2)));
        assert!(cache.get(&tile(3)).is_some());
        assert_eq!(cache.keys(), vec!["tile://0/0/1"]);

        fill(&cache, 4..7);
        assert_eq!(cache.keys(), vec!["tile://0/0/4", "tile://0/0/5", "tile://0/0/6"]);
        assert!(!cache.remove(&tile(1)));
    }

    #[test]
    fn test_clear() {
        let cache = ResourceCache::new(5);
        fill(&cache, 0..3);
        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(cache.keys().is_empty());
    }
}
